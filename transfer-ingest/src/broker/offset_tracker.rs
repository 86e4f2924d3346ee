use std::collections::HashMap;

/// Committed positions: group -> (topic, partition) -> next offset to read.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    store: HashMap<String, HashMap<(String, u32), u64>>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits never move a group backwards; returns whether the position
    /// advanced.
    pub fn commit(&mut self, group: &str, topic: &str, partition: u32, offset: u64) -> bool {
        let committed = self
            .store
            .entry(group.to_string())
            .or_default()
            .entry((topic.to_string(), partition))
            .or_insert(0);
        if offset > *committed {
            *committed = offset;
            true
        } else {
            false
        }
    }

    pub fn fetch(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        self.store
            .get(group)
            .and_then(|m| m.get(&(topic.to_string(), partition)))
            .copied()
    }
}
