use bytes::Bytes;
use transfer_protocol::ConsumerRecord;
use xxhash_rust::xxh3::xxh3_64;

use crate::broker::BrokerError;

/// In-memory partitioned log. Offsets start at 0 in every partition and
/// records are never removed.
pub struct Topic {
    pub(crate) name: String,
    partitions: Vec<Vec<ConsumerRecord>>,
    next_partition: u32, // used for partition tracking in round robin allocation
}

impl Topic {
    pub fn new(name: String, partition_count: u32) -> Topic {
        let partition_count = partition_count.max(1);
        Topic {
            name,
            partitions: (0..partition_count).map(|_| Vec::new()).collect(),
            next_partition: 0,
        }
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    // returns (partition_id, offset)
    pub fn produce(&mut self, key: Option<Bytes>, value: Bytes, timestamp: u64) -> (u32, u64) {
        let partition_id = match &key {
            Some(key) => self.hash_key_to_partition(key),
            None => {
                let partition_id = self.next_partition;
                self.next_partition = (self.next_partition + 1) % self.partition_count();
                partition_id
            }
        };

        let log = &mut self.partitions[partition_id as usize];
        let offset = log.len() as u64;
        log.push(ConsumerRecord {
            topic: self.name.clone(),
            partition: partition_id,
            offset,
            key,
            value,
            timestamp,
        });
        (partition_id, offset)
    }

    pub fn hash_key_to_partition(&self, key: &[u8]) -> u32 {
        let hash = xxh3_64(key);
        (hash as u32) % self.partition_count()
    }

    pub fn log_end_offset(&self, partition: u32) -> Result<u64, BrokerError> {
        Ok(self.partition(partition)?.len() as u64)
    }

    /// Up to `max` records starting at `from`.
    pub fn read(&self, partition: u32, from: u64, max: usize) -> Result<Vec<ConsumerRecord>, BrokerError> {
        let log = self.partition(partition)?;
        let start = (from as usize).min(log.len());
        Ok(log[start..].iter().take(max).cloned().collect())
    }

    fn partition(&self, partition: u32) -> Result<&Vec<ConsumerRecord>, BrokerError> {
        self.partitions
            .get(partition as usize)
            .ok_or_else(|| BrokerError::NoPartition {
                topic: self.name.clone(),
                partition,
            })
    }
}
