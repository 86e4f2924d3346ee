use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;
use transfer_protocol::{encode_document, TransactionDocument};

use crate::store::{StoreError, TransactionStore};

/// Append-only document log: one JSON document per line in
/// `<base_dir>/<collection>.jsonl`. Writes run on the blocking pool.
pub struct JsonlTransactionStore {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl JsonlTransactionStore {
    pub fn open<P: AsRef<Path>>(base_dir: P, collection: &str) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref();
        create_dir_all(base_dir)?;
        let path = base_dir.join(format!("{collection}.jsonl"));
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        debug!(path = ?path, "opened transaction store");
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TransactionStore for JsonlTransactionStore {
    async fn save(&self, document: &TransactionDocument) -> Result<(), StoreError> {
        let mut line = encode_document(document)?;
        line.push('\n');

        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut file = file
                .lock()
                .map_err(|_| StoreError::Unavailable("document log lock poisoned".to_string()))?;
            file.write_all(line.as_bytes())?;
            file.flush()?; // make sure data hits the file before we report success
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("document writer task failed: {e}")))?
    }
}
