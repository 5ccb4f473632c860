//! Persistent log of escalated sensor faults
//!
//! One JSON record per line in `errors.jsonl` under the data directory.

use fanmon_core::{FaultRecord, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

pub(crate) const ERROR_LOG_FILE: &str = "errors.jsonl";

pub(crate) struct ErrorLog {
    path: PathBuf,
    records: Vec<FaultRecord>,
}

impl ErrorLog {
    /// Load existing records; unparseable lines are skipped
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(ERROR_LOG_FILE);
        let mut records = Vec::new();

        if path.exists() {
            let content = fs::read_to_string(&path).await?;
            for (lineno, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<FaultRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("{}:{}: skipping record: {}", path.display(), lineno + 1, e),
                }
            }
        }

        Ok(Self { path, records })
    }

    pub fn records(&self) -> &[FaultRecord] {
        &self.records
    }

    /// Record a fault in memory and append it to the log file
    pub async fn append(&mut self, record: FaultRecord) -> Result<()> {
        error!(
            "Fan {} sensor {} fault: {}",
            record.fan, record.sensor, record.message
        );

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.records.push(record);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
