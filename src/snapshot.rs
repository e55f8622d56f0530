use crate::filters::UserConstraints;
use crate::ingest::RoundDatabase;
use crate::portfolio::Portfolio;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything a session owns: history, accepted selections and the user's number rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Seconds since the Unix epoch at save time.
    pub timestamp: u64,
    pub round_database: RoundDatabase,
    pub portfolio: Portfolio,
    pub constraints: UserConstraints,
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("bin"))
}

impl Snapshot {
    /// Stamps the current time and writes `.bin` paths with bincode, anything else as JSON.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let file = File::create(path).with_context(|| format!("creating snapshot '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        if is_binary(path) {
            bincode::serialize_into(&mut writer, self)
                .with_context(|| format!("encoding snapshot '{}'", path.display()))?;
        } else {
            serde_json::to_writer_pretty(&mut writer, self)
                .with_context(|| format!("encoding snapshot '{}'", path.display()))?;
        }
        writer.flush().with_context(|| format!("writing snapshot '{}'", path.display()))?;

        info!(
            "[Snapshot] Saved {} rounds, {} selections to {}",
            self.round_database.total_rounds(),
            self.portfolio.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening snapshot '{}'", path.display()))?;
        let reader = BufReader::new(file);
        let snapshot: Snapshot = if is_binary(path) {
            bincode::deserialize_from(reader).with_context(|| format!("decoding snapshot '{}'", path.display()))?
        } else {
            serde_json::from_reader(reader).with_context(|| format!("decoding snapshot '{}'", path.display()))?
        };
        info!(
            "[Snapshot] Loaded {} rounds, {} selections from {}",
            snapshot.round_database.total_rounds(),
            snapshot.portfolio.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// A missing file starts an empty session; an unreadable one is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("[Snapshot] '{}' not found, starting empty", path.display());
            return Ok(Snapshot::default());
        }
        Self::load(path)
    }
}
