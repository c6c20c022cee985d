use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Changed,
    Unchanged,
}

/// Hex SHA-256 of an in-memory payload
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of a file, streamed in 8 KiB chunks
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compares a freshly downloaded payload against the payload kept from the
/// previous run.
///
/// The incoming file is either discarded (unchanged) or, once the caller has
/// finished processing it, renamed over the prior snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotGate {
    incoming: PathBuf,
    prior: PathBuf,
}

impl SnapshotGate {
    pub fn new(incoming: impl Into<PathBuf>, prior: impl Into<PathBuf>) -> Self {
        Self {
            incoming: incoming.into(),
            prior: prior.into(),
        }
    }

    pub fn incoming(&self) -> &Path {
        &self.incoming
    }

    pub fn prior(&self) -> &Path {
        &self.prior
    }

    /// Persist the downloaded bytes as the incoming payload
    pub fn stage(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.incoming.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.incoming, bytes)?;
        Ok(())
    }

    /// No prior snapshot counts as changed
    pub fn check(&self) -> Result<GateDecision> {
        if !self.prior.exists() {
            info!("No prior snapshot at {}", self.prior.display());
            return Ok(GateDecision::Changed);
        }
        let incoming = file_digest(&self.incoming)?;
        let prior = file_digest(&self.prior)?;
        debug!("Snapshot digests: incoming={} prior={}", incoming, prior);
        if incoming == prior {
            Ok(GateDecision::Unchanged)
        } else {
            Ok(GateDecision::Changed)
        }
    }

    /// Drop the incoming payload without touching the prior snapshot
    pub fn discard(&self) -> Result<()> {
        if self.incoming.exists() {
            fs::remove_file(&self.incoming)?;
        }
        Ok(())
    }

    /// Replace the prior snapshot with the incoming payload
    pub fn commit(&self) -> Result<()> {
        fs::rename(&self.incoming, &self.prior)?;
        Ok(())
    }
}
