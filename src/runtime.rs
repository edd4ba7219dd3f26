use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

/// Written by `serve` so that `status` can find a running server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub pid: u32,
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl RuntimeInfo {
    pub fn current(addr: SocketAddr, data_dir: &Path) -> Self {
        Self {
            pid: std::process::id(),
            addr,
            data_dir: data_dir.to_path_buf(),
            started_at: Utc::now(),
        }
    }

    pub fn write(&self, path: &Path) -> ServiceResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> ServiceResult<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn remove(path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            tracing::debug!("runtime info {} not removed: {e}", path.display());
        }
    }
}
