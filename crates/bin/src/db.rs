//! Database location.
//!
//! The default database lives in the platform data directory:
//! - Linux: `~/.local/share/finmodel/`
//! - macOS: `~/Library/Application Support/finmodel/`
//! - Windows: `%APPDATA%\finmodel\`

use finmodel::store::SqliteStore;
use std::path::{Path, PathBuf};

/// Default data directory.
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("finmodel")
}

/// Default database path.
pub(crate) fn default_db_path() -> PathBuf {
    default_data_dir().join("finmodel.db")
}

/// Open the database, creating its directory if needed.
pub(crate) fn open_store(path: Option<&Path>) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    let path = path.map_or_else(default_db_path, Path::to_path_buf);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!(path = %path.display(), "Opening database");
    Ok(SqliteStore::new(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path() {
        let path = default_db_path();
        assert!(path.ends_with("finmodel/finmodel.db"));
    }
}
