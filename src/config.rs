use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable pointing at an explicit project root.
pub const ROOT_ENV: &str = "RFPDESK_DIR";

/// Environment variable holding the tracing filter for the binary.
pub const LOG_ENV: &str = "RFPDESK_LOG";

/// Where the local document store lives inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project-local directory holding the store
    pub dir_name: String,
    /// Snapshot file inside `dir_name`
    pub db_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir_name: ".rfpdesk".to_string(),
            db_file: "loro.db".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn store_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dir_name)
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        self.store_dir(root).join(&self.db_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.dir_name, ".rfpdesk");
        assert_eq!(config.db_file, "loro.db");
    }

    #[test]
    fn test_db_path() {
        let config = StoreConfig::default();
        let path = config.db_path(Path::new("/tmp/project"));
        assert_eq!(path, PathBuf::from("/tmp/project/.rfpdesk/loro.db"));
    }

    #[test]
    fn test_serialization() {
        let config = StoreConfig {
            dir_name: ".proposals".to_string(),
            db_file: "store.db".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
