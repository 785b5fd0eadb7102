use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the trust engine tooling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Trust database configuration
    pub database: DatabaseConfig,
    /// Decision audit log configuration
    pub decision_log: DecisionLogConfig,
}

/// Trust database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite trust database
    pub path: PathBuf,
}

/// Decision audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (if format is not "console")
    pub file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig {
                path: PathBuf::from("trust.db"),
            },
            decision_log: DecisionLogConfig {
                format: "jsonl".to_string(),
                file_path: Some(PathBuf::from("decisions.jsonl")),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::default();
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.database.path, config.database.path);
        assert_eq!(loaded.decision_log.format, "jsonl");
        assert_eq!(
            loaded.decision_log.file_path,
            Some(PathBuf::from("decisions.jsonl"))
        );
    }
}
