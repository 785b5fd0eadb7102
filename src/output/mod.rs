use crate::models::ContextFingerprint;
use crate::trust::Classification;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// A single classification decision, as written to the audit trail
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub user_id: String,
    pub classification: Classification,
    #[serde(flatten)]
    pub fingerprint: ContextFingerprint,
    pub timestamp: i64,
}

/// Output handler for classification decisions
pub struct DecisionLog {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Jsonl, // Default
        }
    }
}

impl DecisionLog {
    /// Create a new decision log
    pub fn new(
        format: OutputFormat,
        file_path: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let writer: Option<Box<dyn Write + Send>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(DecisionLog { format, writer })
    }

    /// Write a classification decision
    pub fn write_decision(
        &mut self,
        decision: &DecisionRecord,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(decision)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Jsonl => {
                let json = serde_json::to_string(decision)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Console => {
                let output = format!(
                    "[{}] user: {}, ip: {}, location: {}/{}, browser: {} on {} ({})\n",
                    decision.classification,
                    decision.user_id,
                    decision.fingerprint.ip,
                    decision.fingerprint.city,
                    decision.fingerprint.country,
                    decision.fingerprint.browser,
                    decision.fingerprint.os,
                    decision.fingerprint.device_type,
                );
                self.write_output(&output)?;
            }
        }
        Ok(())
    }

    fn write_output(&mut self, data: &str) -> Result<(), Box<dyn std::error::Error>> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", data);
                use std::io::{self, Write};
                io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(classification: Classification) -> DecisionRecord {
        DecisionRecord {
            user_id: "alice".to_string(),
            classification,
            fingerprint: ContextFingerprint {
                ip: "203.0.113.7".to_string(),
                country: "US".to_string(),
                city: "New York".to_string(),
                browser: "Chrome 98.0.4758.102".to_string(),
                platform: "Windows".to_string(),
                os: "Windows 10".to_string(),
                device: "Unknown".to_string(),
                device_type: "Desktop".to_string(),
            },
            timestamp: 1700000000,
        }
    }

    #[test]
    fn test_jsonl_lines_are_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");

        let mut log = DecisionLog::new(OutputFormat::Jsonl, Some(path.clone())).unwrap();
        log.write_decision(&decision(Classification::New)).unwrap();
        log.write_decision(&decision(Classification::Blocked)).unwrap();
        log.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["user_id"], "alice");
        assert_eq!(first["classification"], "new");
        assert_eq!(first["ip"], "203.0.113.7");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["classification"], "blocked");
    }

    #[test]
    fn test_appends_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");

        for _ in 0..2 {
            let mut log = DecisionLog::new(OutputFormat::Jsonl, Some(path.clone())).unwrap();
            log.write_decision(&decision(Classification::Suspicious)).unwrap();
            log.flush().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
