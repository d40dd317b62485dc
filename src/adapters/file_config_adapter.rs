//! INI file configuration adapter.
//!
//! Supplies the SQLite path, the CSV data directory, market hours and fee
//! overrides. Typed getters fall back to defaults so a minimal config file
//! is enough to run.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_typical_config() {
        let content = r#"
[sqlite]
path = /var/lib/tickreplay/cache.db
pool_size = 4

[data]
csv_dir = /data/candles

[fees]
brokerage_per_order = 20.0

[market]
session_open = 03:45
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/var/lib/tickreplay/cache.db".to_string())
        );
        assert_eq!(adapter.get_int("sqlite", "pool_size", 1), 4);
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/data/candles".to_string())
        );
        assert_eq!(adapter.get_double("fees", "brokerage_per_order", 0.0), 20.0);
    }

    #[test]
    fn missing_keys_return_none_or_default() {
        let adapter = FileConfigAdapter::from_string("[sqlite]\npath = x.db\n").unwrap();
        assert_eq!(adapter.get_string("sqlite", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("sqlite", "pool_size", 8), 8);
        assert_eq!(adapter.get_double("fees", "gst_rate", 0.18), 0.18);
    }

    #[test]
    fn non_numeric_values_fall_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[sqlite]\npool_size = lots\n").unwrap();
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 4);
        assert_eq!(adapter.get_double("sqlite", "pool_size", 1.5), 1.5);
    }

    #[test]
    fn bool_values_accept_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[cache]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("cache", "a", false));
        assert!(adapter.get_bool("cache", "b", false));
        assert!(adapter.get_bool("cache", "c", false));
        assert!(!adapter.get_bool("cache", "d", true));
        assert!(!adapter.get_bool("cache", "e", true));
        assert!(!adapter.get_bool("cache", "f", true));
        assert!(adapter.get_bool("cache", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[data]\ncsv_dir = /tmp/candles\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/tmp/candles".to_string())
        );
    }

    #[test]
    fn from_file_errors_on_missing_file() {
        assert!(FileConfigAdapter::from_file("/nonexistent/tickreplay.ini").is_err());
    }
}
