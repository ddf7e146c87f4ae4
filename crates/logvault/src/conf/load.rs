//! Load — config loading from file and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::{EngineConfig, DEFAULT_CONFIG_FILE};

impl EngineConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("LOGVAULT_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::default()
        };

        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: EngineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override fields from `lookup`. Values that do not parse are ignored
    /// with a warning and the previous value is kept.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LOGVAULT_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Some(socket) = lookup("DOCKER_SOCKET").or_else(|| lookup("DOCKER_HOST")) {
            self.docker_socket = socket;
        }
        override_parsed(&lookup, "LOGVAULT_TIMESTAMPS", &mut self.timestamps);
        override_parsed(&lookup, "LOGVAULT_TAIL", &mut self.tail_lines);
        override_parsed(&lookup, "LOGVAULT_MAX_FRAME_BYTES", &mut self.max_frame_bytes);
        override_parsed(&lookup, "LOGVAULT_MULTILINE", &mut self.multiline);
    }

    /// Validate that configuration values are sane
    pub fn validate(&self) -> Result<(), String> {
        if self.data_dir.trim().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }
        if self.max_frame_bytes == 0 {
            return Err("max_frame_bytes must be > 0".to_string());
        }
        if self.tail_lines == 0 {
            return Err("tail_lines must be > 0".to_string());
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable environment override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::record::MultilinePolicy;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_every_field() {
        let mut cfg = EngineConfig::default();
        cfg.apply_env_with(env(&[
            ("LOGVAULT_DATA_DIR", "/tmp/logs"),
            ("DOCKER_HOST", "tcp://10.0.0.5:2375"),
            ("LOGVAULT_TIMESTAMPS", "false"),
            ("LOGVAULT_TAIL", "500"),
            ("LOGVAULT_MAX_FRAME_BYTES", "1024"),
            ("LOGVAULT_MULTILINE", "join"),
        ]));

        assert_eq!(cfg.data_dir, "/tmp/logs");
        assert_eq!(cfg.docker_socket, "tcp://10.0.0.5:2375");
        assert!(!cfg.timestamps);
        assert_eq!(cfg.tail_lines, 500);
        assert_eq!(cfg.max_frame_bytes, 1024);
        assert_eq!(cfg.multiline, MultilinePolicy::Join);
    }

    #[test]
    fn test_docker_socket_wins_over_docker_host() {
        let mut cfg = EngineConfig::default();
        cfg.apply_env_with(env(&[
            ("DOCKER_SOCKET", "unix:///run/docker.sock"),
            ("DOCKER_HOST", "tcp://10.0.0.5:2375"),
        ]));
        assert_eq!(cfg.docker_socket, "unix:///run/docker.sock");
    }

    #[test]
    fn test_bad_env_value_keeps_previous() {
        let mut cfg = EngineConfig::default();
        cfg.apply_env_with(env(&[("LOGVAULT_TAIL", "lots"), ("LOGVAULT_MULTILINE", "merge")]));
        assert_eq!(cfg.tail_lines, 100);
        assert_eq!(cfg.multiline, MultilinePolicy::Split);
    }

    #[test]
    fn test_from_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = \"/srv/logs\"\ntail_lines = 20").unwrap();

        let mut cfg = EngineConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.data_dir, "/srv/logs");
        assert_eq!(cfg.tail_lines, 20);

        cfg.apply_env_with(env(&[("LOGVAULT_TAIL", "5")]));
        assert_eq!(cfg.tail_lines, 5);
        assert_eq!(cfg.data_dir, "/srv/logs");
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(EngineConfig::from_file("/nonexistent/logvault.toml").is_err());
    }

    #[test]
    fn test_validate_default_passes() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = EngineConfig { data_dir: " ".to_string(), ..Default::default() };
        assert!(cfg.validate().unwrap_err().contains("data_dir"));

        let cfg = EngineConfig { max_frame_bytes: 0, ..Default::default() };
        assert!(cfg.validate().unwrap_err().contains("max_frame_bytes"));

        let cfg = EngineConfig { tail_lines: 0, ..Default::default() };
        assert!(cfg.validate().unwrap_err().contains("tail_lines"));
    }
}
