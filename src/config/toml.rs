//! TOML configuration file parsing
//!
//! Every key is optional; missing keys keep their defaults.
//!
//! ```toml
//! threads = 8
//! block_size = 65536
//! file_size_mb = 256
//! paths = ["/mnt/a", "/mnt/b"]
//! consistency_check = true
//!
//! [phases]
//! enabled = [true, false, true, false]
//! ```

use super::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::Phase;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.block_size, 4096);
    }

    #[test]
    fn test_parse_values() {
        let toml_str = r#"
            threads = 8
            block_size = 65536
            file_size_mb = 256
            paths = ["/mnt/a", "/mnt/b"]
            use_mmap = true
            consistency_check = true

            [phases]
            enabled = [true, false, true, false]
        "#;

        let config = parse_toml_string(toml_str).unwrap();
        assert_eq!(config.threads, 8);
        assert_eq!(config.block_size, 65536);
        assert_eq!(config.file_size_mb, 256);
        assert_eq!(config.paths, vec![PathBuf::from("/mnt/a"), PathBuf::from("/mnt/b")]);
        assert!(config.use_mmap);
        assert!(config.consistency_check);
        assert!(config.phases.contains(Phase::Read));
        assert!(!config.phases.contains(Phase::RandomRead));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(parse_toml_string("threads = \"lots\"").is_err());
    }

    #[test]
    fn test_parse_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "random_ops = 42").unwrap();
        writeln!(file, "terse = true").unwrap();

        let config = parse_toml_file(file.path()).unwrap();
        assert_eq!(config.random_ops, 42);
        assert!(config.terse);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_toml_file(Path::new("/nonexistent/iostorm.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
