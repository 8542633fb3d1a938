//! Write a default configuration file.

use anyhow::{Context, Result};
use devsync_link::LinkConfig;
use std::path::Path;

/// Run the init command.
pub fn run(config_path: &Path, name: Option<&str>, force: bool) -> Result<LinkConfig> {
    // Check if already initialized
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let mut config = LinkConfig::default();
    if let Some(name) = name {
        config.device.name = name.to_string();
    }
    config
        .save(config_path)
        .context("Failed to write configuration")?;

    println!("Device initialized successfully!");
    println!();
    println!("  Device ID: {}", config.device.id);
    println!("  Name:      {}", config.device.name);
    println!("  Config:    {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  Try a paired session in-process: devsync simulate --lock-peer");

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devsync.toml");
        let created = run(&path, Some("Test Device"), false).unwrap();

        assert!(path.exists());

        let loaded = LinkConfig::from_file(&path).unwrap();
        assert_eq!(loaded.device.name, "Test Device");
        assert_eq!(loaded.device.id, created.device.id);
    }

    #[test]
    fn init_fails_if_already_initialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devsync.toml");

        // First init should succeed
        run(&path, None, false).unwrap();

        // Second init should fail
        assert!(run(&path, None, false).is_err());
    }

    #[test]
    fn force_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devsync.toml");

        let first = run(&path, None, false).unwrap();
        let second = run(&path, Some("Other"), true).unwrap();

        assert_ne!(first.device.id, second.device.id);
        assert_eq!(LinkConfig::from_file(&path).unwrap().device.name, "Other");
    }
}
