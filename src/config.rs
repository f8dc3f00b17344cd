// ABOUTME: Tool configuration loaded from ~/.config/storm/config.toml
// ABOUTME: Chooses which SSH config file to manage and defines command aliases

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SshConfig {
    #[serde(default = "default_config_path")]
    pub config_path: String,
}

fn default_config_path() -> String {
    "~/.ssh/config".to_string()
}

impl Default for SshConfig {
    fn default() -> Self {
        SshConfig {
            config_path: default_config_path(),
        }
    }
}

impl Config {
    pub fn default_config_content() -> &'static str {
        r#"# Storm configuration

[ssh]
# The SSH client config file storm manages
config_path = "~/.ssh/config"

[aliases]
# Extra names for storm commands, expanded before argument parsing
# ls = ["list"]
# rm = ["delete"]
"#
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::load_from_str(&content)
    }

    /// Loads the user's configuration. A missing file is created with the
    /// defaults; a broken one is reported and the defaults are used.
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            match Self::save_default_config(path) {
                Ok(()) => tracing::info!("Created default configuration at {}", path.display()),
                Err(e) => tracing::warn!("{:#}", e),
            }
            return Config::default();
        }

        match Self::load_from_file(path).and_then(|config| config.validate().map(|_| config)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring configuration {}: {:#}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?;
        Ok(config_dir.join("storm").join("config.toml"))
    }

    pub fn ssh_config_path(&self) -> Result<PathBuf> {
        expand_tilde(&self.ssh.config_path).map(PathBuf::from)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ssh.config_path.trim().is_empty() {
            anyhow::bail!("ssh.config_path cannot be empty");
        }

        if let Some((name, _)) = self.aliases.iter().find(|(_, command)| command.is_empty()) {
            anyhow::bail!("Alias '{}' must map to a command", name);
        }

        Ok(())
    }

    /// Replaces a leading alias in `args` (program name first) with its command.
    pub fn expand_aliases(&self, args: Vec<String>) -> Vec<String> {
        let Some(command) = args.get(1).and_then(|first| self.aliases.get(first)) else {
            return args;
        };

        let mut expanded = Vec::with_capacity(args.len() + command.len());
        expanded.push(args[0].clone());
        expanded.extend(command.iter().cloned());
        expanded.extend(args.into_iter().skip(2));
        expanded
    }

    pub fn save_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config to: {}", path.display()))?;

        Ok(())
    }
}

fn expand_tilde(path: &str) -> Result<String> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir()
            .context("Failed to determine home directory")?;
        Ok(home.join(rest).to_string_lossy().into_owned())
    } else {
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[ssh]
config_path = "/etc/ssh/ssh_config"

[aliases]
ls = ["list"]
rm = ["delete"]
"#;

        let config = Config::load_from_str(config_str).unwrap();

        assert_eq!(config.ssh.config_path, "/etc/ssh/ssh_config");
        assert_eq!(config.aliases["ls"], vec!["list"]);
        assert_eq!(config.aliases.len(), 2);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_invalid_config_wrong_type() {
        let result = Config::load_from_str("[ssh]\nconfig_path = 42\n");

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse configuration"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        let home_str = home.to_string_lossy();

        assert_eq!(expand_tilde("~/test").unwrap(), format!("{}/test", home_str));
        assert_eq!(expand_tilde("/absolute/path").unwrap(), "/absolute/path");
        assert_eq!(expand_tilde("relative/path").unwrap(), "relative/path");
    }

    #[test]
    fn test_ssh_config_path_expanded() {
        let config = Config::default();
        let home = dirs::home_dir().unwrap();

        assert_eq!(config.ssh_config_path().unwrap(), home.join(".ssh/config"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path().unwrap();
        assert!(path.to_string_lossy().contains("storm"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_validate_empty_config_path() {
        let mut config = Config::default();
        config.ssh.config_path = "  ".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("config_path cannot be empty"));
    }

    #[test]
    fn test_validate_empty_alias() {
        let mut config = Config::default();
        config.aliases.insert("ls".to_string(), Vec::new());

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Alias 'ls'"));
    }

    #[test]
    fn test_expand_aliases() {
        let mut config = Config::default();
        config.aliases.insert("rm".to_string(), args(&["delete"]));
        config.aliases.insert("ll".to_string(), args(&["list", "--config", "/tmp/c"]));

        assert_eq!(config.expand_aliases(args(&["storm", "rm", "web"])), args(&["storm", "delete", "web"]));
        assert_eq!(
            config.expand_aliases(args(&["storm", "ll"])),
            args(&["storm", "list", "--config", "/tmp/c"])
        );
        assert_eq!(config.expand_aliases(args(&["storm", "add", "x"])), args(&["storm", "add", "x"]));
        assert_eq!(config.expand_aliases(args(&["storm"])), args(&["storm"]));
    }

    #[test]
    fn test_load_or_create_missing_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("storm").join("config.toml");
        assert_eq!(Config::load_or_create(&missing), Config::default());
        assert_eq!(fs::read_to_string(&missing).unwrap(), Config::default_config_content());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "{ invalid toml }").unwrap();
        assert_eq!(Config::load_or_create(&broken), Config::default());
        assert_eq!(fs::read_to_string(&broken).unwrap(), "{ invalid toml }");
    }

    #[test]
    fn test_default_config_content_can_be_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storm").join("config.toml");
        Config::save_default_config(&path).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, Config::default());
    }
}
