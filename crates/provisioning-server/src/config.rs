//! Server configuration: TOML file + CLI overrides.

use provisioning_core::{
    ProvResult, ProvisioningError, SharedSecret, DEFAULT_CODE_TIMEOUT_SECS, DEFAULT_PREFIX,
    DEFAULT_SUBPROTOCOL,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub provisioning: ProvisioningSection,
    #[serde(default)]
    pub users: Vec<UserSeed>,
    #[serde(default)]
    pub simulation: SimulationSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            prefix: default_prefix(),
        }
    }
}

/// `[provisioning]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningSection {
    #[serde(default)]
    pub shared_secret: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Advisory display timeout sent with each delivery code (seconds).
    #[serde(default = "default_code_timeout")]
    pub code_timeout: u64,
    /// Upper bound on a whole login handshake (seconds).
    #[serde(default = "default_login_timeout")]
    pub login_timeout: u64,
}

impl Default for ProvisioningSection {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            protocol: default_protocol(),
            code_timeout: default_code_timeout(),
            login_timeout: default_login_timeout(),
        }
    }
}

/// `[[users]]` entry seeding the in-memory user directory.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub mxid: String,
    #[serde(default)]
    pub management_room: String,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub guilds: Vec<GuildSeed>,
}

/// `[[users.guilds]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bridged: bool,
}

/// `[simulation]` section: drives the scripted remote-auth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_sim_codes")]
    pub codes: Vec<String>,
    /// Seconds between codes, and before completion.
    #[serde(default = "default_sim_interval")]
    pub code_interval: u64,
    #[serde(default = "default_sim_user_id")]
    pub user_id: String,
    #[serde(default = "default_sim_token")]
    pub token: String,
    /// Make the dial itself fail.
    #[serde(default)]
    pub fail: bool,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            codes: default_sim_codes(),
            code_interval: default_sim_interval(),
            user_id: default_sim_user_id(),
            token: default_sim_token(),
            fail: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    29334
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_protocol() -> String {
    DEFAULT_SUBPROTOCOL.to_string()
}
fn default_code_timeout() -> u64 {
    DEFAULT_CODE_TIMEOUT_SECS
}
/// Upper bound for `provisioning.login_timeout`, in seconds.
pub const MAX_LOGIN_TIMEOUT: u64 = 86_400;

fn default_login_timeout() -> u64 {
    300
}
fn default_sim_codes() -> Vec<String> {
    vec!["simulated-code-1".to_string(), "simulated-code-2".to_string()]
}
fn default_sim_interval() -> u64 {
    5
}
fn default_sim_user_id() -> String {
    "simulated#0001".to_string()
}
fn default_sim_token() -> String {
    "simulated-token".to_string()
}

/// Values given on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub prefix: Option<String>,
    pub shared_secret: Option<String>,
}

/// Resolved server configuration (CLI overrides applied, values validated).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Normalized: empty, or a leading `/` and no trailing `/`.
    pub prefix: String,
    pub shared_secret: SharedSecret,
    pub protocol: String,
    pub code_timeout: u64,
    pub login_timeout: u64,
    pub users: Vec<UserSeed>,
    pub simulation: SimulationSection,
}

impl ServerConfig {
    /// Load config from TOML file, then apply CLI overrides.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> ProvResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    toml::from_str::<ConfigFile>(&content).map_err(|e| {
                        ProvisioningError::Config(format!("config parse error: {e}"))
                    })?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        Self::resolve(file_config, overrides)
    }

    /// Merge overrides into a parsed file and validate the result.
    pub fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> ProvResult<Self> {
        let secret = overrides
            .shared_secret
            .unwrap_or(file.provisioning.shared_secret);
        if secret.is_empty() {
            return Err(ProvisioningError::Config(
                "provisioning.shared_secret must be set".into(),
            ));
        }
        if file.provisioning.protocol.is_empty() {
            return Err(ProvisioningError::Config(
                "provisioning.protocol must not be empty".into(),
            ));
        }

        let login_timeout = file.provisioning.login_timeout;
        if login_timeout == 0 || login_timeout > MAX_LOGIN_TIMEOUT {
            return Err(ProvisioningError::Config(format!(
                "provisioning.login_timeout must be between 1 and {MAX_LOGIN_TIMEOUT} seconds, got {login_timeout}"
            )));
        }

        let prefix = overrides.prefix.unwrap_or(file.server.prefix);

        Ok(Self {
            host: overrides.host.unwrap_or(file.server.host),
            port: overrides.port.unwrap_or(file.server.port),
            prefix: normalize_prefix(&prefix),
            shared_secret: SharedSecret::new(secret),
            protocol: file.provisioning.protocol,
            code_timeout: file.provisioning.code_timeout,
            login_timeout,
            users: file.users,
            simulation: file.simulation,
        })
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret(secret: &str) -> ConfigOverrides {
        ConfigOverrides {
            shared_secret: Some(secret.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply() {
        let cfg = ServerConfig::resolve(ConfigFile::default(), with_secret("abc")).unwrap();
        assert_eq!(cfg.port, 29334);
        assert_eq!(cfg.prefix, DEFAULT_PREFIX);
        assert_eq!(cfg.protocol, DEFAULT_SUBPROTOCOL);
        assert_eq!(cfg.code_timeout, 120);
        assert!(cfg.shared_secret.matches("abc"));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = ServerConfig::resolve(ConfigFile::default(), ConfigOverrides::default());
        assert!(matches!(err, Err(ProvisioningError::Config(_))));
    }

    #[test]
    fn out_of_range_login_timeout_is_rejected() {
        for value in ["0", "9223372036854775807", "86401"] {
            let file: ConfigFile = toml::from_str(&format!(
                "[provisioning]\nshared_secret = \"x\"\nlogin_timeout = {value}\n"
            ))
            .unwrap();
            let err = ServerConfig::resolve(file, ConfigOverrides::default());
            assert!(matches!(err, Err(ProvisioningError::Config(_))), "accepted {value}");
        }

        let file: ConfigFile =
            toml::from_str("[provisioning]\nshared_secret = \"x\"\nlogin_timeout = 86400\n")
                .unwrap();
        let cfg = ServerConfig::resolve(file, ConfigOverrides::default()).unwrap();
        assert_eq!(cfg.login_timeout, MAX_LOGIN_TIMEOUT);
    }

    #[test]
    fn parses_full_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000
            prefix = "provision/"

            [provisioning]
            shared_secret = "s3cret"
            code_timeout = 60

            [[users]]
            mxid = "@u:server"
            management_room = "!room:server"

            [[users.guilds]]
            id = "1"
            name = "Guild"

            [simulation]
            codes = ["A", "B"]
            code_interval = 1
            "#,
        )
        .unwrap();
        let cfg = ServerConfig::resolve(file, ConfigOverrides::default()).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.prefix, "/provision");
        assert_eq!(cfg.code_timeout, 60);
        assert_eq!(cfg.login_timeout, 300);
        assert_eq!(cfg.users.len(), 1);
        assert_eq!(cfg.users[0].guilds[0].name, "Guild");
        assert!(!cfg.users[0].guilds[0].bridged);
        assert_eq!(cfg.simulation.codes, vec!["A", "B"]);
    }

    #[test]
    fn cli_overrides_file() {
        let mut file = ConfigFile::default();
        file.provisioning.shared_secret = "from-file".into();
        let cfg = ServerConfig::resolve(
            file,
            ConfigOverrides {
                port: Some(1234),
                prefix: Some("/".into()),
                shared_secret: Some("from-cli".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.port, 1234);
        assert_eq!(cfg.prefix, "");
        assert!(cfg.shared_secret.matches("from-cli"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provisioning]\nshared_secret = \"disk\"\n").unwrap();
        let cfg = ServerConfig::load(Some(&path), ConfigOverrides::default()).unwrap();
        assert!(cfg.shared_secret.matches("disk"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cfg = ServerConfig::load(Some(&path), with_secret("x")).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
    }
}
