use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_BIND_HOST, DEFAULT_BIND_PORT, DEFAULT_DATA_TIMEOUT_SECS, DEFAULT_MAX_LINE_BYTES,
};
use crate::core_auth::{Permission, UserTable};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    /// Real directory serving as the virtual root ("/") of every session.
    pub chroot_dir: PathBuf,
    /// IPv4 address advertised in 227 replies. Defaults to the address the
    /// control connection arrived on; set it when the server sits behind NAT.
    #[serde(default)]
    pub pasv_address: Option<String>,
    /// Bound on waiting for the data connection, in seconds.
    #[serde(default = "default_data_timeout_secs")]
    pub data_timeout_secs: u64,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Extra greeting text; when present the 220 greeting goes out as a
    /// multi-line reply with one continuation per banner line.
    #[serde(default)]
    pub banner: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
    pub permission: Permission,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default = "default_users")]
    pub users: Vec<UserConfig>,
}

fn default_bind_host() -> String {
    DEFAULT_BIND_HOST.to_string()
}

fn default_bind_port() -> u16 {
    DEFAULT_BIND_PORT
}

fn default_data_timeout_secs() -> u64 {
    DEFAULT_DATA_TIMEOUT_SECS
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

fn default_users() -> Vec<UserConfig> {
    vec![
        UserConfig {
            name: "user".into(),
            password: "123456".into(),
            permission: Permission::ReadWrite,
        },
        UserConfig {
            name: "guest".into(),
            password: "guest".into(),
            permission: Permission::ReadOnly,
        },
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
            chroot_dir: PathBuf::from("./ftp_root"),
            pasv_address: None,
            data_timeout_secs: default_data_timeout_secs(),
            max_line_bytes: default_max_line_bytes(),
            banner: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            users: default_users(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))?;
        Ok(config)
    }

    pub fn user_table(&self) -> UserTable {
        let mut table = UserTable::new();
        for user in &self.users {
            table.insert(&user.name, &user.password, user.permission);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            chroot_dir = "/srv/ftp"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_host, "0.0.0.0");
        assert_eq!(config.server.bind_port, 2121);
        assert_eq!(config.server.data_timeout_secs, 30);
        assert_eq!(config.server.max_line_bytes, 8192);
        assert!(config.server.pasv_address.is_none());
        // Default user table: one read-write user, one read-only guest.
        assert_eq!(config.users.len(), 2);
        assert!(config.user_table().authenticate("user", "123456").is_some());
    }

    #[test]
    fn parses_users_and_overrides() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind_host = "127.0.0.1"
            bind_port = 2222
            chroot_dir = "/tmp/root"
            pasv_address = "203.0.113.7"
            data_timeout_secs = 5

            [[users]]
            name = "alice"
            password = "s3cret"
            permission = "read-write"

            [[users]]
            name = "bob"
            password = "pw"
            permission = "read-only"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.pasv_address.as_deref(), Some("203.0.113.7"));
        let table = config.user_table();
        assert!(table.authenticate("alice", "s3cret").unwrap().permission.can_write());
        assert!(!table.authenticate("bob", "pw").unwrap().permission.can_write());
    }
}
