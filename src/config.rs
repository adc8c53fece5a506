//! Session and engine configuration

use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Identity details sent along with the user's credentials
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client GUID
    pub client_guid: Uuid,
    /// Domain for authentication
    pub domain: String,
    /// Workstation name
    pub workstation: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_guid: Uuid::new_v4(),
            domain: String::from("WORKGROUP"),
            workstation: String::from("RUST-SMB-CLIENT"),
        }
    }
}

/// Configuration for the local-directory engine
#[derive(Debug, Clone)]
pub struct LocalEngineConfig {
    /// Host name the engine answers to (compared case-insensitively)
    pub hostname: String,
    /// Share name -> directory exported under it
    pub shares: HashMap<String, PathBuf>,
    /// User name -> password; empty means guest access
    pub users: HashMap<String, String>,
    /// Whether to refuse write access
    pub read_only: bool,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            hostname: String::from("localhost"),
            shares: HashMap::new(),
            users: HashMap::new(),
            read_only: false,
        }
    }
}

impl LocalEngineConfig {
    /// Export `root` as `name`
    pub fn with_share(mut self, name: &str, root: impl Into<PathBuf>) -> Self {
        self.shares.insert(name.to_ascii_uppercase(), root.into());
        self
    }

    /// Require `username` to authenticate with `password`
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users
            .insert(username.to_string(), password.to_string());
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
