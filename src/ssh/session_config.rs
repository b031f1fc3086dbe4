// ABOUTME: Connection parameters for a single SSH session.
// ABOUTME: Parses target strings like "host", "user@host", "host:port", "user@host:port".

use std::fmt;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_USER: &str = "root";

/// Configuration for establishing an SSH session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication (default: root).
    pub user: String,
    /// Password for password authentication, and passphrase fallback for
    /// encrypted key files.
    pub password: Option<String>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: None,
        }
    }

    /// Parse `[user@]host[:port]`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target cannot be empty".to_string());
        }

        let (user_part, rest) = match s.find('@') {
            Some(at_pos) => (Some(&s[..at_pos]), &s[at_pos + 1..]),
            None => (None, s),
        };

        let (host, port) = match rest.rfind(':') {
            Some(colon_pos) => {
                let port_str = &rest[colon_pos + 1..];
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port_str))?;
                (&rest[..colon_pos], port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        let mut config = SessionConfig::new(host).port(port);
        if let Some(user) = user_part {
            if user.is_empty() {
                return Err("username cannot be empty".to_string());
            }
            config = config.user(user);
        }
        Ok(config)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// `user@host`, with `:port` appended for non-default ports.
    pub fn target(&self) -> String {
        if self.port == DEFAULT_PORT {
            format!("{}@{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
