//! Server configuration and command line surface
//!
//! `program <port> <mode: server|client> <room_name> <username> <password>`

use std::time::Duration;

use crate::error::UsageError;

/// Default interface the server listens on
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Host the client dials
pub const CLIENT_HOST: &str = "localhost";

/// Usage text printed when arguments are missing
pub const USAGE: &str = "usage: chat_relay <port> <server|client> <room_name> <username> <password>

Raw clients (e.g. nc) must send the username line and then the password line
within 10 seconds, or the server answers `error: invalid credentials`.";

/// Per-session bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Upper bound on the credential payload
    pub credential_max_bytes: usize,
    /// How long to wait for the password line once the username line arrived
    ///
    /// A payload still missing its second line after this long is judged as
    /// is, which yields `error: invalid credentials`.
    pub credential_gap: Duration,
    /// Longer chat lines are relayed in chunks of this size
    pub max_line_bytes: usize,
    /// Frames queued per member before broadcasts to it have to wait
    pub outbox_capacity: usize,
    /// Longest a broadcast waits on one member's full outbox before that
    /// member misses the frame
    pub delivery_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            credential_max_bytes: 4096,
            credential_gap: Duration::from_secs(10),
            max_line_bytes: 4096,
            outbox_capacity: 32,
            delivery_timeout: Duration::from_secs(2),
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub limits: SessionLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 8080,
            limits: SessionLimits::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Host the room and join it
    Server,
    /// Join a room hosted elsewhere
    Client,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub port: u16,
    pub mode: Mode,
    pub room_name: String,
    pub username: String,
    pub password: String,
}

impl CliArgs {
    /// Parse arguments, excluding the program name
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let [port, mode, room_name, username, password] = <[String; 5]>::try_from(args)
            .map_err(|args| UsageError::MissingArguments(args.len()))?;

        let port = port
            .parse::<u16>()
            .map_err(|_| UsageError::InvalidPort(port.clone()))?;

        let mode = match mode.as_str() {
            "server" => Mode::Server,
            "client" => Mode::Client,
            _ => return Err(UsageError::UnknownMode(mode)),
        };

        Ok(Self {
            port,
            mode,
            room_name,
            username,
            password,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", CLIENT_HOST, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_server_mode() {
        let cli = CliArgs::parse(args(&["9000", "server", "lobby", "alice", "swordfish"])).unwrap();
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.mode, Mode::Server);
        assert_eq!(cli.room_name, "lobby");
        assert_eq!(cli.username, "alice");
        assert_eq!(cli.password, "swordfish");
        assert_eq!(cli.server_addr(), "localhost:9000");
    }

    #[test]
    fn test_parse_client_mode() {
        let cli = CliArgs::parse(args(&["9000", "client", "lobby", "bob", "swordfish"])).unwrap();
        assert_eq!(cli.mode, Mode::Client);
    }

    #[test]
    fn test_parse_missing_arguments() {
        assert_eq!(
            CliArgs::parse(args(&["9000", "server"])),
            Err(UsageError::MissingArguments(2))
        );
        assert_eq!(CliArgs::parse(Vec::new()), Err(UsageError::MissingArguments(0)));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert_eq!(
            CliArgs::parse(args(&["http", "server", "lobby", "bob", "pw"])),
            Err(UsageError::InvalidPort("http".to_string()))
        );
        assert_eq!(
            CliArgs::parse(args(&["9000", "relay", "lobby", "bob", "pw"])),
            Err(UsageError::UnknownMode("relay".to_string()))
        );
    }

    #[test]
    fn test_default_limits_tolerate_typed_credentials() {
        let limits = SessionLimits::default();
        assert!(limits.credential_gap >= Duration::from_secs(10));
        assert!(limits.delivery_timeout > Duration::ZERO);
        assert!(USAGE.contains("10 seconds"));
    }

    #[test]
    fn test_server_config_bind_addr() {
        assert_eq!(ServerConfig::with_port(9000).bind_addr(), "0.0.0.0:9000");
    }
}
