//! Wire protocol definitions
//!
//! Line-oriented UTF-8 protocol: the server answers credentials with a
//! single reply line, then relays each chat line as `<sender>: <content>\n`.

use std::sync::Arc;

use crate::error::AuthError;

/// Serialized wire line, shared between every outbox it is queued on
pub type Frame = Arc<[u8]>;

/// Prefix of every rejection line
pub const ERROR_PREFIX: &str = "error: ";

/// Body of the success acknowledgement
pub const ACK: &str = "OK";

/// One inbound chat line, tagged with the authenticated sender
///
/// Produced per line and consumed immediately by the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub content: Vec<u8>,
}

impl Message {
    /// Build a message from a raw line, stripping its terminator
    pub fn from_line(sender: impl Into<String>, line: &[u8]) -> Self {
        let content = line
            .strip_suffix(b"\n")
            .map(|rest| rest.strip_suffix(b"\r").unwrap_or(rest))
            .unwrap_or(line);

        Self {
            sender: sender.into(),
            content: content.to_vec(),
        }
    }

    /// Render the relayed wire line `<sender>: <content>\n`
    pub fn to_frame(&self) -> Frame {
        let mut bytes = Vec::with_capacity(self.sender.len() + self.content.len() + 3);
        bytes.extend_from_slice(self.sender.as_bytes());
        bytes.extend_from_slice(b": ");
        bytes.extend_from_slice(&self.content);
        bytes.push(b'\n');
        bytes.into()
    }
}

/// Server → client reply to a credential payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    /// Authenticated and registered
    Ok,
    /// Rejected, connection closes afterwards
    Error(String),
}

impl ServerReply {
    pub fn to_line(&self) -> String {
        match self {
            ServerReply::Ok => format!("{}\n", ACK),
            ServerReply::Error(message) => format!("{}{}\n", ERROR_PREFIX, message),
        }
    }

    /// Parse a reply line as received by a client
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line == ACK {
            Some(ServerReply::Ok)
        } else {
            line.strip_prefix(ERROR_PREFIX.trim_end())
                .map(|message| ServerReply::Error(message.trim().to_string()))
        }
    }
}

/// Convert AuthError to ServerReply for client notification
impl From<AuthError> for ServerReply {
    fn from(err: AuthError) -> Self {
        ServerReply::Error(err.to_string())
    }
}
