//! Password-Protected TCP Chat Relay Library
//!
//! Clients connect to a named room over TCP, authenticate with the room's
//! shared password, and exchange newline-delimited messages that the server
//! fans out to every other member.
//!
//! # Protocol
//! - Client → Server, right after connecting: `<username>\n<password>\n`
//! - Server → Client: `OK\n`, or `error: <message>\n` followed by close
//! - Afterwards each client line is relayed to the others as `<username>: <line>\n`
//!
//! # Architecture
//! One tokio task per connection, sharing a single membership registry:
//! - `MembershipRegistry` maps connection handles to members under one `RwLock`
//! - Each member owns a bounded outbox drained by its own writer task
//! - `Broadcaster` queues a frame on every other member's outbox concurrently,
//!   waiting on a full outbox up to the delivery timeout; only a peer stalled
//!   past that misses frames
//! - A session deregisters itself when its own connection ends
//!
//! # Example
//! ```ignore
//! use chat_relay::{ChatServer, Room, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chat_relay::AppError> {
//!     let server = ChatServer::bind(&ServerConfig::with_port(8080), Room::new("lobby", "swordfish")).await?;
//!     server.serve().await
//! }
//! ```

pub mod auth;
pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use auth::authenticate;
pub use broadcast::{BroadcastReport, Broadcaster};
pub use client::{ChatClient, ClientConnection, ClientOptions};
pub use config::{CliArgs, Mode, ServerConfig, SessionLimits};
pub use error::{AppError, AuthError, ClientError, DeliveryError, MalformedCredentials, UsageError};
pub use message::{Frame, Message, ServerReply};
pub use registry::{Member, MembershipRegistry, Outbox};
pub use room::Room;
pub use server::ChatServer;
pub use session::{handle_connection, run_session, SessionContext, SessionState};
pub use types::MemberId;
