//! Per-connection session handler
//!
//! Drives one connection through `Connecting → Authenticating → Registered → Closed`:
//! reads the credential payload, authenticates it against the room, registers
//! the member, then relays every inbound line to the rest of the room until
//! the connection ends.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    WriteHalf,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::authenticate;
use crate::broadcast::Broadcaster;
use crate::config::SessionLimits;
use crate::error::AppError;
use crate::message::{Frame, Message, ServerReply};
use crate::registry::{Member, MembershipRegistry};
use crate::room::Room;
use crate::types::MemberId;

/// Lifecycle of one connection
///
/// No state is revisited; `Closed` is terminal and reachable from any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Registered,
    Closed,
}

impl SessionState {
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Connecting, Authenticating)
                | (Authenticating, Registered)
                | (Connecting | Authenticating | Registered, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Registered => "registered",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Everything a session shares with the rest of the server
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub room: Arc<Room>,
    pub registry: Arc<MembershipRegistry>,
    pub broadcaster: Broadcaster,
    pub limits: SessionLimits,
}

impl SessionContext {
    pub fn new(room: Room, limits: SessionLimits) -> Self {
        let registry = Arc::new(MembershipRegistry::new());

        Self {
            room: Arc::new(room),
            broadcaster: Broadcaster::new(Arc::clone(&registry), limits.delivery_timeout),
            registry,
            limits,
        }
    }
}

/// Handle a newly accepted TCP connection
pub async fn handle_connection(stream: TcpStream, ctx: SessionContext) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    run_session(stream, peer_addr, ctx).await
}

/// Run a full session over any duplex byte stream
pub async fn run_session<S>(
    stream: S,
    peer: impl Into<String>,
    ctx: SessionContext,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut session = Session::new(peer.into());
    let result = session.run(stream, &ctx).await;
    session.advance(SessionState::Closed);
    result
}

struct Session {
    id: MemberId,
    peer: String,
    state: SessionState,
}

impl Session {
    fn new(peer: String) -> Self {
        Self {
            id: MemberId::new(),
            peer,
            state: SessionState::Connecting,
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid session transition {} -> {}",
            self.state,
            next
        );
        debug!("Session {} ({}): {} -> {}", self.id, self.peer, self.state, next);
        self.state = next;
    }

    async fn run<S>(&mut self, stream: S, ctx: &SessionContext) -> Result<(), AppError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        self.advance(SessionState::Authenticating);

        let payload = read_credentials(&mut reader, &ctx.limits).await?;
        if payload.is_empty() {
            debug!("Client {} left before sending credentials", self.peer);
            return Ok(());
        }

        let username = match authenticate(&payload, &ctx.room) {
            Ok(username) => username,
            Err(e) => {
                if e.is_malformed() {
                    debug!("Malformed credentials from {}: {}", self.peer, e);
                } else {
                    warn!("Rejected {}: {}", self.peer, e);
                }
                writer
                    .write_all(ServerReply::from(e).to_line().as_bytes())
                    .await?;
                writer.shutdown().await?;
                return Err(e.into());
            }
        };

        let (outbox, outbox_rx) = mpsc::channel(ctx.limits.outbox_capacity);
        let count = ctx
            .registry
            .register(Member::new(self.id, username.as_str(), outbox));
        let membership = Membership {
            registry: &ctx.registry,
            id: self.id,
            username: &username,
        };

        if ctx.registry.host() == Some(self.id) {
            info!("Host '{}' created room '{}'", username, ctx.room.name());
        }
        info!("Client connected: {} (Total clients: {})", username, count);
        self.advance(SessionState::Registered);

        writer.write_all(ServerReply::Ok.to_line().as_bytes()).await?;

        // Frames queued before this point are written right after the ack
        let mut write_task = tokio::spawn(drain_outbox(outbox_rx, writer));

        let outcome = tokio::select! {
            res = relay_lines(&mut reader, &username, self.id, &ctx.broadcaster, ctx.limits.max_line_bytes) => res,
            res = &mut write_task => match res {
                Ok(written) => written.map_err(AppError::from),
                Err(e) => Err(io::Error::other(e).into()),
            },
        };

        write_task.abort();
        drop(membership);

        outcome
    }
}

/// Registration held by a session; dropping it deregisters the member
///
/// Runs on every exit path of a registered session, including task abort.
struct Membership<'a> {
    registry: &'a MembershipRegistry,
    id: MemberId,
    username: &'a str,
}

impl Drop for Membership<'_> {
    fn drop(&mut self) {
        let count = self.registry.deregister(self.id);
        info!(
            "Client disconnected: {} (Total clients: {})",
            self.username, count
        );
    }
}

/// Read up to two credential lines
///
/// Returns an empty payload when the peer closed before sending anything.
/// Once the first line is in, the second must follow within
/// `credential_gap`; otherwise whatever arrived is evaluated as is.
async fn read_credentials<R>(reader: &mut R, limits: &SessionLimits) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut payload = Vec::new();

    for _ in 0..2 {
        let remaining = limits.credential_max_bytes.saturating_sub(payload.len());
        if remaining == 0 {
            break;
        }

        let first_line = payload.is_empty();
        let mut bounded = (&mut *reader).take(remaining as u64);
        let read = bounded.read_until(b'\n', &mut payload);

        let n = if first_line {
            read.await?
        } else {
            match tokio::time::timeout(limits.credential_gap, read).await {
                Ok(n) => n?,
                Err(_) => break,
            }
        };

        if n == 0 || !payload.ends_with(b"\n") {
            break;
        }
    }

    Ok(payload)
}

/// Broadcast every inbound line until EOF or a read error
async fn relay_lines<R>(
    reader: &mut R,
    sender: &str,
    id: MemberId,
    broadcaster: &Broadcaster,
    max_line_bytes: usize,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = (&mut *reader)
            .take(max_line_bytes as u64)
            .read_until(b'\n', &mut line)
            .await?;

        if n == 0 {
            debug!("Read side closed for {}", sender);
            return Ok(());
        }

        broadcaster
            .broadcast(&Message::from_line(sender, &line), id)
            .await;
    }
}

/// Write queued frames to the connection in order
async fn drain_outbox<W>(mut rx: mpsc::Receiver<Frame>, mut writer: WriteHalf<W>) -> io::Result<()>
where
    W: AsyncWrite,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            debug!("Write failed, ending write task: {}", e);
            return Err(e);
        }
    }

    debug!("Outbox closed, ending write task");
    writer.shutdown().await
}
