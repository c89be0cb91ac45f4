//! Connection acceptor
//!
//! Binds the listener and spawns one independent session task per accepted
//! connection. The accept loop never waits on a session.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::registry::MembershipRegistry;
use crate::room::Room;
use crate::session::{handle_connection, SessionContext};

/// Source of inbound connections
pub(crate) trait Listener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Listener for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// A bound chat room server
pub struct ChatServer {
    listener: TcpListener,
    context: SessionContext,
}

impl ChatServer {
    /// Bind the listener for `room`
    ///
    /// A bind failure is returned as `AppError::Bind` and is not retried.
    pub async fn bind(config: &ServerConfig, room: Room) -> Result<Self, AppError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;

        Ok(Self {
            listener,
            context: SessionContext::new(room, config.limits),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn room(&self) -> &Room {
        &self.context.room
    }

    /// Shared handle on the room's membership
    pub fn registry(&self) -> Arc<MembershipRegistry> {
        Arc::clone(&self.context.registry)
    }

    /// Accept connections until the listener fails
    pub async fn serve(self) -> Result<(), AppError> {
        self.serve_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves or the listener fails
    ///
    /// On shutdown live sessions are aborted, which deregisters their
    /// members. When the listener fails, live sessions keep running and
    /// only new connections are refused.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Room '{}' listening on {}", self.context.room.name(), addr);
        }

        accept_loop(&self.listener, &self.context, shutdown).await
    }
}

async fn accept_loop<L, F>(
    listener: &L,
    context: &SessionContext,
    shutdown: F,
) -> Result<(), AppError>
where
    L: Listener,
    F: Future<Output = ()>,
{
    let mut sessions = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Server interrupted. Shutting down.");
                sessions.shutdown().await;
                info!(
                    "Server shut down ({} members remaining)",
                    context.registry.member_count()
                );
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let context = context.clone();

                    sessions.spawn(async move {
                        if let Err(e) = handle_connection(stream, context).await {
                            warn!("Session for {} ended: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!(
                        "Failed to accept connection: {} ({} sessions left running)",
                        e,
                        sessions.len()
                    );
                    sessions.detach_all();
                    return Err(AppError::Accept(e));
                }
            },
            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!("Session task panicked: {}", e);
                    }
                }
            }
        }
    }
}
