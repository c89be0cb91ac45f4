//! Password-Protected TCP Chat Relay - Entry Point
//!
//! `chat_relay <port> <server|client> <room_name> <username> <password>`
//!
//! In server mode the room is hosted on all interfaces and the local user
//! joins it as its first member; in client mode the local user joins a room
//! on localhost.

use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::config::USAGE;
use chat_relay::{
    ChatClient, ChatServer, CliArgs, ClientError, ClientOptions, Mode, Room, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they do not interleave with chat output
    // Use RUST_LOG env var to control log level, e.g. RUST_LOG=chat_relay=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match CliArgs::parse(env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            println!("{}", e);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    if cli.mode == Mode::Server {
        let room = Room::new(cli.room_name.as_str(), cli.password.as_str());
        let server = ChatServer::bind(&ServerConfig::with_port(cli.port), room).await?;

        tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                error!("Server stopped: {}", e);
            }
        });
    }

    let addr = cli.server_addr();
    let connection = ChatClient::new(cli.username.as_str(), cli.password.as_str())
        .with_options(ClientOptions { clear_echo: true })
        .connect(&addr)
        .await?;
    println!("connected to {}", addr);

    tokio::select! {
        result = connection.run(tokio::io::stdin(), tokio::io::stdout()) => match result {
            Ok(()) | Err(ClientError::ServerClosed) => println!("Disconnected from server"),
            Err(e) => return Err(e.into()),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, leaving room '{}'", cli.room_name);
        }
    }

    Ok(())
}
