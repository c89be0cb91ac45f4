//! Interactive client
//!
//! A thin duplex pipe: input lines go to the server, server bytes go to the
//! output. No state is shared with the server side.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ClientError;
use crate::message::ServerReply;

/// Moves the cursor up one line and clears it, erasing the local echo
pub const CLEAR_TYPED_LINE: &str = "\x1b[1A\x1b[2K";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientOptions {
    /// Erase each sent line from the terminal after sending it
    pub clear_echo: bool,
}

/// Credentials for joining a room
#[derive(Debug, Clone)]
pub struct ChatClient {
    username: String,
    password: String,
    options: ClientOptions,
}

impl ChatClient {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            options: ClientOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Dial the server and authenticate
    pub async fn connect(&self, addr: &str) -> Result<ClientConnection<TcpStream>, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        self.handshake(stream).await
    }

    /// Send credentials over an open stream and wait for the verdict
    pub async fn handshake<S>(&self, stream: S) -> Result<ClientConnection<S>, ClientError>
    where
        S: AsyncRead + AsyncWrite,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        writer
            .write_all(format!("{}\n{}\n", self.username, self.password).as_bytes())
            .await?;

        let mut reply = String::new();
        if reader.read_line(&mut reply).await? == 0 {
            return Err(ClientError::ServerClosed);
        }

        match ServerReply::parse(&reply) {
            Some(ServerReply::Ok) => Ok(ClientConnection {
                reader,
                writer,
                options: self.options,
            }),
            Some(ServerReply::Error(message)) => Err(ClientError::Rejected(message)),
            None => Err(ClientError::UnexpectedReply(reply.trim().to_string())),
        }
    }
}

/// An authenticated connection, ready to relay
pub struct ClientConnection<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    options: ClientOptions,
}

impl<S> ClientConnection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Pipe `input` to the server and the server to `output`
    ///
    /// Returns `Ok` when the input ends and `ClientError::ServerClosed`
    /// when the server goes away first.
    pub async fn run<I, O>(self, input: I, mut output: O) -> Result<(), ClientError>
    where
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let Self {
            mut reader,
            mut writer,
            options,
        } = self;
        let mut input = BufReader::new(input).lines();
        let mut incoming = Vec::new();

        loop {
            tokio::select! {
                line = input.next_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        return Ok(());
                    };

                    writer.write_all(format!("{}\n", line).as_bytes()).await?;
                    if options.clear_echo {
                        output.write_all(CLEAR_TYPED_LINE.as_bytes()).await?;
                        output.flush().await?;
                    }
                }
                read = reader.read_until(b'\n', &mut incoming) => {
                    if read? == 0 {
                        return Err(ClientError::ServerClosed);
                    }

                    output.write_all(&incoming).await?;
                    output.flush().await?;
                    incoming.clear();
                }
            }
        }
    }
}
