//! A sequential request/response client for beanstalkd-compatible servers.
use std::collections::BTreeMap;
use std::fmt;
use std::io;

use bytes::Bytes;
use tokio::io::{
    split, AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::line_reader::LineReader;
use crate::parser::ParsingError;
use crate::types::protocol::{Command, ReplyHead};
use crate::types::serialisable::BeanstalkSerialisable;
use crate::util::bytes_to_human_str;

/// An error from a single request/response exchange.
#[derive(Debug)]
pub enum ClientError {
    /// Transport-level failure.
    Io(io::Error),
    /// The server sent a reply line this client couldn't parse.
    Parse(ParsingError),
    /// The server closed the connection mid-exchange.
    Eof,
    /// The server replied `NOT_FOUND`: the job or tube doesn't exist, or
    /// doesn't satisfy the command's preconditions.
    NotFound,
    /// The server reported a failure (`OUT_OF_MEMORY`, `DRAINING`, ...).
    Server(ReplyHead),
    /// The server sent a well-formed reply that doesn't answer the request.
    Unexpected(ReplyHead),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Parse(e) => write!(f, "invalid reply: {e}"),
            Self::Eof => f.write_str("connection closed by server"),
            Self::NotFound => f.write_str("not found"),
            Self::Server(r) => write!(f, "server error: {r}"),
            Self::Unexpected(r) => write!(f, "unexpected reply: {r}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ParsingError> for ClientError {
    fn from(value: ParsingError) -> Self {
        Self::Parse(value)
    }
}

/// Maps a reply that didn't match the request to the right error class.
fn reply_error(reply: ReplyHead) -> ClientError {
    if reply.is_error() {
        ClientError::Server(reply)
    } else {
        ClientError::Unexpected(reply)
    }
}

/// One connection to a server, issuing one request at a time. Generic over
/// the transport so tests can drive it over an in-memory duplex stream.
pub struct Connection<T: AsyncRead + AsyncWrite + Unpin> {
    reader: LineReader<ReadHalf<T>>,
    writer: WriteHalf<T>,
}

impl Connection<TcpStream> {
    /// Establishes a TCP connection to `addr` (`host:port`).
    pub async fn dial(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr, "connected");
        Ok(Self::new(stream))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    pub fn new(transport: T) -> Self {
        let (r, w) = split(transport);
        Self {
            reader: r.into(),
            writer: w,
        }
    }

    /// `use <tube>`: selects the tube for put/peek-family commands.
    pub async fn use_tube(&mut self, tube: &str) -> Result<(), ClientError> {
        self.send(&Command::Use { tube: tube.into() }).await?;

        match self.read_reply().await? {
            ReplyHead::Using { .. } => Ok(()),
            other => Err(reply_error(other)),
        }
    }

    /// `put`: enqueues `body` on the used tube, returning the new job's ID.
    /// A job buried on insert due to server memory pressure still gets an ID
    /// and is treated as inserted.
    pub async fn put(
        &mut self,
        body: &[u8],
        pri: u32,
        delay: u32,
        ttr: u32,
    ) -> Result<u64, ClientError> {
        let n_bytes = u32::try_from(body.len())
            .map_err(|_| ClientError::Server(ReplyHead::JobTooBig))?;

        let mut buf = Command::Put {
            pri,
            delay,
            ttr,
            n_bytes,
        }
        .serialise_beanstalk();
        buf.extend_from_slice(body);
        buf.extend_from_slice(b"\r\n");

        trace!(line = bytes_to_human_str(&buf), "sending put");
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;

        match self.read_reply().await? {
            ReplyHead::Inserted { id } => Ok(id),
            ReplyHead::Buried { id: Some(id) } => {
                warn!(id, "server buried job on insert");
                Ok(id)
            },
            other => Err(reply_error(other)),
        }
    }

    /// `peek <id>`: reads a job's data by ID.
    pub async fn peek(&mut self, id: u64) -> Result<Bytes, ClientError> {
        self.send(&Command::Peek { id }).await?;
        self.read_found().await.map(|(_, body)| body)
    }

    /// `peek-ready`: reads the next ready job on the used tube.
    pub async fn peek_ready(&mut self) -> Result<(u64, Bytes), ClientError> {
        self.send(&Command::PeekReady).await?;
        self.read_found().await
    }

    /// `delete <id>`.
    pub async fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        self.send(&Command::Delete { id }).await?;

        match self.read_reply().await? {
            ReplyHead::Deleted => Ok(()),
            ReplyHead::NotFound => Err(ClientError::NotFound),
            other => Err(reply_error(other)),
        }
    }

    /// `bury <id> <pri>`.
    pub async fn bury(
        &mut self,
        id: u64,
        pri: u32,
    ) -> Result<(), ClientError> {
        self.send(&Command::Bury { id, pri }).await?;

        match self.read_reply().await? {
            ReplyHead::Buried { id: None } => Ok(()),
            ReplyHead::NotFound => Err(ClientError::NotFound),
            other => Err(reply_error(other)),
        }
    }

    /// `kick <bound>`: returns the number of jobs actually kicked on the
    /// used tube.
    pub async fn kick(&mut self, bound: u64) -> Result<u64, ClientError> {
        self.send(&Command::Kick { bound }).await?;

        match self.read_reply().await? {
            ReplyHead::Kicked { count: Some(count) } => Ok(count),
            other => Err(reply_error(other)),
        }
    }

    /// `list-tubes`: returns tube names in the order the server sent them.
    pub async fn list_tubes(&mut self) -> Result<Vec<String>, ClientError> {
        self.send(&Command::ListTubes).await?;

        let data = self.read_ok().await?;
        serde_yaml::from_slice(&data)
            .map_err(|_| ClientError::Parse(ParsingError::BadFormat))
    }

    /// `stats-tube <tube>`: returns the tube's statistics dictionary.
    pub async fn stats_tube(
        &mut self,
        tube: &str,
    ) -> Result<BTreeMap<String, serde_yaml::Value>, ClientError> {
        self.send(&Command::StatsTube { tube: tube.into() }).await?;

        let data = self.read_ok().await?;
        serde_yaml::from_slice(&data)
            .map_err(|_| ClientError::Parse(ParsingError::BadFormat))
    }

    /// `watch <tube>`: returns the watchlist size.
    pub async fn watch(&mut self, tube: &str) -> Result<u32, ClientError> {
        self.send(&Command::Watch { tube: tube.into() }).await?;

        match self.read_reply().await? {
            ReplyHead::Watching { count } => Ok(count),
            other => Err(reply_error(other)),
        }
    }

    /// `ignore <tube>`: returns the watchlist size.
    pub async fn ignore(&mut self, tube: &str) -> Result<u32, ClientError> {
        self.send(&Command::Ignore { tube: tube.into() }).await?;

        match self.read_reply().await? {
            ReplyHead::Watching { count } => Ok(count),
            other => Err(reply_error(other)),
        }
    }

    /// `reserve-with-timeout <seconds>`: returns the reserved job, or None
    /// if the timeout expired (or the server warned of an imminent TTR
    /// deadline) with no job handed over.
    pub async fn reserve_with_timeout(
        &mut self,
        timeout: u32,
    ) -> Result<Option<(u64, Bytes)>, ClientError> {
        self.send(&Command::ReserveWithTimeout { timeout }).await?;

        match self.read_reply().await? {
            ReplyHead::Reserved { id, n_bytes } => {
                let body = self.read_data(n_bytes).await?;
                Ok(Some((id, body)))
            },
            ReplyHead::TimedOut | ReplyHead::DeadlineSoon => Ok(None),
            other => Err(reply_error(other)),
        }
    }

    /// Writes one command line and flushes it.
    async fn send(&mut self, cmd: &Command) -> Result<(), ClientError> {
        let buf = cmd.serialise_beanstalk();
        trace!(line = bytes_to_human_str(&buf), "sending command");
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads and parses one reply line.
    async fn read_reply(&mut self) -> Result<ReplyHead, ClientError> {
        let line =
            self.reader.read_line().await?.ok_or(ClientError::Eof)?;
        trace!(line = bytes_to_human_str(&line), "received reply");
        Ok(ReplyHead::try_from(&line as &[u8])?)
    }

    /// Reads the data chunk following a length-carrying reply.
    async fn read_data(&mut self, n_bytes: u32) -> Result<Bytes, ClientError> {
        self.reader
            .read_chunk(n_bytes as usize)
            .await?
            .ok_or(ClientError::Eof)
    }

    /// Reads a `FOUND <id> <n>` reply plus its data chunk.
    async fn read_found(&mut self) -> Result<(u64, Bytes), ClientError> {
        match self.read_reply().await? {
            ReplyHead::Found { id, n_bytes } => {
                let body = self.read_data(n_bytes).await?;
                Ok((id, body))
            },
            ReplyHead::NotFound => Err(ClientError::NotFound),
            other => Err(reply_error(other)),
        }
    }

    /// Reads an `OK <n>` reply plus its YAML data chunk, mapping `NOT_FOUND`
    /// (unknown tube in `stats-tube`) to its own error.
    async fn read_ok(&mut self) -> Result<Bytes, ClientError> {
        match self.read_reply().await? {
            ReplyHead::Ok { n_bytes } => self.read_data(n_bytes).await,
            ReplyHead::NotFound => Err(ClientError::NotFound),
            other => Err(reply_error(other)),
        }
    }
}
