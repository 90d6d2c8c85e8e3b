use std::fmt;

use super::serialisable::BeanstalkSerialisable;

/// A command sent by this client to the server. Only the subset of the
/// beanstalkd command set used by the admin operations is represented.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Selects the tube subsequent `put` and `peek`-family commands apply to.
    ///
    /// On the wire: `use <tube>`
    Use { tube: String },
    /// Places a job onto the currently `use`d tube. The job data follows the
    /// command line as a separate CRLF-terminated chunk of `n_bytes` bytes,
    /// written by the caller.
    ///
    /// On the wire: `put <pri> <delay> <ttr> <n_bytes>`
    Put {
        pri: u32,
        delay: u32,
        ttr: u32,
        n_bytes: u32,
    },
    /// Reads a job's data by ID regardless of its state.
    ///
    /// On the wire: `peek <id>`
    Peek { id: u64 },
    /// Reads the next ready job on the currently-used tube.
    ///
    /// On the wire: `peek-ready`
    PeekReady,
    /// Deletes a job in the ready, buried, or delayed states (or reserved by
    /// this client).
    ///
    /// On the wire: `delete <id>`
    Delete { id: u64 },
    /// Buries a job, removing it from rotation until kicked.
    ///
    /// On the wire: `bury <id> <pri>`
    Bury { id: u64, pri: u32 },
    /// Promotes up to `bound` buried (or, failing that, delayed) jobs on the
    /// currently-used tube back to ready.
    ///
    /// On the wire: `kick <bound>`
    Kick { bound: u64 },
    /// Requests the names of all tubes that currently exist.
    ///
    /// On the wire: `list-tubes`
    ListTubes,
    /// Requests the statistics dictionary for one tube.
    ///
    /// On the wire: `stats-tube <tube>`
    StatsTube { tube: String },
    /// Adds a tube to this client's reserve watchlist.
    ///
    /// On the wire: `watch <tube>`
    Watch { tube: String },
    /// Removes a tube from this client's reserve watchlist.
    ///
    /// On the wire: `ignore <tube>`
    Ignore { tube: String },
    /// Reserves the next ready job from the watched tubes, waiting at most
    /// `timeout` seconds.
    ///
    /// On the wire: `reserve-with-timeout <seconds>`
    ReserveWithTimeout { timeout: u32 },
}

impl BeanstalkSerialisable for Command {
    fn serialise_beanstalk(&self) -> Vec<u8> {
        use Command::*;

        match self {
            Use { tube } => format!("use {tube}\r\n").into_bytes(),
            Put {
                pri,
                delay,
                ttr,
                n_bytes,
            } => format!("put {pri} {delay} {ttr} {n_bytes}\r\n").into_bytes(),
            Peek { id } => format!("peek {id}\r\n").into_bytes(),
            PeekReady => b"peek-ready\r\n".to_vec(),
            Delete { id } => format!("delete {id}\r\n").into_bytes(),
            Bury { id, pri } => format!("bury {id} {pri}\r\n").into_bytes(),
            Kick { bound } => format!("kick {bound}\r\n").into_bytes(),
            ListTubes => b"list-tubes\r\n".to_vec(),
            StatsTube { tube } => {
                format!("stats-tube {tube}\r\n").into_bytes()
            },
            Watch { tube } => format!("watch {tube}\r\n").into_bytes(),
            Ignore { tube } => format!("ignore {tube}\r\n").into_bytes(),
            ReserveWithTimeout { timeout } => {
                format!("reserve-with-timeout {timeout}\r\n").into_bytes()
            },
        }
    }
}

/// The first line of a server reply. Replies carrying data (`FOUND`,
/// `RESERVED`, `OK`) state the chunk length here; the chunk itself is read
/// separately.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyHead {
    /// In response to a `put`: a job was created with the given ID.
    Inserted { id: u64 },
    /// `BURIED <id>` in response to a `put` (job buried on insert due to
    /// memory pressure); bare `BURIED` in response to a `bury` (success).
    Buried { id: Option<u64> },
    /// In response to a `use`: the named tube is now in use.
    Using { tube: String },
    /// In response to a `peek`-family command: job data follows.
    Found { id: u64, n_bytes: u32 },
    /// In response to a reserve-family command: job data follows.
    Reserved { id: u64, n_bytes: u32 },
    /// In response to `list-tubes` or `stats`-family commands: a YAML
    /// payload follows.
    Ok { n_bytes: u32 },
    /// `KICKED <count>` in response to a `kick`; bare `KICKED` in response
    /// to a `kick-job`.
    Kicked { count: Option<u64> },
    /// In response to a `watch` or `ignore`: number of watched tubes.
    Watching { count: u32 },
    /// The job or tube the command names is unknown to the server, or does
    /// not satisfy the command's preconditions.
    NotFound,
    /// In response to a `delete`: success.
    Deleted,
    /// In response to a `reserve-with-timeout`: the timeout expired with no
    /// job becoming ready.
    TimedOut,
    /// In response to a reserve-family command: a job already reserved by
    /// this client is about to exceed its TTR.
    DeadlineSoon,
    /// In response to an `ignore` that would empty the watchlist.
    NotIgnored,
    /// The server cannot handle the request due to memory pressure.
    OutOfMemory,
    /// The server hit an internal bug.
    InternalError,
    /// The server rejected the request as malformed.
    BadFormat,
    /// The server did not recognise the command.
    UnknownCommand,
    /// In response to a `put`: the job data was not CRLF-terminated.
    ExpectedCrlf,
    /// In response to a `put`: the job data exceeded the server's limit.
    JobTooBig,
    /// In response to a `put`: the server is draining and refusing new jobs.
    Draining,
}

impl ReplyHead {
    /// The reply's wire name, used in diagnostics.
    pub fn wire_name(&self) -> &'static str {
        use ReplyHead::*;

        match self {
            Inserted { .. } => "INSERTED",
            Buried { .. } => "BURIED",
            Using { .. } => "USING",
            Found { .. } => "FOUND",
            Reserved { .. } => "RESERVED",
            Ok { .. } => "OK",
            Kicked { .. } => "KICKED",
            Watching { .. } => "WATCHING",
            NotFound => "NOT_FOUND",
            Deleted => "DELETED",
            TimedOut => "TIMED_OUT",
            DeadlineSoon => "DEADLINE_SOON",
            NotIgnored => "NOT_IGNORED",
            OutOfMemory => "OUT_OF_MEMORY",
            InternalError => "INTERNAL_ERROR",
            BadFormat => "BAD_FORMAT",
            UnknownCommand => "UNKNOWN_COMMAND",
            ExpectedCrlf => "EXPECTED_CRLF",
            JobTooBig => "JOB_TOO_BIG",
            Draining => "DRAINING",
        }
    }

    /// True for the failure replies the server may send in place of any
    /// expected response.
    pub fn is_error(&self) -> bool {
        use ReplyHead::*;

        matches!(
            self,
            OutOfMemory
                | InternalError
                | BadFormat
                | UnknownCommand
                | ExpectedCrlf
                | JobTooBig
                | Draining
        )
    }
}

impl fmt::Display for ReplyHead {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
