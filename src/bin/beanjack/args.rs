use std::time::Duration;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
#[command(group = ArgGroup::new("mode").required(true).multiple(false))]
pub(crate) struct Args {
    /// Beanstalk server to use.
    #[arg(long, default_value = "localhost")]
    pub(crate) host: String,
    /// Beanstalk (TCP) port number.
    #[arg(long, default_value_t = 11300)]
    pub(crate) port: u16,
    /// Tube to use.
    #[arg(short, long, default_value = "default")]
    pub(crate) tube: String,
    /// Job ID (used with bury).
    #[arg(long, default_value_t = 0)]
    pub(crate) id: u64,
    /// Priority level (lower is more urgent).
    #[arg(long, alias = "priority", default_value_t = 0)]
    pub(crate) pri: u32,
    /// Delay before a put job becomes ready.
    #[arg(long, default_value = "0s", value_parser = parse_duration)]
    pub(crate) delay: Duration,
    /// Time to reserve.
    #[arg(long, default_value = "120s", value_parser = parse_duration)]
    pub(crate) ttr: Duration,
    /// Tube age threshold (used with showold).
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    pub(crate) age: Duration,
    /// Number of jobs (used with kick).
    #[arg(long, default_value_t = 1)]
    pub(crate) jobs: u64,
    /// Message to put in tube.
    #[arg(long, default_value = "")]
    pub(crate) text: String,
    /// Enables human-friendly debug logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,

    /// List tubes.
    #[arg(long, group = "mode")]
    pub(crate) list: bool,
    /// Clear tube (reserve and delete jobs until none are ready).
    #[arg(long, group = "mode")]
    pub(crate) clear: bool,
    /// Peek next ready item in tube.
    #[arg(long, group = "mode")]
    pub(crate) peek: bool,
    /// Put text in tube.
    #[arg(long, group = "mode")]
    pub(crate) put: bool,
    /// Ping tube (put and get the same item).
    #[arg(long, group = "mode")]
    pub(crate) ping: bool,
    /// Kick buried jobs.
    #[arg(long, group = "mode")]
    pub(crate) kick: bool,
    /// Bury job.
    #[arg(long, group = "mode")]
    pub(crate) bury: bool,
    /// Show tube stats.
    #[arg(long, group = "mode")]
    pub(crate) stats: bool,
    /// Show every tube's stats.
    #[arg(long, alias = "listold", group = "mode")]
    pub(crate) showold: bool,
}

/// The single selected run mode. The arg group guarantees exactly one of
/// the mode flags was set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    List,
    Clear,
    Peek,
    Put,
    Ping,
    Kick,
    Bury,
    Stats,
    ShowOld,
}

impl Args {
    pub(crate) fn mode(&self) -> Mode {
        if self.list {
            Mode::List
        } else if self.clear {
            Mode::Clear
        } else if self.peek {
            Mode::Peek
        } else if self.put {
            Mode::Put
        } else if self.kick {
            Mode::Kick
        } else if self.bury {
            Mode::Bury
        } else if self.stats {
            Mode::Stats
        } else if self.showold {
            Mode::ShowOld
        } else {
            debug_assert!(self.ping);
            Mode::Ping
        }
    }
}

/// Parses a duration given as whole seconds (`30`, `30s`) or with a coarser
/// unit suffix (`5m`, `2h`, `1d`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (num, unit_secs) = match s.as_bytes().last() {
        Some(b's') => (&s[..s.len() - 1], 1),
        Some(b'm') => (&s[..s.len() - 1], 60),
        Some(b'h') => (&s[..s.len() - 1], 60 * 60),
        Some(b'd') => (&s[..s.len() - 1], 24 * 60 * 60),
        _ => (s, 1),
    };

    let n: u64 = num
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;

    Ok(Duration::from_secs(n * unit_secs))
}
