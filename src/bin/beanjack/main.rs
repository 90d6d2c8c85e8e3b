mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use beanjack::client::Connection;
use beanjack::ops;
use beanjack::util::yaml_value_to_string;
use clap::error::ErrorKind;
use clap::Parser;
use tokio::net::TcpStream;
use tracing::Level;

use crate::args::{Args, Mode};

// Sysexits-style codes, kept stable for monitoring wrappers.
const EXIT_OPERATION_FAILED: u8 = 2;
const EXIT_USAGE: u8 = 64;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            let _ = e.print();
            return ExitCode::SUCCESS;
        },
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        },
    };

    // Logging goes to stderr so stdout carries only operation results.
    let level = if args.debug { Level::TRACE } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::from(EXIT_OPERATION_FAILED)
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let addr = format!("{}:{}", args.host, args.port);

    let mut conn = Connection::dial(&addr)
        .await
        .with_context(|| format!("could not connect to {addr}"))?;

    dispatch(&mut conn, &args).await
}

async fn dispatch(
    conn: &mut Connection<TcpStream>,
    args: &Args,
) -> Result<()> {
    match args.mode() {
        Mode::List => {
            let tubes = conn
                .list_tubes()
                .await
                .context("could not list tubes")?;
            for tube in tubes {
                println!("{tube}");
            }
        },

        Mode::Stats => {
            let stats = conn.stats_tube(&args.tube).await.with_context(
                || format!("could not stat tube {}", args.tube),
            )?;
            println!("Stats for {}", args.tube);
            for (key, value) in &stats {
                println!("{}: {}", key, yaml_value_to_string(value));
            }
        },

        Mode::ShowOld => {
            let report = ops::show_old(conn)
                .await
                .context("could not stat tubes")?;
            for (tube, stats) in report {
                println!("Status for tube {tube}");
                for (key, value) in &stats {
                    println!("{}: {}", key, yaml_value_to_string(value));
                }
            }
        },

        Mode::Peek => {
            conn.use_tube(&args.tube).await.with_context(|| {
                format!("could not use tube {}", args.tube)
            })?;
            let (id, body) = conn.peek_ready().await.with_context(|| {
                format!("could not peek next in tube {}", args.tube)
            })?;
            println!("ID: {id}");
            println!("Body: {}", String::from_utf8_lossy(&body));
        },

        Mode::Put => {
            conn.use_tube(&args.tube).await.with_context(|| {
                format!("could not use tube {}", args.tube)
            })?;
            let delay = whole_seconds(args.delay, "delay")?;
            let ttr = whole_seconds(args.ttr, "ttr")?;
            let id = conn
                .put(args.text.as_bytes(), args.pri, delay, ttr)
                .await
                .with_context(|| {
                    format!("could not put to tube {}", args.tube)
                })?;
            println!("{id}");
        },

        Mode::Kick => {
            conn.use_tube(&args.tube).await.with_context(|| {
                format!("could not use tube {}", args.tube)
            })?;
            let kicked = conn
                .kick(args.jobs)
                .await
                .context("error kicking jobs")?;
            println!("Kicked {} jobs from tube {}", kicked, args.tube);
        },

        Mode::Bury => {
            conn.use_tube(&args.tube).await.with_context(|| {
                format!("could not use tube {}", args.tube)
            })?;
            conn.bury(args.id, args.pri).await.with_context(|| {
                format!(
                    "could not bury job {} in tube {}",
                    args.id, args.tube
                )
            })?;
        },

        Mode::Clear => {
            let cleared = ops::clear(conn, &args.tube)
                .await
                .with_context(|| {
                    format!("could not clear tube {}", args.tube)
                })?;
            println!("Cleared {} jobs from tube {}", cleared, args.tube);
        },

        Mode::Ping => {
            ops::ping(conn, &args.tube).await?;
            eprintln!("PUT->Peek OK");
        },
    }

    Ok(())
}

/// The wire protocol carries durations as whole seconds in a u32.
fn whole_seconds(d: std::time::Duration, what: &str) -> Result<u32> {
    u32::try_from(d.as_secs())
        .with_context(|| format!("{what} out of range: {}s", d.as_secs()))
}
