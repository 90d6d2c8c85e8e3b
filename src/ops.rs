//! Multi-step admin operations composed from the client primitives.
use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::client::{ClientError, Connection};
use crate::util::bytes_to_human_str;

/// The sentinel body used by the ping round-trip.
pub const PING_BODY: &[u8] = b"check_beanstalk_ping";

/// An error from one step of the ping sequence. Each step short-circuits the
/// remaining ones.
#[derive(Debug)]
pub enum PingError {
    Use(ClientError),
    Put(ClientError),
    Peek(ClientError),
    Delete(ClientError),
    /// The peeked body differs from the sentinel that was put: something
    /// else is interfering with the test tube.
    Mismatch { got: Bytes },
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Use(e) => write!(f, "use failed: {e}"),
            Self::Put(e) => write!(f, "put failed: {e}"),
            Self::Peek(e) => write!(f, "peek failed: {e}"),
            Self::Delete(e) => write!(f, "delete failed: {e}"),
            Self::Mismatch { got } => write!(
                f,
                "unknown jobs in test tube: peeked {} instead of {}",
                bytes_to_human_str(got),
                bytes_to_human_str(PING_BODY),
            ),
        }
    }
}

impl std::error::Error for PingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Use(e)
            | Self::Put(e)
            | Self::Peek(e)
            | Self::Delete(e) => Some(e),
            Self::Mismatch { .. } => None,
        }
    }
}

/// Health-checks the tube end to end: put the sentinel with priority 1, no
/// delay, and a 5s TTR; peek it back by ID; delete it; and require the
/// peeked body to match the sentinel byte for byte.
pub async fn ping<T: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut Connection<T>,
    tube: &str,
) -> Result<(), PingError> {
    conn.use_tube(tube).await.map_err(PingError::Use)?;

    let id = conn
        .put(PING_BODY, 1, 0, 5)
        .await
        .map_err(PingError::Put)?;

    let body = conn.peek(id).await.map_err(PingError::Peek)?;

    // Delete before comparing so a mismatched sentinel doesn't linger.
    conn.delete(id).await.map_err(PingError::Delete)?;

    if body != PING_BODY {
        return Err(PingError::Mismatch { got: body });
    }

    Ok(())
}

/// Drains a tube by reserving and deleting jobs until none are ready,
/// returning the number of jobs removed. Delayed and buried jobs are left in
/// place.
pub async fn clear<T: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut Connection<T>,
    tube: &str,
) -> Result<u64, ClientError> {
    conn.watch(tube).await?;
    if tube != "default" {
        conn.ignore("default").await?;
    }

    let mut cleared = 0u64;
    while let Some((id, _body)) = conn.reserve_with_timeout(0).await? {
        conn.delete(id).await?;
        cleared += 1;
    }

    debug!(tube, cleared, "tube drained");

    Ok(cleared)
}

/// Fetches the statistics of every tube on the server, in server order.
pub async fn show_old<T: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut Connection<T>,
) -> Result<Vec<(String, BTreeMap<String, serde_yaml::Value>)>, ClientError> {
    let mut report = Vec::new();

    for tube in conn.list_tubes().await? {
        let stats = conn.stats_tube(&tube).await?;
        report.push((tube, stats));
    }

    Ok(report)
}
