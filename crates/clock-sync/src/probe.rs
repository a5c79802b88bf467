//! One-shot clock-offset probe against a public time server

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::{self, SECONDS_1900_TO_1970, ServerReply};

/// Public pool server queried by default.
pub const DEFAULT_SERVER: &str = "europe.pool.ntp.org:123";

/// How long to wait for the server's datagram.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(6);

/// Largest local-clock offset the OAuth server's signature window tolerates.
pub const MAX_ACCEPTABLE_OFFSET_MILLIS: i64 = 5 * 60 * 1000;

/// Result of a successful probe.
///
/// `offset_millis` is how far the local clock is from the server's
/// (positive when the server is ahead). Computed once per login attempt and
/// never persisted.
#[derive(Debug, Clone, Copy)]
pub struct ClockOffset {
    pub offset_millis: i64,
    /// Server clock (unix millis) when the request arrived there.
    pub server_time_millis: i64,
    pub round_trip_millis: i64,
}

impl ClockOffset {
    /// Whether signed requests made with the local clock would land inside
    /// the server's acceptance window.
    pub fn is_within_acceptable_offset(&self) -> bool {
        self.offset_millis.abs() <= MAX_ACCEPTABLE_OFFSET_MILLIS
    }
}

/// SNTP client bound to one server address.
pub struct SntpClient {
    server: String,
    timeout: Duration,
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}

impl SntpClient {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Perform one request/reply exchange and compute the local clock offset.
    ///
    /// Exactly one datagram is sent per call; retry policy belongs to the
    /// caller. Any failure is advisory (see crate docs).
    pub async fn probe(&self) -> Result<ClockOffset> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::Socket(format!("binding probe socket: {e}")))?;
        socket
            .connect(&self.server)
            .await
            .map_err(|e| Error::Socket(format!("resolving {}: {e}", self.server)))?;

        // Stamp the transmit field immediately before sending
        let packet = message::client_packet(ntp_now());
        socket
            .send(&packet)
            .await
            .map_err(|e| Error::Socket(format!("sending probe: {e}")))?;

        let mut buf = [0u8; 128];
        let n = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Socket(format!("receiving reply: {e}")))?;
        // Record arrival before any parsing
        let destination = ntp_now();

        let reply = ServerReply::parse(&buf[..n])?;
        let (offset, round_trip) = compute_offset(&reply, destination);

        let measured = ClockOffset {
            offset_millis: (offset * 1000.0).round() as i64,
            server_time_millis: ((reply.receive - SECONDS_1900_TO_1970) * 1000.0) as i64,
            round_trip_millis: (round_trip * 1000.0).round() as i64,
        };
        debug!(
            server = %self.server,
            stratum = reply.stratum,
            offset_millis = measured.offset_millis,
            round_trip_millis = measured.round_trip_millis,
            "clock probe completed"
        );
        Ok(measured)
    }
}

/// RFC 2030 offset and round-trip delay from the four timestamps, in
/// seconds:
///
/// ```text
/// offset = ((receive - originate) + (transmit - destination)) / 2
/// delay  = (destination - originate) - (transmit - receive)
/// ```
fn compute_offset(reply: &ServerReply, destination: f64) -> (f64, f64) {
    let offset = ((reply.receive - reply.originate) + (reply.transmit - destination)) / 2.0;
    let round_trip = (destination - reply.originate) - (reply.transmit - reply.receive);
    (offset, round_trip)
}

/// Local clock as NTP seconds (since 1900).
fn ntp_now() -> f64 {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    unix.as_secs_f64() + SECONDS_1900_TO_1970
}
