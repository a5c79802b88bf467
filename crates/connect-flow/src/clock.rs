//! Clock gate seam
//!
//! The flow only needs one question answered before it starts: is the
//! local clock close enough to real time for signed requests to pass the
//! provider's timestamp window? The gate is advisory: an `Err` means "no
//! answer" and the flow proceeds.

use std::future::Future;
use std::pin::Pin;

use clock_sync::{ClockOffset, Result, SntpClient};

/// One advisory clock probe per login attempt.
pub trait ClockGate: Send + Sync {
    fn check<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<ClockOffset>> + Send + 'a>>;
}

/// Standard gate: probes a public time server via SNTP.
pub struct SntpClockGate {
    client: SntpClient,
}

impl SntpClockGate {
    pub fn new(client: SntpClient) -> Self {
        Self { client }
    }
}

impl Default for SntpClockGate {
    fn default() -> Self {
        Self::new(SntpClient::default())
    }
}

impl ClockGate for SntpClockGate {
    fn check<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<ClockOffset>> + Send + 'a>> {
        Box::pin(self.client.probe())
    }
}
