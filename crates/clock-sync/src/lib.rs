//! SNTP clock-offset probe
//!
//! OAuth 1.0a signatures carry a timestamp the server checks against its own
//! clock, so a device clock that has drifted too far produces requests that
//! are rejected deterministically. Before starting a login flow the caller
//! probes a public time server once and compares the local clock against it.
//!
//! The probe is advisory: any failure (timeout, socket error, malformed
//! reply) means "no answer", and callers are expected to let the flow
//! proceed anyway. Server-side tolerance is the real authority; this check
//! only short-circuits the hopeless case of a clock that is minutes off.
//!
//! One UDP round trip per probe, no internal retries. Offset computation
//! follows the four-timestamp SNTP exchange from RFC 2030.

pub mod error;
pub mod message;
pub mod probe;

pub use error::{Error, Result};
pub use probe::{
    ClockOffset, DEFAULT_SERVER, MAX_ACCEPTABLE_OFFSET_MILLIS, PROBE_TIMEOUT, SntpClient,
};
