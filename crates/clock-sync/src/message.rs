//! SNTP wire format (RFC 2030)
//!
//! A message is 48 bytes: a flags byte (leap indicator, version, mode),
//! stratum/poll/precision, root delay/dispersion, a reference identifier,
//! and four 64-bit timestamps. Timestamps count seconds since 1900-01-01 as
//! a 32-bit integer part plus a 32-bit binary fraction.

use crate::error::{Error, Result};

/// Wire size of an SNTP message.
pub const PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900) and the unix epoch (1970).
pub const SECONDS_1900_TO_1970: f64 = 2_208_988_800.0;

/// Scale of the 32-bit timestamp fraction field.
const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// Byte offsets of the timestamp fields.
const ORIGINATE_OFFSET: usize = 24;
const RECEIVE_OFFSET: usize = 32;
const TRANSMIT_OFFSET: usize = 40;

const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const VERSION: u8 = 3;

/// Build a mode-3 client request carrying `transmit` (NTP seconds) in the
/// transmit timestamp field. Callers should construct this immediately
/// before sending so the timestamp stays honest.
pub fn client_packet(transmit: f64) -> [u8; PACKET_LEN] {
    let mut buf = [0u8; PACKET_LEN];
    buf[0] = (VERSION << 3) | MODE_CLIENT;
    encode_timestamp(&mut buf, TRANSMIT_OFFSET, transmit);
    buf
}

/// The server fields the offset computation needs.
#[derive(Debug, Clone, Copy)]
pub struct ServerReply {
    pub stratum: u8,
    /// Client transmit time, echoed by the server (NTP seconds).
    pub originate: f64,
    /// Server clock when the request arrived.
    pub receive: f64,
    /// Server clock when the reply left.
    pub transmit: f64,
}

impl ServerReply {
    /// Parse and validate a reply datagram.
    ///
    /// Accepts anything at least `PACKET_LEN` bytes in server mode with a
    /// non-zero transmit timestamp; everything else is a malformed reply.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < PACKET_LEN {
            return Err(Error::MalformedReply(format!(
                "short datagram: {} bytes",
                buf.len()
            )));
        }
        let mode = buf[0] & 0x07;
        if mode != MODE_SERVER {
            return Err(Error::MalformedReply(format!("unexpected mode {mode}")));
        }
        let transmit = decode_timestamp(buf, TRANSMIT_OFFSET);
        if transmit == 0.0 {
            return Err(Error::MalformedReply("zero transmit timestamp".into()));
        }
        Ok(Self {
            stratum: buf[1],
            originate: decode_timestamp(buf, ORIGINATE_OFFSET),
            receive: decode_timestamp(buf, RECEIVE_OFFSET),
            transmit,
        })
    }
}

/// Write an NTP timestamp (seconds since 1900) at `offset`.
pub fn encode_timestamp(buf: &mut [u8], offset: usize, seconds: f64) {
    let secs = seconds.trunc() as u64 as u32;
    let frac = (seconds.fract() * FRACTION_SCALE) as u64 as u32;
    buf[offset..offset + 4].copy_from_slice(&secs.to_be_bytes());
    buf[offset + 4..offset + 8].copy_from_slice(&frac.to_be_bytes());
}

/// Read an NTP timestamp (seconds since 1900) at `offset`.
pub fn decode_timestamp(buf: &[u8], offset: usize) -> f64 {
    let secs = u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]);
    let frac = u32::from_be_bytes([
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ]);
    f64::from(secs) + f64::from(frac) / FRACTION_SCALE
}
