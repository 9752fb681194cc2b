use std::fmt;
use std::str::FromStr;

use bytes::BufMut;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AddressField, Ax25Error, Result};

/// Callsign characters per address field.
pub const CALLSIGN_LEN: usize = 6;

/// Encoded size of one address field (callsign + SSID byte).
pub const ADDRESS_LEN: usize = 7;

/// Highest SSID value (4 bits).
pub const MAX_SSID: u8 = 15;

/// H bit on vias, C bit on destination/source.
pub(crate) const SSID_HIGH_BIT: u8 = 0x80;
const SSID_RESERVED: u8 = 0x60;
const SSID_EXTENSION: u8 = 0x01;

/// An AX.25 station address: callsign, SSID and the has-been-repeated mark.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    call: [u8; CALLSIGN_LEN],
    ssid: u8,
    repeated: bool,
}

fn valid_call_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == b' '
}

impl Address {
    /// Build an address from a callsign (1 to 6 of `A-Z0-9`) and SSID.
    pub fn new(callsign: &str, ssid: u8) -> Result<Self> {
        let bytes = callsign.as_bytes();
        if bytes.is_empty()
            || bytes.len() > CALLSIGN_LEN
            || ssid > MAX_SSID
            || !bytes.iter().all(|&c| valid_call_char(c) && c != b' ')
        {
            return Err(Ax25Error::InvalidCallsign(format!("{callsign}-{ssid}")));
        }
        let mut call = [b' '; CALLSIGN_LEN];
        call[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            call,
            ssid,
            repeated: false,
        })
    }

    /// The callsign without padding.
    pub fn callsign(&self) -> &str {
        let end = self
            .call
            .iter()
            .position(|&c| c == b' ')
            .unwrap_or(CALLSIGN_LEN);
        // Only A-Z, 0-9 and space are ever stored.
        std::str::from_utf8(&self.call[..end]).unwrap_or_default()
    }

    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Whether the H bit is set (meaningful on vias only).
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    pub fn set_repeated(&mut self, repeated: bool) {
        self.repeated = repeated;
    }

    /// A copy with the repeated mark set as given.
    pub fn with_repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }

    /// Same callsign and SSID, ignoring the repeated mark.
    pub fn same_station(&self, other: &Address) -> bool {
        self.call == other.call && self.ssid == other.ssid
    }

    /// Whether the callsign starts with `prefix`. SSID is ignored.
    ///
    /// `AP` matches `APRS` and `APDW16`; an empty prefix matches everything.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.callsign().starts_with(prefix)
    }

    /// Decode one 7-byte address field.
    ///
    /// Returns the address and the raw SSID byte so the caller can inspect
    /// the C/H and extension bits.
    pub(crate) fn decode(raw: &[u8], field: AddressField) -> Result<(Self, u8)> {
        let raw = raw
            .get(..ADDRESS_LEN)
            .ok_or(Ax25Error::Truncated { len: raw.len() })?;
        let mut call = [b' '; CALLSIGN_LEN];
        for (dst, &byte) in call.iter_mut().zip(&raw[..CALLSIGN_LEN]) {
            let c = byte >> 1;
            if byte & 1 != 0 || !valid_call_char(c) {
                return Err(Ax25Error::Address { field });
            }
            *dst = c;
        }
        let ssid_byte = raw[CALLSIGN_LEN];
        let address = Self {
            call,
            ssid: (ssid_byte >> 1) & 0x0F,
            repeated: false,
        };
        Ok((address, ssid_byte))
    }

    /// Append the 7-byte encoded field.
    pub(crate) fn encode_into<B: BufMut>(&self, dst: &mut B, high_bit: bool, last: bool) {
        for &c in &self.call {
            dst.put_u8(c << 1);
        }
        let mut ssid_byte = ((self.ssid & 0x0F) << 1) | SSID_RESERVED;
        if high_bit {
            ssid_byte |= SSID_HIGH_BIT;
        }
        if last {
            ssid_byte |= SSID_EXTENSION;
        }
        dst.put_u8(ssid_byte);
    }
}

impl Default for Address {
    /// A blank (all-space) callsign with SSID 0.
    fn default() -> Self {
        Self {
            call: [b' '; CALLSIGN_LEN],
            ssid: 0,
            repeated: false,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.callsign())?;
        if self.ssid > 0 {
            write!(f, "-{}", self.ssid)?;
        }
        if self.repeated {
            f.write_str("*")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = Ax25Error;

    /// Parse `CALL`, `CALL-SSID`, optionally followed by `*`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Ax25Error::InvalidCallsign(s.to_string());
        let trimmed = s.trim();
        let (body, repeated) = match trimmed.strip_suffix('*') {
            Some(body) => (body, true),
            None => (trimmed, false),
        };
        let (call, ssid) = match body.split_once('-') {
            Some((call, ssid)) => {
                let ssid: u8 = ssid.parse().map_err(|_| invalid())?;
                (call, ssid)
            }
            None => (body, 0),
        };
        let upper = call.to_ascii_uppercase();
        let address = Address::new(&upper, ssid).map_err(|_| invalid())?;
        Ok(address.with_repeated(repeated))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
