use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::address::{Address, ADDRESS_LEN, SSID_HIGH_BIT};
use crate::error::{AddressField, Ax25Error, Result};

/// Maximum number of via (digipeater) addresses in a path.
pub const MAX_VIAS: usize = 8;

/// Unnumbered-information control byte (P/F clear).
pub const CTRL_UI: u8 = 0x03;

/// "No layer 3" protocol identifier, used by APRS.
pub const PID_NO_LAYER3: u8 = 0xF0;

/// Whether a control byte is followed by a PID byte (I and UI frames).
pub fn carries_pid(control: u8) -> bool {
    control & 0x01 == 0 || control & 0xEF == CTRL_UI
}

/// Command/response indication from the destination and source C bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandResponse {
    /// Both C bits equal (pre-2.0 frame).
    #[default]
    Legacy,
    Command,
    Response,
}

/// Address block plus control and PID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub destination: Address,
    pub source: Address,
    /// Digipeater path, at most [`MAX_VIAS`] entries.
    pub via: Vec<Address>,
    pub control: u8,
    /// Only meaningful when [`carries_pid`] holds for `control`.
    pub pid: u8,
    pub command: CommandResponse,
}

impl Header {
    /// A UI header with PID 0xF0 and no command/response indication.
    pub fn ui(destination: Address, source: Address, via: Vec<Address>) -> Result<Self> {
        if via.len() > MAX_VIAS {
            return Err(Ax25Error::ViaOverflow { max: MAX_VIAS });
        }
        Ok(Self {
            destination,
            source,
            via,
            control: CTRL_UI,
            pid: PID_NO_LAYER3,
            command: CommandResponse::Legacy,
        })
    }

    /// Number of vias.
    pub fn hops(&self) -> usize {
        self.via.len()
    }

    /// Encoded header size.
    pub fn encoded_len(&self) -> usize {
        let pid = usize::from(carries_pid(self.control));
        ADDRESS_LEN * (2 + self.via.len()) + 1 + pid
    }

    /// Decode the header at the start of `raw`.
    ///
    /// Returns the header and the offset of the information field.
    pub fn decode(raw: &[u8]) -> Result<(Self, usize)> {
        let (destination, dest_ssid) = Address::decode(raw, AddressField::Destination)?;
        if dest_ssid & 0x01 != 0 {
            return Err(Ax25Error::Address {
                field: AddressField::Destination,
            });
        }
        let whole = |err: Ax25Error| match err {
            Ax25Error::Truncated { .. } => Ax25Error::Truncated { len: raw.len() },
            other => other,
        };
        let (source, src_ssid) =
            Address::decode(&raw[ADDRESS_LEN..], AddressField::Source).map_err(whole)?;

        let command = match (dest_ssid & SSID_HIGH_BIT != 0, src_ssid & SSID_HIGH_BIT != 0) {
            (true, false) => CommandResponse::Command,
            (false, true) => CommandResponse::Response,
            _ => CommandResponse::Legacy,
        };

        let mut offset = 2 * ADDRESS_LEN;
        let mut last = src_ssid & 0x01 != 0;
        let mut via = Vec::new();
        while !last {
            if via.len() == MAX_VIAS {
                return Err(Ax25Error::ViaOverflow { max: MAX_VIAS });
            }
            let rest = raw.get(offset..).unwrap_or_default();
            let (address, ssid_byte) =
                Address::decode(rest, AddressField::Via(via.len())).map_err(whole)?;
            last = ssid_byte & 0x01 != 0;
            via.push(address.with_repeated(ssid_byte & SSID_HIGH_BIT != 0));
            offset += ADDRESS_LEN;
        }

        let control = *raw
            .get(offset)
            .ok_or(Ax25Error::Truncated { len: raw.len() })?;
        offset += 1;
        let mut pid = 0;
        if carries_pid(control) {
            pid = *raw
                .get(offset)
                .ok_or(Ax25Error::Truncated { len: raw.len() })?;
            offset += 1;
        }

        let header = Self {
            destination,
            source,
            via,
            control,
            pid,
            command,
        };
        Ok((header, offset))
    }

    /// Append the encoded header: addresses, control and (if any) PID.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        self.destination.encode_into(
            dst,
            self.command == CommandResponse::Command,
            false,
        );
        self.source.encode_into(
            dst,
            self.command == CommandResponse::Response,
            self.via.is_empty(),
        );
        let last = self.via.len().saturating_sub(1);
        for (i, via) in self.via.iter().enumerate() {
            via.encode_into(dst, via.is_repeated(), i == last);
        }
        dst.put_u8(self.control);
        if carries_pid(self.control) {
            dst.put_u8(self.pid);
        }
    }
}

/// A complete AX.25 frame as carried in a KISS data payload (no flags, no FCS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    pub header: Header,
    pub info: Bytes,
}

impl Ax25Frame {
    /// Decode a raw frame. Everything after control/PID is information.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let (header, offset) = Header::decode(raw)?;
        let info = Bytes::copy_from_slice(&raw[offset..]);
        Ok(Self { header, info })
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> BytesMut {
        let mut dst = BytesMut::with_capacity(self.header.encoded_len() + self.info.len());
        self.encode_into(&mut dst);
        dst
    }

    pub fn encode_into(&self, dst: &mut BytesMut) {
        self.header.encode_into(dst);
        dst.put_slice(&self.info);
    }
}

/// TNC2 monitor format: `SRC>DST,VIA1*,VIA2:info`.
pub struct Tnc2<'a> {
    pub header: &'a Header,
    pub info: &'a [u8],
}

impl fmt::Display for Tnc2<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.header.source, self.header.destination)?;
        for via in &self.header.via {
            write!(f, ",{via}")?;
        }
        f.write_str(":")?;
        for chunk in self.info.utf8_chunks() {
            f.write_str(chunk.valid())?;
            for byte in chunk.invalid() {
                write!(f, "<0x{byte:02x}>")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Ax25Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = Tnc2 {
            header: &self.header,
            info: &self.info,
        };
        fmt::Display::fmt(&line, f)
    }
}
