//! Wire format serialization and deserialization.
//!
//! Every frame is a type tag byte followed by fixed-width big-endian fields:
//!
//! ```text
//! Discovery      (0):  (no payload)
//! Status         (1):  parent (2) || parent_rssi (i16) || hops (u16) || config_version (u32)
//! Disconnection  (2):  (no payload)
//! Data           (3):  channel (1) || origin (2) || value (i32)
//! Config         (4):  version (u32) || required (1)
//! ConfigRequest  (5):  (no payload)
//! ```
//!
//! Decoding is strict: unknown tags, truncated payloads, and trailing bytes
//! are all rejected. The dispatcher drops such frames without acting on any
//! partially-read field.

use alloc::vec::Vec;

use crate::types::{
    ChannelConfig, ChannelId, ChannelSet, NodeAddr, Reading, Status, MT_CONFIG, MT_CONFIG_REQUEST,
    MT_DATA, MT_DISCONNECTION, MT_DISCOVERY, MT_STATUS,
};

/// Decoding error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Unexpected end of buffer.
    UnexpectedEof,
    /// Unknown message type tag.
    InvalidMessageType,
    /// Channel tag outside the known set.
    InvalidChannel,
    /// Trailing bytes after a complete payload.
    InvalidLength,
}

/// Zero-copy reader over a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader over a byte slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the number of bytes remaining.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Returns true if there are no more bytes to read.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.pos >= self.buf.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    /// Read a fixed number of bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + len > self.buf.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a u16 in big-endian format.
    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read an i16 in big-endian format.
    pub fn read_i16_be(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a u32 in big-endian format.
    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read an i32 in big-endian format.
    pub fn read_i32_be(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a node address (2 bytes).
    pub fn read_addr(&mut self) -> Result<NodeAddr, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(NodeAddr([bytes[0], bytes[1]]))
    }
}

/// Writer that appends to a byte vector.
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create a new empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Consume the writer, returning the encoded bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write a u16 in big-endian format.
    pub fn write_u16_be(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Write an i16 in big-endian format.
    pub fn write_i16_be(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Write a u32 in big-endian format.
    pub fn write_u32_be(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Write an i32 in big-endian format.
    pub fn write_i32_be(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Write a node address (2 bytes).
    pub fn write_addr(&mut self, addr: NodeAddr) {
        self.buf.extend_from_slice(&addr.octets());
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded protocol frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// Broadcast (or unicast probe) asking neighbors to announce themselves.
    Discovery,
    /// Tree position announcement.
    Status(Status),
    /// The sender has lost its route to the root.
    Disconnection,
    /// A sensor reading on its way up the tree.
    Data(Reading),
    /// Channel configuration flood.
    Config(ChannelConfig),
    /// Unicast request for the sender's configuration record.
    ConfigRequest,
}

impl Message {
    /// Encode the frame to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            Message::Discovery => w.write_u8(MT_DISCOVERY),
            Message::Status(status) => {
                w.write_u8(MT_STATUS);
                w.write_addr(status.parent);
                w.write_i16_be(status.parent_rssi);
                w.write_u16_be(status.hops);
                w.write_u32_be(status.config_version);
            }
            Message::Disconnection => w.write_u8(MT_DISCONNECTION),
            Message::Data(reading) => {
                w.write_u8(MT_DATA);
                w.write_u8(reading.channel.tag());
                w.write_addr(reading.origin);
                w.write_i32_be(reading.value);
            }
            Message::Config(config) => {
                w.write_u8(MT_CONFIG);
                w.write_u32_be(config.version);
                w.write_u8(config.required.bits());
            }
            Message::ConfigRequest => w.write_u8(MT_CONFIG_REQUEST),
        }
        w.into_vec()
    }

    /// Decode a frame from bytes. The whole buffer must be consumed.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        let message = match r.read_u8()? {
            MT_DISCOVERY => Message::Discovery,
            MT_STATUS => Message::Status(Status {
                parent: r.read_addr()?,
                parent_rssi: r.read_i16_be()?,
                hops: r.read_u16_be()?,
                config_version: r.read_u32_be()?,
            }),
            MT_DISCONNECTION => Message::Disconnection,
            MT_DATA => {
                let channel =
                    ChannelId::from_tag(r.read_u8()?).ok_or(DecodeError::InvalidChannel)?;
                Message::Data(Reading {
                    channel,
                    origin: r.read_addr()?,
                    value: r.read_i32_be()?,
                })
            }
            MT_CONFIG => Message::Config(ChannelConfig {
                version: r.read_u32_be()?,
                required: ChannelSet::from_bits(r.read_u8()?),
            }),
            MT_CONFIG_REQUEST => Message::ConfigRequest,
            _ => return Err(DecodeError::InvalidMessageType),
        };
        if !r.is_empty() {
            return Err(DecodeError::InvalidLength);
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_empty_frames() {
        for (message, tag) in [
            (Message::Discovery, MT_DISCOVERY),
            (Message::Disconnection, MT_DISCONNECTION),
            (Message::ConfigRequest, MT_CONFIG_REQUEST),
        ] {
            let encoded = message.encode();
            assert_eq!(encoded, vec![tag]);
            assert_eq!(Message::decode(&encoded), Ok(message));
        }
    }

    #[test]
    fn test_status_round_trip() {
        let message = Message::Status(Status {
            parent: NodeAddr::new(2, 0),
            parent_rssi: -71,
            hops: 3,
            config_version: 9,
        });
        let encoded = message.encode();
        assert_eq!(encoded.len(), 1 + 2 + 2 + 2 + 4);
        assert_eq!(Message::decode(&encoded), Ok(message));
    }

    #[test]
    fn test_status_field_layout() {
        let encoded = Message::Status(Status {
            parent: NodeAddr::new(1, 2),
            parent_rssi: -1,
            hops: 0x0304,
            config_version: 0x05060708,
        })
        .encode();
        assert_eq!(
            encoded,
            vec![MT_STATUS, 1, 2, 0xFF, 0xFF, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn test_data_round_trip() {
        let message = Message::Data(Reading {
            channel: ChannelId::Humidity,
            origin: NodeAddr::new(5, 0),
            value: -17,
        });
        let encoded = message.encode();
        assert_eq!(encoded.len(), 1 + 1 + 2 + 4);
        assert_eq!(Message::decode(&encoded), Ok(message));
    }

    #[test]
    fn test_config_round_trip() {
        let mut required = ChannelSet::all();
        required.remove(ChannelId::Temperature);
        let message = Message::Config(ChannelConfig {
            version: 42,
            required,
        });
        let encoded = message.encode();
        assert_eq!(encoded.len(), 1 + 4 + 1);
        assert_eq!(Message::decode(&encoded), Ok(message));
    }

    #[test]
    fn test_rejects_unknown_tag() {
        assert_eq!(
            Message::decode(&[6]),
            Err(DecodeError::InvalidMessageType)
        );
        assert_eq!(
            Message::decode(&[0xFF]),
            Err(DecodeError::InvalidMessageType)
        );
    }

    #[test]
    fn test_rejects_empty_buffer() {
        assert_eq!(Message::decode(&[]), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut encoded = Message::Status(Status {
            parent: NodeAddr::new(2, 0),
            parent_rssi: -71,
            hops: 3,
            config_version: 9,
        })
        .encode();
        encoded.pop();
        assert_eq!(Message::decode(&encoded), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut encoded = Message::Discovery.encode();
        encoded.push(0);
        assert_eq!(Message::decode(&encoded), Err(DecodeError::InvalidLength));
    }

    #[test]
    fn test_rejects_unknown_channel() {
        let encoded = vec![MT_DATA, 9, 5, 0, 0, 0, 0, 17];
        assert_eq!(Message::decode(&encoded), Err(DecodeError::InvalidChannel));
    }

    #[test]
    fn test_config_masks_unknown_bits() {
        let encoded = vec![MT_CONFIG, 0, 0, 0, 7, 0xFF];
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(
            decoded,
            Message::Config(ChannelConfig {
                version: 7,
                required: ChannelSet::all(),
            })
        );
    }
}
