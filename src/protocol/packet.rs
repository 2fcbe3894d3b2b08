//! Frame packet header codec

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::protocol::constants::{FORMAT_YUYV, FRAME_HEADER_SIZE, FRAME_MAGIC};

/// Fixed header preceding every frame payload
///
/// Six unsigned 32-bit fields in native byte order. The magic is validated
/// before anything else is trusted; a receiver rejects a packet on a magic
/// mismatch without reading its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Magic constant, always [`FRAME_MAGIC`]
    pub magic: u32,
    /// Number of payload bytes following the header
    pub payload_len: u32,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Payload format tag (0 = packed YUYV)
    pub format: u32,
    /// Capture time in unix seconds
    pub timestamp: u32,
}

impl FrameHeader {
    /// Create a YUYV header stamped with the current unix time
    pub fn new(payload_len: u32, width: u32, height: u32) -> Self {
        Self::with_timestamp(payload_len, width, height, unix_seconds())
    }

    /// Create a YUYV header with an explicit timestamp
    pub fn with_timestamp(payload_len: u32, width: u32, height: u32, timestamp: u32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            payload_len,
            width,
            height,
            format: FORMAT_YUYV,
            timestamp,
        }
    }

    /// Encode into the fixed 24-byte wire form
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        {
            let mut cursor = &mut buf[..];
            cursor.put_u32_ne(self.magic);
            cursor.put_u32_ne(self.payload_len);
            cursor.put_u32_ne(self.width);
            cursor.put_u32_ne(self.height);
            cursor.put_u32_ne(self.format);
            cursor.put_u32_ne(self.timestamp);
        }
        buf
    }

    /// Decode from the wire form
    ///
    /// The magic is checked first; on a mismatch no other field is
    /// interpreted.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::Truncated { len: bytes.len() });
        }

        let mut cursor = bytes;
        let magic = cursor.get_u32_ne();
        if magic != FRAME_MAGIC {
            return Err(ProtocolError::InvalidMagic { found: magic });
        }

        Ok(Self {
            magic,
            payload_len: cursor.get_u32_ne(),
            width: cursor.get_u32_ne(),
            height: cursor.get_u32_ne(),
            format: cursor.get_u32_ne(),
            timestamp: cursor.get_u32_ne(),
        })
    }
}

/// A complete frame packet: header plus owned payload
///
/// Built fresh per broadcast event; `Bytes` makes handing the same payload
/// to every subscriber reference-counted rather than copied.
#[derive(Debug, Clone)]
pub struct FramePacket {
    /// Packet header
    pub header: FrameHeader,
    /// Raw frame bytes, exactly `header.payload_len` long
    pub payload: Bytes,
}

impl FramePacket {
    /// Build a packet around a captured frame
    pub fn new(payload: Bytes, width: u32, height: u32) -> Self {
        Self {
            header: FrameHeader::new(payload.len() as u32, width, height),
            payload,
        }
    }

    /// Encode header and payload into one contiguous buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Current wall-clock time as unix seconds
pub(crate) fn unix_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = FrameHeader::with_timestamp(614_400, 640, 480, 1_700_000_000);
        let wire = header.encode();
        let decoded = FrameHeader::decode(&wire).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(decoded.magic, FRAME_MAGIC);
        assert_eq!(decoded.payload_len, 614_400);
        assert_eq!(decoded.width, 640);
        assert_eq!(decoded.height, 480);
        assert_eq!(decoded.format, FORMAT_YUYV);
        assert_eq!(decoded.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut wire = FrameHeader::with_timestamp(100, 8, 8, 0).encode();
        wire[0] ^= 0xFF;

        let err = FrameHeader::decode(&wire).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMagic { .. }));
    }

    #[test]
    fn test_decode_rejects_short_input() {
        let wire = FrameHeader::new(0, 0, 0).encode();

        let err = FrameHeader::decode(&wire[..FRAME_HEADER_SIZE - 1]).unwrap_err();
        assert_eq!(err, ProtocolError::Truncated {
            len: FRAME_HEADER_SIZE - 1,
        });
    }

    #[test]
    fn test_packet_encode_layout() {
        let payload = Bytes::from_static(&[0xAA, 0xBB, 0xCC, 0xDD]);
        let packet = FramePacket::new(payload.clone(), 2, 1);
        let wire = packet.encode();

        assert_eq!(wire.len(), FRAME_HEADER_SIZE + payload.len());
        assert_eq!(&wire[FRAME_HEADER_SIZE..], &payload[..]);

        let header = FrameHeader::decode(&wire).unwrap();
        assert_eq!(header.payload_len, payload.len() as u32);
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = unix_seconds();
        let header = FrameHeader::new(0, 640, 480);
        let after = unix_seconds();

        assert!(header.timestamp >= before && header.timestamp <= after);
    }
}
