//! Length-prefixed frame reassembly over a growing byte buffer.
//!
//! Holds at most one partial frame at rest. Frames are sliced out with
//! `BytesMut::split_to`, which advances the read cursor without shifting the
//! trailing bytes — no copy-shift mid-frame.

use super::messages::ProtoMessage;
use crate::error::CodecError;
use bytes::{Buf, BytesMut};

pub struct FrameReassembler {
    buf: BytesMut,
    max_frame_bytes: usize,
}

impl FrameReassembler {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_bytes,
        }
    }

    /// Append newly read bytes and drain as many complete frames as are
    /// available, decoding each into a `ProtoMessage`.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<ProtoMessage>, CodecError> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();

        loop {
            if self.buf.len() < 4 {
                break;
            }
            let frame_len = (&self.buf[..4]).get_u32() as usize;
            if frame_len > self.max_frame_bytes {
                return Err(CodecError::Frame(format!(
                    "frame of {} bytes exceeds max {}",
                    frame_len, self.max_frame_bytes
                )));
            }
            if self.buf.len() < 4 + frame_len {
                break;
            }

            let mut frame = self.buf.split_to(4 + frame_len);
            frame.advance(4);
            let message = ProtoMessage::decode_frame(&frame)
                .map_err(|e| CodecError::Decode(e.to_string()))?;
            out.push(message);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::codec::payload_type::VendorPayloadType;

    #[test]
    fn reassembles_frames_split_at_arbitrary_boundaries() {
        let mut reassembler = FrameReassembler::new(1024 * 1024);

        let msg1 = ProtoMessage::new(VendorPayloadType::VersionReq as i32, super::super::messages::VersionReq {});
        let msg2 = ProtoMessage::empty(51);

        let framed1 = msg1.encode_with_length();
        let framed2 = msg2.encode_with_length();
        let mut all = framed1.clone();
        all.extend_from_slice(&framed2);

        // Split the concatenated stream at an arbitrary byte boundary mid-frame.
        let split_at = framed1.len() + 2;
        let (first, second) = all.split_at(split_at);

        let mut decoded = reassembler.push(first).unwrap();
        assert_eq!(decoded.len(), 1);
        decoded.extend(reassembler.push(second).unwrap());

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].payload_type, VendorPayloadType::VersionReq as i32);
        assert_eq!(decoded[1].payload_type, 51);
    }

    #[test]
    fn oversized_frame_is_fatal() {
        let mut reassembler = FrameReassembler::new(8);
        let msg = ProtoMessage::new(1, super::super::messages::VersionReq {});
        let framed = msg.encode_with_length();
        // VersionReq encodes to a few bytes but the declared length in a
        // larger unrelated message would exceed the 8-byte cap; simulate
        // directly by writing an oversized length prefix.
        let mut oversized = vec![0u8, 0, 0, 100];
        oversized.extend_from_slice(&framed[4..]);
        assert!(reassembler.push(&oversized).is_err());
    }
}
