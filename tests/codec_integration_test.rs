//! End-to-end check that a stream of mixed vendor/base frames, delivered in
//! arbitrarily sized chunks, reassembles and classifies correctly.

use ctrader_gateway::modules::codec::messages::{ApplicationAuthReq, HeartbeatEvent};
use ctrader_gateway::modules::codec::payload_type::classify;
use ctrader_gateway::modules::codec::{BasePayloadType, FrameReassembler, PayloadKind, ProtoMessage, VendorPayloadType};

#[test]
fn mixed_frame_stream_reassembles_across_arbitrary_chunk_boundaries() {
    let auth = ProtoMessage::new(
        VendorPayloadType::ApplicationAuthReq as i32,
        ApplicationAuthReq {
            client_id: "id".into(),
            client_secret: "secret".into(),
        },
    );
    let heartbeat = ProtoMessage::new(BasePayloadType::HeartbeatEvent as i32, HeartbeatEvent {});

    let mut wire = auth.encode_with_length();
    wire.extend_from_slice(&heartbeat.encode_with_length());

    let mut reassembler = FrameReassembler::new(1024 * 1024);
    let mut decoded = Vec::new();

    // Feed the stream in small, uneven chunks to exercise the partial-frame path.
    for chunk in wire.chunks(7) {
        decoded.extend(reassembler.push(chunk).unwrap());
    }

    assert_eq!(decoded.len(), 2);
    assert_eq!(
        classify(decoded[0].payload_type),
        PayloadKind::Vendor(VendorPayloadType::ApplicationAuthReq)
    );
    assert_eq!(
        classify(decoded[1].payload_type),
        PayloadKind::Base(BasePayloadType::HeartbeatEvent)
    );
}

#[test]
fn oversized_declared_frame_length_is_rejected() {
    let mut reassembler = FrameReassembler::new(16);
    let mut oversized = vec![0u8, 0, 1, 0]; // declares a 256-byte frame
    oversized.extend_from_slice(&[0u8; 8]);
    assert!(reassembler.push(&oversized).is_err());
}
