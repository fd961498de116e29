//! Wire codec for the broker link.
//!
//! Each frame is a 4-byte big-endian length prefix followed by a protobuf
//! `ProtoMessage { payload_type, payload }` envelope; `payload` is itself a
//! protobuf message whose schema is selected by `payload_type`.

pub mod frame;
pub mod messages;
pub mod payload_type;

pub use frame::FrameReassembler;
pub use messages::ProtoMessage;
pub use payload_type::{BasePayloadType, PayloadKind, VendorPayloadType};
