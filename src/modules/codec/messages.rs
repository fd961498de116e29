//! Broker protobuf message catalog.
//!
//! Hand-written `prost::Message` structs, not `build.rs`-generated — the
//! catalog is small and fixed, so there's no schema-evolution reason to pay
//! for codegen.

use bytes::{Buf, BufMut, BytesMut};
use prost::Message;
use std::io::Cursor;

/// Envelope wrapping every frame on the broker link.
#[derive(Clone, PartialEq, Message)]
pub struct ProtoMessage {
    #[prost(int32, tag = "1")]
    pub payload_type: i32,
    #[prost(bytes, optional, tag = "2")]
    pub payload: Option<Vec<u8>>,
}

impl ProtoMessage {
    pub fn new(payload_type: i32, payload: impl Message) -> Self {
        let mut buf = BytesMut::new();
        payload.encode(&mut buf).expect("encode payload");
        ProtoMessage {
            payload_type,
            payload: Some(buf.to_vec()),
        }
    }

    pub fn empty(payload_type: i32) -> Self {
        ProtoMessage {
            payload_type,
            payload: None,
        }
    }

    /// Encode with the 4-byte big-endian length prefix the wire format requires.
    pub fn encode_with_length(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).expect("encode message");

        let mut result = BytesMut::with_capacity(4 + buf.len());
        result.put_u32(buf.len() as u32);
        result.put(buf);
        result.to_vec()
    }

    /// Decode a single already-delimited frame body (length prefix stripped).
    pub fn decode_frame(body: &[u8]) -> Result<Self, prost::DecodeError> {
        ProtoMessage::decode(body)
    }
}

/// Peek the 4-byte big-endian length prefix of a frame without consuming it.
pub fn peek_frame_length(buf: &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    let mut cursor = Cursor::new(buf);
    Some(cursor.get_u32())
}

#[derive(Clone, PartialEq, Message)]
pub struct VersionReq {}

#[derive(Clone, PartialEq, Message)]
pub struct VersionRes {}

#[derive(Clone, PartialEq, Message)]
pub struct ApplicationAuthReq {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(string, tag = "2")]
    pub client_secret: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ApplicationAuthRes {}

#[derive(Clone, PartialEq, Message)]
pub struct AccountAuthReq {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(string, tag = "2")]
    pub access_token: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountAuthRes {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReconcileReq {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReconcileTrader {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, tag = "2")]
    pub balance: i64,
    #[prost(int32, tag = "3")]
    pub leverage_in_cents: i32,
    #[prost(bool, tag = "4")]
    pub is_live: bool,
    #[prost(string, optional, tag = "5")]
    pub currency: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub broker_name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReconcilePosition {
    #[prost(int64, tag = "1")]
    pub position_id: i64,
    #[prost(int64, tag = "2")]
    pub symbol_id: i64,
    #[prost(enumeration = "i32", tag = "3")]
    pub trade_side: i32,
    #[prost(int64, tag = "4")]
    pub volume: i64,
    #[prost(int64, tag = "5")]
    pub entry_price: i64,
    #[prost(int64, optional, tag = "6")]
    pub current_price: Option<i64>,
    #[prost(int64, optional, tag = "7")]
    pub unrealized_profit: Option<i64>,
    #[prost(int64, optional, tag = "8")]
    pub swap: Option<i64>,
    #[prost(int64, optional, tag = "9")]
    pub commission: Option<i64>,
    #[prost(int64, optional, tag = "10")]
    pub stop_loss: Option<i64>,
    #[prost(int64, optional, tag = "11")]
    pub take_profit: Option<i64>,
    #[prost(int64, tag = "12")]
    pub open_timestamp: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReconcileRes {
    #[prost(message, optional, tag = "1")]
    pub trader: Option<ReconcileTrader>,
    #[prost(message, repeated, tag = "2")]
    pub position: Vec<ReconcilePosition>,
}

#[derive(Clone, PartialEq, Message)]
pub struct NewOrderReq {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, tag = "2")]
    pub symbol_id: i64,
    #[prost(int32, tag = "3")]
    pub order_type: i32,
    #[prost(int32, tag = "4")]
    pub trade_side: i32,
    #[prost(int64, tag = "5")]
    pub volume: i64,
    #[prost(double, optional, tag = "6")]
    pub stop_loss: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub take_profit: Option<f64>,
    #[prost(string, optional, tag = "8")]
    pub comment: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClosePositionReq {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, tag = "2")]
    pub position_id: i64,
    #[prost(int64, tag = "3")]
    pub volume: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SubscribeSpotsReq {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, repeated, tag = "2")]
    pub symbol_id: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct UnsubscribeSpotsReq {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, repeated, tag = "2")]
    pub symbol_id: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExecutionEvent {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, tag = "2")]
    pub order_id: i64,
    #[prost(int64, tag = "3")]
    pub position_id: i64,
    #[prost(string, tag = "4")]
    pub execution_type: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SpotEvent {
    #[prost(int64, tag = "1")]
    pub ctid_trader_account_id: i64,
    #[prost(int64, tag = "2")]
    pub symbol_id: i64,
    #[prost(uint64, optional, tag = "3")]
    pub bid: Option<u64>,
    #[prost(uint64, optional, tag = "4")]
    pub ask: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct HeartbeatEvent {}

#[derive(Clone, PartialEq, Message)]
pub struct ErrorRes {
    #[prost(string, tag = "1")]
    pub error_code: String,
    #[prost(string, optional, tag = "2")]
    pub description: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountErrorRes {
    #[prost(string, tag = "1")]
    pub error_code: String,
    #[prost(string, tag = "2")]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::codec::payload_type::VendorPayloadType;

    #[test]
    fn framing_round_trip() {
        let req = ApplicationAuthReq {
            client_id: "abc".into(),
            client_secret: "def".into(),
        };
        let msg = ProtoMessage::new(VendorPayloadType::ApplicationAuthReq as i32, req.clone());
        let framed = msg.encode_with_length();

        let len = peek_frame_length(&framed).unwrap() as usize;
        assert_eq!(len, framed.len() - 4);

        let decoded = ProtoMessage::decode_frame(&framed[4..]).unwrap();
        assert_eq!(decoded.payload_type, VendorPayloadType::ApplicationAuthReq as i32);

        let decoded_payload = ApplicationAuthReq::decode(decoded.payload.unwrap().as_ref()).unwrap();
        assert_eq!(decoded_payload, req);
    }
}
