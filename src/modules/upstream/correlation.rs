//! Pending-request correlation table.
//!
//! Requests that expect a typed response are tracked here, keyed by the
//! expected response `payload_type`. A matching inbound frame resolves the
//! oldest pending entry for that type; a reaper task fails timed-out entries.

use crate::error::UpstreamError;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::modules::codec::ProtoMessage;

struct PendingRequest {
    op: String,
    deadline: Instant,
    responder: oneshot::Sender<ProtoMessage>,
}

#[derive(Default)]
pub struct CorrelationTable {
    pending: HashMap<i32, VecDeque<PendingRequest>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a response of `expected_payload_type`, returning
    /// a receiver that resolves when a matching frame arrives or the deadline
    /// is reaped.
    pub fn register(
        &mut self,
        op: &str,
        expected_payload_type: i32,
        timeout: Duration,
    ) -> oneshot::Receiver<ProtoMessage> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .entry(expected_payload_type)
            .or_default()
            .push_back(PendingRequest {
                op: op.to_string(),
                deadline: Instant::now() + timeout,
                responder: tx,
            });
        rx
    }

    /// Resolve the oldest pending entry for this payload type, if any.
    /// Returns true if a waiter was resolved.
    pub fn resolve(&mut self, message: &ProtoMessage) -> bool {
        if let Some(queue) = self.pending.get_mut(&message.payload_type) {
            if let Some(entry) = queue.pop_front() {
                let _ = entry.responder.send(message.clone());
                if queue.is_empty() {
                    self.pending.remove(&message.payload_type);
                }
                return true;
            }
        }
        false
    }

    /// Drop and report every entry whose deadline has passed.
    pub fn reap_expired(&mut self) -> Vec<UpstreamError> {
        let now = Instant::now();
        let mut errors = Vec::new();

        self.pending.retain(|payload_type, queue| {
            queue.retain(|entry| {
                if entry.deadline <= now {
                    errors.push(UpstreamError::RequestTimeout {
                        op: entry.op.clone(),
                        payload_type: *payload_type,
                    });
                    false
                } else {
                    true
                }
            });
            !queue.is_empty()
        });

        errors
    }

    /// Fail every pending entry immediately, e.g. on disconnect.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_matches_oldest_entry_first() {
        let mut table = CorrelationTable::new();
        let rx1 = table.register("req1", 2103, Duration::from_secs(30));
        let rx2 = table.register("req2", 2103, Duration::from_secs(30));

        let msg = ProtoMessage::empty(2103);
        assert!(table.resolve(&msg));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn reap_expired_reports_timeout() {
        let mut table = CorrelationTable::new();
        let _rx = table.register("req", 2103, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        let errs = table.reap_expired();
        assert_eq!(errs.len(), 1);
    }
}
