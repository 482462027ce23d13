// ABOUTME: Outstanding Submit requests keyed by SequenceID awaiting Submit_Resp
// ABOUTME: Periodic sweep decides which requests to resend and which have timed out

use crate::datatypes::{CommandId, Submit};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A Submit that has been written but not yet answered.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub sequence_id: u32,
    pub command: CommandId,
    pub submit: Submit,
    pub sent_at: Instant,
    /// Number of times the request has been written, starting at 1.
    pub attempts: u32,
}

/// Outcome of one sweep over the pending table.
#[derive(Debug, Default)]
pub struct Sweep {
    /// Requests to write again; already removed from the table.
    pub resend: Vec<PendingRequest>,
    /// Requests that exhausted their attempts; removed for good.
    pub expired: Vec<PendingRequest>,
}

/// Pending Submits of one session, owned by the session's event loop.
///
/// Only the loop touches the table, so a response removing an entry and a
/// sweep resending it can never interleave.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: BTreeMap<u32, PendingRequest>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a Submit written for the first time.
    pub fn register(&mut self, sequence_id: u32, submit: Submit, now: Instant) {
        self.entries.insert(
            sequence_id,
            PendingRequest {
                sequence_id,
                command: CommandId::Submit,
                submit,
                sent_at: now,
                attempts: 1,
            },
        );
    }

    /// Track a resent request under the `SequenceID` it was written with.
    pub fn register_retry(&mut self, sequence_id: u32, mut request: PendingRequest, now: Instant) {
        request.sequence_id = sequence_id;
        request.sent_at = now;
        request.attempts += 1;
        self.entries.insert(sequence_id, request);
    }

    /// Remove and return the request answered by a response.
    pub fn resolve(&mut self, sequence_id: u32) -> Option<PendingRequest> {
        self.entries.remove(&sequence_id)
    }

    /// Collect requests older than `retry_interval`: those with at most
    /// `max_retries` attempts are handed back for resending, the rest expire.
    pub fn sweep(&mut self, now: Instant, retry_interval: Duration, max_retries: u32) -> Sweep {
        let due: Vec<u32> = self
            .entries
            .values()
            .filter(|request| now.saturating_duration_since(request.sent_at) >= retry_interval)
            .map(|request| request.sequence_id)
            .collect();

        let mut sweep = Sweep::default();
        for sequence_id in due {
            let Some(request) = self.entries.remove(&sequence_id) else {
                continue;
            };
            if request.attempts > max_retries {
                sweep.expired.push(request);
            } else {
                sweep.resend.push(request);
            }
        }

        if !sweep.resend.is_empty() || !sweep.expired.is_empty() {
            debug!(
                resend = sweep.resend.len(),
                expired = sweep.expired.len(),
                remaining = self.entries.len(),
                "swept pending submits"
            );
        }
        sweep
    }

    /// Remove every request, oldest `SequenceID` first.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn get(&self, sequence_id: u32) -> Option<&PendingRequest> {
        self.entries.get(&sequence_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn submit(dest: &str) -> Submit {
        Submit::new("svc", "106", dest).with_text("hi")
    }

    #[test]
    fn test_response_resolves_entry() {
        let mut table = PendingTable::new();
        let now = Instant::now();
        table.register(7, submit("133"), now);

        let request = table.resolve(7).unwrap();
        assert_eq!(request.attempts, 1);
        assert_eq!(request.command, CommandId::Submit);
        assert!(table.resolve(7).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_young_entries_are_left_alone() {
        let mut table = PendingTable::new();
        let now = Instant::now();
        table.register(1, submit("133"), now);

        let sweep = table.sweep(now + Duration::from_secs(59), WINDOW, 3);
        assert!(sweep.resend.is_empty());
        assert!(sweep.expired.is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resent_three_times_then_expires_once() {
        let mut table = PendingTable::new();
        let mut now = Instant::now();
        let mut sequence_id = 1;
        table.register(sequence_id, submit("13311112222"), now);

        for expected_attempts in 2..=4 {
            now += WINDOW;
            let mut sweep = table.sweep(now, WINDOW, 3);
            assert!(sweep.expired.is_empty());
            assert_eq!(sweep.resend.len(), 1);

            sequence_id += 1;
            let request = sweep.resend.remove(0);
            table.register_retry(sequence_id, request, now);
            assert_eq!(table.get(sequence_id).map(|r| r.attempts), Some(expected_attempts));
        }

        now += WINDOW;
        let sweep = table.sweep(now, WINDOW, 3);
        assert!(sweep.resend.is_empty());
        assert_eq!(sweep.expired.len(), 1);
        assert_eq!(sweep.expired[0].submit.dest_term_id, "13311112222");
        assert!(table.is_empty());

        now += WINDOW;
        let sweep = table.sweep(now, WINDOW, 3);
        assert!(sweep.expired.is_empty());
    }

    #[test]
    fn test_drain_empties_table_in_sequence_order() {
        let mut table = PendingTable::new();
        let now = Instant::now();
        table.register(9, submit("139"), now);
        table.register(4, submit("134"), now);

        let drained: Vec<u32> = table.drain().iter().map(|r| r.sequence_id).collect();
        assert_eq!(drained, vec![4, 9]);
        assert!(table.is_empty());
        assert!(table.drain().is_empty());
    }
}
