//! Per-stream state machine (spec §4.2): IDLE → OPEN → HALF_CLOSED_* → CLOSED.

/// Lifecycle state of one stream inside a multiplexed or HTTP/1 `Codec`.
/// HTTP/1 streams only ever visit IDLE, OPEN, then CLOSED (no half-close
/// phase — a single request/response pair closes both directions at once).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Open,
    HalfClosedRemote,
    HalfClosedLocal,
    Closed,
}

/// Tracks one stream's half-close flags and whether it has already had a
/// RST_STREAM sent (so a late frame on a closed stream doesn't generate a
/// second one — spec §4.2: "a late frame on a CLOSED stream ... produces an
/// on_error ... and a RST_STREAM egress if not already sent").
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamState {
    pub headers_complete: bool,
    pub egress_complete: bool,
    pub ingress_complete: bool,
    pub rst_sent: bool,
}

impl StreamState {
    pub fn phase(&self) -> StreamPhase {
        match (self.headers_complete, self.ingress_complete, self.egress_complete) {
            (false, _, _) => StreamPhase::Idle,
            (true, false, false) => StreamPhase::Open,
            (true, true, false) => StreamPhase::HalfClosedRemote,
            (true, false, true) => StreamPhase::HalfClosedLocal,
            (true, true, true) => StreamPhase::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase() == StreamPhase::Closed
    }

    pub fn mark_headers_complete(&mut self) {
        self.headers_complete = true;
    }

    pub fn mark_ingress_complete(&mut self) {
        self.ingress_complete = true;
    }

    pub fn mark_egress_complete(&mut self) {
        self.egress_complete = true;
    }
}
