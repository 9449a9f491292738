//! Flush timing for partially filled packets.
//!
//! A packet is sent when it is full, or once it has been open for
//! `max_latency_ms`, whichever comes first. Times are readings of a
//! free-running millisecond counter and may wrap.

/// Decide when an open packet must be flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlushScheduler {
    opened_at: Option<u32>,
    max_latency_ms: u32,
}

impl FlushScheduler {
    pub const fn new(max_latency_ms: u32) -> Self {
        Self {
            opened_at: None,
            max_latency_ms,
        }
    }

    pub fn max_latency_ms(&self) -> u32 {
        self.max_latency_ms
    }

    /// Record the time the first byte went into the packet. Later calls
    /// before `clear()` keep the original time.
    pub fn mark_open(&mut self, now_ms: u32) {
        if self.opened_at.is_none() {
            self.opened_at = Some(now_ms);
        }
    }

    /// `true` when a packet is open and has waited at least the latency
    /// budget.
    pub fn is_due(&self, now_ms: u32) -> bool {
        self.opened_at
            .is_some_and(|opened| now_ms.wrapping_sub(opened) >= self.max_latency_ms)
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// Forget the open packet (it was flushed or discarded).
    pub fn clear(&mut self) {
        self.opened_at = None;
    }
}
