//! Duplicate suppression for the hop-by-hop unicast path.
//!
//! Link-layer retransmissions can deliver the same unicast frame more than
//! once. The ledger remembers the last sequence number seen from each recent
//! sender; a repeat of that number is a duplicate and must not be dispatched
//! again. Capacity is small and fixed, with the oldest-inserted sender
//! evicted when a new one arrives.

use alloc::collections::VecDeque;

use crate::types::{NodeAddr, MAX_DEDUP_ENTRIES};

/// Verdict on an inbound unicast frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// First time this (sender, seq) pair is seen; dispatch it.
    Fresh,
    /// Retransmission of the last frame from this sender; drop it.
    Duplicate,
}

#[derive(Clone, Copy, Debug)]
struct DedupEntry {
    peer: NodeAddr,
    seq: u8,
}

/// Bounded table of the last sequence number per recent sender.
#[derive(Debug)]
pub struct DedupLedger {
    entries: VecDeque<DedupEntry>,
    capacity: usize,
}

impl DedupLedger {
    /// Create a ledger with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_DEDUP_ENTRIES)
    }

    /// Create a ledger holding at most `capacity` senders.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a (sender, seq) observation and classify it.
    ///
    /// A known sender with the same seq is a duplicate; a different seq
    /// updates the entry in place. An unknown sender evicts the
    /// oldest-inserted entry if the ledger is full.
    pub fn accept(&mut self, peer: NodeAddr, seq: u8) -> Freshness {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.peer == peer) {
            if entry.seq == seq {
                return Freshness::Duplicate;
            }
            entry.seq = seq;
            return Freshness::Fresh;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DedupEntry { peer, seq });
        Freshness::Fresh
    }

    /// Number of senders currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no senders are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}
