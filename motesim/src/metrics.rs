//! Metrics collection for simulation analysis.

use hashbrown::HashMap;
use motenet::{NodeAddr, Timestamp};

/// A snapshot of tree state at a point in time.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    /// When this snapshot was taken.
    pub time: Timestamp,
    /// Parent of each node, `None` at the root or while disconnected.
    pub parents: HashMap<NodeAddr, Option<NodeAddr>>,
    /// Hop distance reported by each connected node.
    pub hops: HashMap<NodeAddr, u16>,
    /// Whether each node has a route to the root.
    pub connected: HashMap<NodeAddr, bool>,
    /// Configuration version held by each node.
    pub config_versions: HashMap<NodeAddr, u32>,
}

impl TreeSnapshot {
    /// Create a new empty snapshot.
    pub fn new(time: Timestamp) -> Self {
        Self {
            time,
            parents: HashMap::new(),
            hops: HashMap::new(),
            connected: HashMap::new(),
            config_versions: HashMap::new(),
        }
    }

    /// Record a node's state.
    pub fn record_node(
        &mut self,
        addr: NodeAddr,
        parent: Option<NodeAddr>,
        hops: u16,
        connected: bool,
        config_version: u32,
    ) {
        self.parents.insert(addr, parent);
        self.hops.insert(addr, hops);
        self.connected.insert(addr, connected);
        self.config_versions.insert(addr, config_version);
    }

    /// Check if every recorded node has a route to the root.
    pub fn fully_connected(&self) -> bool {
        self.connected.values().all(|&c| c)
    }

    /// Number of connected nodes.
    pub fn connected_count(&self) -> usize {
        self.connected.values().filter(|&&c| c).count()
    }

    /// Check that every connected non-root node sits one hop below its
    /// parent, and that following parents never revisits a node.
    pub fn tree_is_consistent(&self) -> bool {
        for (&addr, &parent) in &self.parents {
            let Some(parent) = parent else { continue };
            let Some(&own_hops) = self.hops.get(&addr) else {
                return false;
            };
            // The parent may be outside the recorded set (it died); only
            // check the relation when we can see both ends.
            if let Some(&parent_hops) = self.hops.get(&parent) {
                if self.connected.get(&parent) == Some(&true) && own_hops != parent_hops + 1 {
                    return false;
                }
            }
            // Walk up; a cycle would loop longer than the node count.
            let mut current = addr;
            for _ in 0..=self.parents.len() {
                match self.parents.get(&current) {
                    Some(Some(next)) => {
                        if *next == addr {
                            return false;
                        }
                        current = *next;
                    }
                    _ => break,
                }
            }
        }
        true
    }

    /// Check if all recorded nodes hold the given configuration version.
    pub fn config_converged_to(&self, version: u32) -> bool {
        self.config_versions.values().all(|&v| v == version)
    }
}

/// Simulation metrics collected over time.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Total frames submitted to the radio.
    pub frames_sent: u64,
    /// Frames dropped by loss rate or inactive links.
    pub frames_dropped: u64,
    /// Frames delivered (duplicates counted separately).
    pub frames_delivered: u64,
    /// Extra deliveries injected by link duplication.
    pub frames_duplicated: u64,
    /// Tree snapshots taken at intervals.
    pub snapshots: Vec<TreeSnapshot>,
}

impl SimMetrics {
    /// Create new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot.
    pub fn add_snapshot(&mut self, snapshot: TreeSnapshot) {
        self.snapshots.push(snapshot);
    }

    /// Find the first time every node was connected.
    pub fn convergence_time(&self) -> Option<Timestamp> {
        self.snapshots
            .iter()
            .find(|s| s.fully_connected())
            .map(|s| s.time)
    }

    /// Get the latest snapshot.
    pub fn latest_snapshot(&self) -> Option<&TreeSnapshot> {
        self.snapshots.last()
    }
}

/// Result of running a simulation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Final simulation time.
    pub end_time: Timestamp,
    /// Collected metrics.
    pub metrics: SimMetrics,
    /// Whether simulation ended due to event queue exhaustion (vs time limit).
    pub queue_exhausted: bool,
}

impl SimulationResult {
    /// Check if every node ended with a route to the root.
    pub fn converged(&self) -> bool {
        self.metrics
            .latest_snapshot()
            .is_some_and(|s| s.fully_connected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> NodeAddr {
        NodeAddr::new(n, 0)
    }

    #[test]
    fn test_fully_connected() {
        let mut snapshot = TreeSnapshot::new(Timestamp::ZERO);
        snapshot.record_node(addr(1), None, 0, true, 0);
        snapshot.record_node(addr(2), Some(addr(1)), 1, true, 0);
        assert!(snapshot.fully_connected());
        assert_eq!(snapshot.connected_count(), 2);

        snapshot.record_node(addr(3), None, u16::MAX, false, 0);
        assert!(!snapshot.fully_connected());
    }

    #[test]
    fn test_consistent_chain() {
        let mut snapshot = TreeSnapshot::new(Timestamp::ZERO);
        snapshot.record_node(addr(1), None, 0, true, 0);
        snapshot.record_node(addr(2), Some(addr(1)), 1, true, 0);
        snapshot.record_node(addr(3), Some(addr(2)), 2, true, 0);
        assert!(snapshot.tree_is_consistent());
    }

    #[test]
    fn test_hop_mismatch_detected() {
        let mut snapshot = TreeSnapshot::new(Timestamp::ZERO);
        snapshot.record_node(addr(1), None, 0, true, 0);
        snapshot.record_node(addr(2), Some(addr(1)), 3, true, 0);
        assert!(!snapshot.tree_is_consistent());
    }

    #[test]
    fn test_cycle_detected() {
        let mut snapshot = TreeSnapshot::new(Timestamp::ZERO);
        snapshot.record_node(addr(2), Some(addr(3)), 1, true, 0);
        snapshot.record_node(addr(3), Some(addr(2)), 2, true, 0);
        assert!(!snapshot.tree_is_consistent());
    }

    #[test]
    fn test_convergence_time() {
        let mut metrics = SimMetrics::new();

        let mut s1 = TreeSnapshot::new(Timestamp::from_secs(10));
        s1.record_node(addr(1), None, 0, true, 0);
        s1.record_node(addr(2), None, u16::MAX, false, 0);
        metrics.add_snapshot(s1);

        let mut s2 = TreeSnapshot::new(Timestamp::from_secs(20));
        s2.record_node(addr(1), None, 0, true, 0);
        s2.record_node(addr(2), Some(addr(1)), 1, true, 0);
        metrics.add_snapshot(s2);

        assert_eq!(metrics.convergence_time(), Some(Timestamp::from_secs(20)));
    }

    #[test]
    fn test_config_convergence() {
        let mut snapshot = TreeSnapshot::new(Timestamp::ZERO);
        snapshot.record_node(addr(1), None, 0, true, 4);
        snapshot.record_node(addr(2), Some(addr(1)), 1, true, 4);
        assert!(snapshot.config_converged_to(4));
        assert!(!snapshot.config_converged_to(3));
    }
}
