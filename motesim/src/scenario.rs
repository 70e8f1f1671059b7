//! Scenario builder for setting up and running simulations.
//!
//! Nodes are addressed 1.0, 2.0, 3.0, ... in creation order; the first node
//! is the root/gateway at the deployment default address.

use motenet::{Command, Duration, NodeAddr, Timestamp};

use crate::event::ScenarioAction;
use crate::metrics::SimulationResult;
use crate::node::SimSensors;
use crate::sim::Simulator;
use crate::topology::Topology;

/// Type of topology to generate.
#[derive(Debug, Clone)]
enum TopologyType {
    /// Fully connected topology.
    FullyConnected,
    /// Chain topology (root at one end).
    Chain,
    /// Star topology (root is hub).
    Star,
    /// Custom topology provided by the caller.
    Custom(Topology),
}

/// Kind of sensors to give the nodes.
#[derive(Debug, Clone, Copy)]
enum SensorKind {
    Constant,
    Ramp,
}

/// Builder for simulation scenarios.
pub struct ScenarioBuilder {
    /// Number of nodes to create (root included).
    num_nodes: usize,
    /// RNG seed for determinism.
    seed: u64,
    /// Topology type to generate.
    topology_type: Option<TopologyType>,
    /// Global frame loss rate.
    loss_rate: f64,
    /// Unicast duplication rate for all links.
    dup_rate: f64,
    /// Sensor behavior.
    sensors: SensorKind,
    /// Scheduled actions.
    actions: Vec<(Timestamp, ScenarioAction)>,
    /// Scheduled node inputs.
    inputs: Vec<(Timestamp, NodeAddr, Command)>,
    /// Snapshot interval.
    snapshot_interval: Option<Duration>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ScenarioBuilder {
    /// Create a new scenario with the specified number of nodes.
    ///
    /// A topology must be specified before calling build(): use
    /// `.fully_connected()`, `.chain_topology()`, `.star_topology()`,
    /// or `.topology(custom)`.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            seed: 42,
            topology_type: None,
            loss_rate: 0.0,
            dup_rate: 0.0,
            sensors: SensorKind::Constant,
            actions: Vec::new(),
            inputs: Vec::new(),
            snapshot_interval: None,
        }
    }

    /// The address of the i-th node (0-based; 0 is the root).
    pub fn addr_of(index: usize) -> NodeAddr {
        NodeAddr::new((index + 1) as u8, 0)
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set a custom radio topology.
    pub fn topology(mut self, topo: Topology) -> Self {
        self.topology_type = Some(TopologyType::Custom(topo));
        self
    }

    /// Use fully connected topology.
    pub fn fully_connected(mut self) -> Self {
        self.topology_type = Some(TopologyType::FullyConnected);
        self
    }

    /// Use chain topology (root at one end).
    pub fn chain_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Chain);
        self
    }

    /// Use star topology (root is hub).
    pub fn star_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Star);
        self
    }

    /// Set global frame loss rate.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set unicast duplication rate on all links.
    pub fn with_dup_rate(mut self, rate: f64) -> Self {
        self.dup_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Give every node ramping sensors (each sample distinct).
    pub fn with_ramp_sensors(mut self) -> Self {
        self.sensors = SensorKind::Ramp;
        self
    }

    /// Set snapshot interval for metrics collection.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    /// Schedule a network partition at the specified time (node indices).
    pub fn partition_at(mut self, time: Timestamp, groups: Vec<Vec<usize>>) -> Self {
        self.actions.push((
            time,
            ScenarioAction::Partition {
                groups: groups
                    .into_iter()
                    .map(|g| g.into_iter().map(Self::addr_of).collect())
                    .collect(),
            },
        ));
        self
    }

    /// Schedule partition healing at the specified time.
    pub fn heal_at(mut self, time: Timestamp) -> Self {
        self.actions.push((time, ScenarioAction::HealPartition));
        self
    }

    /// Cut the link between two nodes (by index) at the specified time.
    pub fn cut_link_at(mut self, time: Timestamp, a: usize, b: usize) -> Self {
        self.actions.push((
            time,
            ScenarioAction::DisableLink {
                a: Self::addr_of(a),
                b: Self::addr_of(b),
            },
        ));
        self
    }

    /// Schedule a snapshot at the specified time.
    pub fn snapshot_at(mut self, time: Timestamp) -> Self {
        self.actions.push((time, ScenarioAction::TakeSnapshot));
        self
    }

    /// Schedule a console command or button press for a node (by index).
    pub fn input_at(mut self, time: Timestamp, node: usize, command: Command) -> Self {
        self.inputs.push((time, Self::addr_of(node), command));
        self
    }

    /// Build the simulator with all nodes and topology.
    pub fn build(self) -> (Simulator, Vec<NodeAddr>) {
        let mut sim = Simulator::new(self.seed);

        if let Some(interval) = self.snapshot_interval {
            sim = sim.with_snapshot_interval(interval);
        }

        let addrs: Vec<NodeAddr> = (0..self.num_nodes).map(Self::addr_of).collect();

        let mut topo = match self.topology_type {
            Some(TopologyType::FullyConnected) => Topology::fully_connected(&addrs),
            Some(TopologyType::Chain) => Topology::chain(&addrs),
            Some(TopologyType::Star) => Topology::star(&addrs),
            Some(TopologyType::Custom(t)) => t,
            None => panic!(
                "Topology must be explicitly specified. \
                Use .fully_connected(), .chain_topology(), .star_topology(), or .topology()"
            ),
        };

        if self.loss_rate > 0.0 {
            topo.set_global_loss_rate(self.loss_rate);
        }
        if self.dup_rate > 0.0 {
            for i in 0..addrs.len() {
                for j in (i + 1)..addrs.len() {
                    if let Some(link) = topo.get_link_mut(addrs[i], addrs[j]) {
                        link.dup_rate = self.dup_rate;
                    }
                }
            }
        }

        sim = sim.with_topology(topo);

        for (i, &addr) in addrs.iter().enumerate() {
            let node_seed = self.seed.wrapping_add(i as u64 * 1000);
            let sensors = match self.sensors {
                SensorKind::Constant => SimSensors::default(),
                SensorKind::Ramp => SimSensors::ramp(),
            };
            sim.add_node_with_sensors(addr, node_seed, sensors);
        }

        for (time, action) in self.actions {
            sim.schedule_action(time, action);
        }
        for (time, node, command) in self.inputs {
            sim.schedule_input(time, node, command);
        }

        (sim, addrs)
    }

    /// Build and run the simulation for the specified duration.
    pub fn run_for(self, duration: Duration) -> SimulationResult {
        let (mut sim, _) = self.build();
        sim.run_for(duration)
    }
}

/// Convenience function for an N-node fully connected scenario.
pub fn simple_scenario(num_nodes: usize) -> ScenarioBuilder {
    ScenarioBuilder::new(num_nodes).fully_connected()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_builder_basic() {
        let (sim, addrs) = ScenarioBuilder::new(3)
            .with_seed(123)
            .fully_connected()
            .build();

        assert_eq!(addrs.len(), 3);
        assert_eq!(sim.node_addrs().len(), 3);
        assert_eq!(addrs[0], NodeAddr::new(1, 0));
        assert!(sim.node(addrs[0]).unwrap().is_root());
        assert!(!sim.node(addrs[1]).unwrap().is_root());
    }

    #[test]
    fn test_scenario_run_for() {
        let result = simple_scenario(2).run_for(Duration::from_secs(1));

        assert!(result.end_time >= Timestamp::from_secs(1));
        assert!(!result.metrics.snapshots.is_empty());
    }

    #[test]
    fn test_scenario_with_loss() {
        let (sim, addrs) = ScenarioBuilder::new(2)
            .fully_connected()
            .with_loss_rate(0.5)
            .build();

        let link = sim.topology().get_link(addrs[0], addrs[1]).unwrap();
        assert_eq!(link.loss_rate, 0.5);
    }

    #[test]
    fn test_scenario_partition() {
        let (mut sim, addrs) = ScenarioBuilder::new(4)
            .fully_connected()
            .partition_at(Timestamp::from_millis(500), vec![vec![0, 1], vec![2, 3]])
            .build();

        assert!(sim.topology().is_connected(addrs[0], addrs[2]));

        sim.run_for(Duration::from_secs(1));

        assert!(!sim.topology().is_connected(addrs[0], addrs[2]));
        assert!(sim.topology().is_connected(addrs[0], addrs[1]));
        assert!(sim.topology().is_connected(addrs[2], addrs[3]));
    }
}
