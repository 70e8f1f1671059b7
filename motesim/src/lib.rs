//! motesim - discrete event network simulator for motenet protocol testing.
//!
//! Deterministic discrete-event simulation of whole mote networks in a single
//! process: no real-time delays, reproducible event ordering, configurable
//! radio topology (RSSI, loss, duplication, delay per link), scenario actions
//! (partitions, link cuts, console inputs), and metrics collection.
//!
//! # Example
//!
//! ```
//! use motesim::{ScenarioBuilder, Duration};
//!
//! // A root and two motes in radio range of everything, run for a minute.
//! let result = ScenarioBuilder::new(3)
//!     .with_seed(42)
//!     .fully_connected()
//!     .run_for(Duration::from_secs(60));
//!
//! // Every mote found a route to the root.
//! assert!(result.converged());
//! ```
//!
//! # Architecture
//!
//! A priority queue of events ordered by (time, sequence number). The main
//! loop pops an event, advances simulated time, calls the node's handlers
//! directly (`handle_frame`, `handle_timer`, `handle_command` instead of the
//! async `run()`), then drains the node's radio and routes the outbound
//! frames through the topology as future delivery events.

pub mod event;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod sim;
pub mod topology;

// Re-export main types
pub use event::{ScenarioAction, ScheduledEvent, SimEvent};
pub use metrics::{SimMetrics, SimulationResult, TreeSnapshot};
pub use motenet::{Duration, NodeAddr, Timestamp};
pub use node::{SimNode, SimSensors};
pub use scenario::{simple_scenario, ScenarioBuilder};
pub use sim::Simulator;
pub use topology::{Link, Topology};

#[cfg(test)]
mod tests {
    use super::*;
    use motenet::{ChannelId, Command, DEFAULT_ROOT_ADDR};

    #[test]
    fn test_single_root_stays_put() {
        let result = ScenarioBuilder::new(1)
            .with_seed(42)
            .fully_connected()
            .run_for(Duration::from_secs(30));

        let snapshot = result.metrics.latest_snapshot().unwrap();
        assert!(snapshot.fully_connected());
        assert_eq!(snapshot.hops.get(&DEFAULT_ROOT_ADDR), Some(&0));
    }

    #[test]
    fn test_two_nodes_form_tree() {
        let (mut sim, addrs) = ScenarioBuilder::new(2)
            .with_seed(42)
            .fully_connected()
            .build();
        let result = sim.run_for(Duration::from_secs(30));

        assert!(result.converged());
        let mote = sim.node(addrs[1]).unwrap();
        assert_eq!(mote.parent_addr(), Some(addrs[0]));
        assert_eq!(mote.hops(), 1);
    }

    #[test]
    fn test_chain_hop_counts() {
        let (mut sim, addrs) = ScenarioBuilder::new(5)
            .with_seed(42)
            .chain_topology()
            .build();
        let result = sim.run_for(Duration::from_secs(60));

        assert!(result.converged());
        for (expected_hops, &addr) in addrs.iter().enumerate() {
            assert_eq!(
                sim.node(addr).unwrap().hops(),
                expected_hops as u16,
                "wrong hop count at {}",
                addr
            );
        }
        let snapshot = result.metrics.latest_snapshot().unwrap();
        assert!(snapshot.tree_is_consistent());
    }

    #[test]
    fn test_parent_switch_to_shorter_route() {
        // The mote first only hears a relay two hops out; when a direct link
        // to the root appears, it must switch to the one-hop route.
        let root = ScenarioBuilder::addr_of(0);
        let mote = ScenarioBuilder::addr_of(1);
        let relay = ScenarioBuilder::addr_of(2);

        let mut topo = Topology::new();
        topo.add_link(root, relay, Link::new());
        topo.add_link(relay, mote, Link::new());
        topo.add_link(root, mote, Link::new().with_active(false));

        let (mut sim, _) = ScenarioBuilder::new(3)
            .with_seed(42)
            .topology(topo)
            .build();

        sim.run_for(Duration::from_secs(30));
        assert_eq!(sim.node(mote).unwrap().parent_addr(), Some(relay));
        assert_eq!(sim.node(mote).unwrap().hops(), 2);

        sim.schedule_action(
            sim.current_time(),
            ScenarioAction::EnableLink { a: root, b: mote },
        );
        sim.run_for(Duration::from_secs(30));

        assert_eq!(sim.node(mote).unwrap().parent_addr(), Some(root));
        assert_eq!(sim.node(mote).unwrap().hops(), 1);
    }

    #[test]
    fn test_link_cut_cascades_down_the_chain() {
        let (mut sim, addrs) = ScenarioBuilder::new(5)
            .with_seed(42)
            .chain_topology()
            .cut_link_at(Timestamp::from_secs(60), 1, 2)
            .build();

        sim.run_for(Duration::from_secs(60));
        assert!(sim.node_addrs().iter().all(|&a| sim.node(a).unwrap().is_connected()));

        // Liveness detection takes a few connected-beacon cycles; after that
        // the whole downstream segment must have cascaded to disconnected.
        sim.run_for(Duration::from_secs(60));

        assert!(sim.node(addrs[0]).unwrap().is_connected());
        assert!(sim.node(addrs[1]).unwrap().is_connected());
        for &addr in &addrs[2..] {
            assert!(
                !sim.node(addr).unwrap().is_connected(),
                "{} should have cascaded to disconnected",
                addr
            );
        }
    }

    #[test]
    fn test_heal_lets_subtree_rejoin() {
        let (mut sim, addrs) = ScenarioBuilder::new(3)
            .with_seed(42)
            .chain_topology()
            .cut_link_at(Timestamp::from_secs(60), 0, 1)
            .heal_at(Timestamp::from_secs(150))
            .build();

        sim.run_for(Duration::from_secs(120));
        assert!(!sim.node(addrs[1]).unwrap().is_connected());
        assert!(!sim.node(addrs[2]).unwrap().is_connected());

        let result = sim.run_for(Duration::from_secs(120));
        assert!(result.converged());
    }

    #[test]
    fn test_config_floods_and_root_filters() {
        let (mut sim, addrs) = ScenarioBuilder::new(3)
            .with_seed(42)
            .chain_topology()
            .build();

        sim.run_for(Duration::from_secs(60));
        // Discard everything collected while temperature was still required.
        sim.node(addrs[0]).unwrap().drain_sink();

        sim.schedule_input(
            sim.current_time(),
            addrs[0],
            Command::SetChannel {
                channel: ChannelId::Temperature,
                required: false,
            },
        );
        sim.run_for(Duration::from_secs(60));

        for &addr in &addrs {
            assert_eq!(
                sim.node(addr).unwrap().config_version(),
                1,
                "config did not reach {}",
                addr
            );
        }

        let records = sim.node(addrs[0]).unwrap().drain_sink();
        assert!(!records.is_empty());
        assert!(
            records.iter().all(|r| r.channel == ChannelId::Humidity),
            "temperature readings leaked past the root filter"
        );
    }

    #[test]
    fn test_duplicated_unicasts_reach_sink_once() {
        // Every unicast frame is delivered twice; with ramping sensors every
        // genuine reading is distinct, so any repeat in the sink is a
        // suppression failure.
        let (mut sim, addrs) = ScenarioBuilder::new(2)
            .with_seed(42)
            .fully_connected()
            .with_dup_rate(1.0)
            .with_ramp_sensors()
            .build();

        sim.run_for(Duration::from_secs(120));
        assert!(sim.metrics().frames_duplicated > 0);

        let records = sim.node(addrs[0]).unwrap().drain_sink();
        let from_mote: Vec<_> = records.iter().filter(|r| r.origin == addrs[1]).collect();
        assert!(!from_mote.is_empty());

        let mut seen = std::collections::HashSet::new();
        for record in &from_mote {
            assert!(
                seen.insert((record.channel, record.value)),
                "duplicate delivered to sink: {}",
                record
            );
        }
    }

    #[test]
    fn test_readings_flow_up_a_chain() {
        let (mut sim, addrs) = ScenarioBuilder::new(4)
            .with_seed(42)
            .chain_topology()
            .build();

        sim.run_for(Duration::from_secs(120));

        let records = sim.node(addrs[0]).unwrap().drain_sink();
        // Every mote's readings made it to the gateway, leaf included.
        for &addr in &addrs[1..] {
            assert!(
                records.iter().any(|r| r.origin == addr),
                "no readings from {} reached the sink",
                addr
            );
        }
    }

    #[test]
    fn test_lossy_network_still_converges() {
        let result = ScenarioBuilder::new(4)
            .with_seed(42)
            .fully_connected()
            .with_loss_rate(0.2)
            .run_for(Duration::from_secs(300));

        assert!(result.converged());
        assert!(result.metrics.frames_dropped > 0);
    }

    #[test]
    fn test_on_change_mode_thins_sink_traffic() {
        // Constant sensors: after the first reading per channel, on-change
        // motes go quiet while periodic motes keep repeating themselves.
        let (mut sim, addrs) = ScenarioBuilder::new(2)
            .with_seed(42)
            .fully_connected()
            .input_at(Timestamp::from_secs(60), 1, Command::ToggleMode)
            .build();

        sim.run_for(Duration::from_secs(60));
        sim.node(addrs[0]).unwrap().drain_sink();

        // Allow in-flight periodic readings to settle, then measure.
        sim.run_for(Duration::from_secs(30));
        sim.node(addrs[0]).unwrap().drain_sink();

        sim.run_for(Duration::from_secs(60));
        let quiet: Vec<_> = sim
            .node(addrs[0])
            .unwrap()
            .drain_sink()
            .into_iter()
            .filter(|r| r.origin == addrs[1])
            .collect();
        assert!(
            quiet.is_empty(),
            "on-change mote kept sending unchanged values: {:?}",
            quiet
        );
    }
}
