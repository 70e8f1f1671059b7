//! Discrete event simulator for motenet networks.

use std::collections::BinaryHeap;

use hashbrown::HashMap;
use motenet::{Command, Duration, NodeAddr, Received, Timestamp};

use crate::event::{ScenarioAction, ScheduledEvent, SequenceNumber, SimEvent};
use crate::metrics::{SimMetrics, SimulationResult, TreeSnapshot};
use crate::node::{SimNode, SimSensors};
use crate::topology::Topology;

/// Discrete event simulator for motenet networks.
pub struct Simulator {
    /// All nodes in the simulation.
    nodes: HashMap<NodeAddr, SimNode>,
    /// Radio topology.
    topology: Topology,
    /// Current simulation time.
    current_time: Timestamp,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// Per-sender link-layer frame sequence counters.
    frame_seqs: HashMap<NodeAddr, u8>,
    /// RNG state for frame loss and duplication.
    rng_state: u64,
    /// Interval for automatic snapshots.
    snapshot_interval: Option<Duration>,
    /// Next snapshot time.
    next_snapshot: Option<Timestamp>,
}

impl Simulator {
    /// Create a new simulator with the given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            topology: Topology::new(),
            current_time: Timestamp::ZERO,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            frame_seqs: HashMap::new(),
            rng_state: seed,
            snapshot_interval: None,
            next_snapshot: None,
        }
    }

    /// Set the radio topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the snapshot interval for automatic tree state recording.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self.next_snapshot = Some(self.current_time + interval);
        self
    }

    /// Add a node at the given address.
    pub fn add_node(&mut self, addr: NodeAddr, seed: u64) -> NodeAddr {
        self.add_node_internal(SimNode::new(addr, seed))
    }

    /// Add a node with specific sensors.
    pub fn add_node_with_sensors(
        &mut self,
        addr: NodeAddr,
        seed: u64,
        sensors: SimSensors,
    ) -> NodeAddr {
        self.add_node_internal(SimNode::with_sensors(addr, seed, sensors))
    }

    fn add_node_internal(&mut self, node: SimNode) -> NodeAddr {
        let addr = node.addr();
        let first_wake = node.next_wake();
        self.nodes.insert(addr, node);
        self.schedule(first_wake, SimEvent::TimerFire { node: addr });
        addr
    }

    /// Get a reference to a node.
    pub fn node(&self, addr: NodeAddr) -> Option<&SimNode> {
        self.nodes.get(&addr)
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, addr: NodeAddr) -> Option<&mut SimNode> {
        self.nodes.get_mut(&addr)
    }

    /// Get all node addresses.
    pub fn node_addrs(&self) -> Vec<NodeAddr> {
        let mut addrs: Vec<NodeAddr> = self.nodes.keys().copied().collect();
        addrs.sort();
        addrs
    }

    /// Get the current simulation time.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Get the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get mutable topology.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Get collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: Timestamp, event: SimEvent) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Schedule a scenario action.
    pub fn schedule_action(&mut self, time: Timestamp, action: ScenarioAction) {
        self.schedule(time, SimEvent::ScenarioAction(action));
    }

    /// Schedule a console command or button press for a node.
    pub fn schedule_input(&mut self, time: Timestamp, node: NodeAddr, command: Command) {
        self.schedule(time, SimEvent::Input { node, command });
    }

    /// Run simulation until the specified time.
    pub fn run_until(&mut self, end_time: Timestamp) -> SimulationResult {
        while let Some(event) = self.event_queue.peek() {
            if event.time > end_time {
                break;
            }

            let event = self.event_queue.pop().unwrap();
            self.advance_time(event.time);
            self.process_event(event.event);
            self.maybe_take_snapshot();
        }

        // Advance to end_time even if no more events
        self.advance_time(end_time);
        self.take_snapshot();

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.peek().is_none(),
        }
    }

    /// Run simulation for the specified duration.
    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    fn process_event(&mut self, event: SimEvent) {
        match event {
            SimEvent::FrameDelivery {
                to,
                data,
                src,
                unicast,
                rssi,
                seq,
            } => {
                self.deliver_frame(to, data, src, unicast, rssi, seq);
            }
            SimEvent::TimerFire { node } => {
                self.fire_timer(node);
            }
            SimEvent::Input { node, command } => {
                let now = self.current_time;
                if let Some(node_ref) = self.nodes.get_mut(&node) {
                    node_ref.handle_command(command, now);
                }
                self.collect_outgoing(node);
            }
            SimEvent::ScenarioAction(action) => {
                self.execute_action(action);
            }
        }
    }

    fn deliver_frame(
        &mut self,
        to: NodeAddr,
        data: Vec<u8>,
        src: NodeAddr,
        unicast: bool,
        rssi: i16,
        seq: u8,
    ) {
        let now = self.current_time;
        if let Some(node) = self.nodes.get_mut(&to) {
            node.handle_frame(
                Received {
                    data,
                    src,
                    unicast,
                    rssi,
                    seq,
                },
                now,
            );
            self.metrics.frames_delivered += 1;
        }
        // Route whatever the handler produced (separate borrow).
        self.collect_outgoing(to);
    }

    fn fire_timer(&mut self, addr: NodeAddr) {
        let now = self.current_time;

        let next_wake = if let Some(node) = self.nodes.get_mut(&addr) {
            node.handle_timer(now);
            Some(node.next_wake())
        } else {
            None
        };

        self.collect_outgoing(addr);

        // One pending timer event per node; deadlines only move inside
        // handle_timer, so next_wake is stable until then.
        if let Some(next_wake) = next_wake {
            self.schedule(next_wake, SimEvent::TimerFire { node: addr });
        }
    }

    /// Collect outbound frames from a node and route them.
    fn collect_outgoing(&mut self, sender: NodeAddr) {
        let frames = match self.nodes.get(&sender) {
            Some(node) => node.take_outgoing(),
            None => return,
        };

        for frame in frames {
            self.route_frame(sender, frame.data, frame.dest);
        }
    }

    /// Route one frame from sender through the topology.
    fn route_frame(&mut self, sender: NodeAddr, data: Vec<u8>, dest: Option<NodeAddr>) {
        self.metrics.frames_sent += 1;

        let seq = {
            let counter = self.frame_seqs.entry(sender).or_insert(0);
            *counter = counter.wrapping_add(1);
            *counter
        };

        match dest {
            // Unicast: delivered only if the destination is a reachable
            // neighbor. The link may also duplicate the frame, modeling a
            // lost ack followed by a retransmission at the same seq.
            Some(dest) => {
                let Some(link) = self.topology.get_link(sender, dest) else {
                    self.metrics.frames_dropped += 1;
                    return;
                };
                if !link.active {
                    self.metrics.frames_dropped += 1;
                    return;
                }
                let (loss_rate, dup_rate, delay, rssi) =
                    (link.loss_rate, link.dup_rate, link.delay, link.rssi);

                if loss_rate > 0.0 && self.random_f64() < loss_rate {
                    self.metrics.frames_dropped += 1;
                    return;
                }

                let copies = if dup_rate > 0.0 && self.random_f64() < dup_rate {
                    self.metrics.frames_duplicated += 1;
                    2
                } else {
                    1
                };
                for _ in 0..copies {
                    // The retransmitted copy arrives back to back with the
                    // original: link retries are stop-and-wait, so no later
                    // frame from this sender can slip in between.
                    self.schedule(
                        self.current_time + delay,
                        SimEvent::FrameDelivery {
                            to: dest,
                            data: data.clone(),
                            src: sender,
                            unicast: true,
                            rssi,
                            seq,
                        },
                    );
                }
            }
            // Broadcast: one copy to every reachable neighbor, each link
            // applying its own loss.
            None => {
                let neighbors = self.topology.neighbors(sender);
                let mut deliveries = Vec::with_capacity(neighbors.len());

                for neighbor in neighbors {
                    if let Some(link) = self.topology.get_link(sender, neighbor) {
                        if !link.active {
                            continue;
                        }
                        let (loss_rate, delay, rssi) = (link.loss_rate, link.delay, link.rssi);
                        if loss_rate > 0.0 && self.random_f64() < loss_rate {
                            self.metrics.frames_dropped += 1;
                            continue;
                        }
                        deliveries.push((neighbor, delay, rssi));
                    }
                }

                for (neighbor, delay, rssi) in deliveries {
                    self.schedule(
                        self.current_time + delay,
                        SimEvent::FrameDelivery {
                            to: neighbor,
                            data: data.clone(),
                            src: sender,
                            unicast: false,
                            rssi,
                            seq,
                        },
                    );
                }
            }
        }
    }

    fn execute_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::Partition { groups } => {
                self.topology.partition(&groups);
            }
            ScenarioAction::HealPartition => {
                self.topology.heal();
            }
            ScenarioAction::DisableLink { a, b } => {
                if let Some(link) = self.topology.get_link_mut(a, b) {
                    link.active = false;
                }
            }
            ScenarioAction::EnableLink { a, b } => {
                if let Some(link) = self.topology.get_link_mut(a, b) {
                    link.active = true;
                }
            }
            ScenarioAction::TakeSnapshot => {
                self.take_snapshot();
            }
        }
    }

    fn maybe_take_snapshot(&mut self) {
        if let Some(next) = self.next_snapshot {
            if self.current_time >= next {
                self.take_snapshot();
                if let Some(interval) = self.snapshot_interval {
                    self.next_snapshot = Some(next + interval);
                }
            }
        }
    }

    /// Take a tree state snapshot.
    pub fn take_snapshot(&mut self) {
        let mut snapshot = TreeSnapshot::new(self.current_time);

        for (&addr, node) in &self.nodes {
            snapshot.record_node(
                addr,
                node.parent_addr(),
                node.hops(),
                node.is_connected(),
                node.config_version(),
            );
        }

        self.metrics.add_snapshot(snapshot);
    }

    /// Generate a random f64 in [0, 1).
    fn random_f64(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.rng_state >> 11) as f64 / (1u64 << 53) as f64
    }
}
