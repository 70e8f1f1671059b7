//! SimNode wrapper for simulated motenet nodes.

use std::cell::Cell;
use std::future::{ready, Ready};

use embassy_sync::channel::Channel;
use motenet::debug::DebugEvent;
use motenet::traits::{RadioInChannel, RadioOutChannel};
use motenet::{
    ChannelId, Clock, Command, Event, Node, NodeAddr, Outbound, Radio, Random, Received, Sensors,
    SinkRecord, Timestamp,
};

/// Mock radio for simulation. The simulator drains the outgoing channel and
/// routes frames through the topology.
pub struct SimRadio {
    mtu: usize,
    outgoing: RadioOutChannel,
    incoming: RadioInChannel,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            mtu: 128,
            outgoing: Channel::new(),
            incoming: Channel::new(),
        }
    }

    /// Inject a frame as if received from the radio.
    pub fn inject_rx(&self, frame: Received) {
        let _ = self.incoming.try_send(frame);
    }

    /// Take all queued outbound frames.
    pub fn take_sent(&self) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outgoing.try_receive() {
            frames.push(frame);
        }
        frames
    }
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl Radio for SimRadio {
    fn mtu(&self) -> usize {
        self.mtu
    }

    fn outgoing(&self) -> &RadioOutChannel {
        &self.outgoing
    }

    fn incoming(&self) -> &RadioInChannel {
        &self.incoming
    }
}

/// Mock clock for simulation. Time is controlled by the simulator.
pub struct SimClock {
    current: Cell<Timestamp>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current: Cell::new(Timestamp::ZERO),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.current.set(time);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    type SleepFuture<'a> = Ready<()>;

    fn now(&self) -> Timestamp {
        self.current.get()
    }

    fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
        ready(())
    }
}

/// Mock random for simulation (deterministic LCG).
pub struct SimRandom {
    state: u64,
}

impl SimRandom {
    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl Random for SimRandom {
    fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let range = max - min;
        if range == 0 {
            return min;
        }
        min + (self.state % range)
    }
}

/// Simulated sensors.
///
/// In ramp mode every sample returns a new value (a per-channel counter), so
/// every produced reading is distinct and sink records can be checked for
/// duplicates. In constant mode values only change when the scenario sets
/// them, which exercises the on-change suppression.
pub struct SimSensors {
    ramp: bool,
    temperature: i32,
    humidity: i32,
}

impl SimSensors {
    /// Constant-value sensors.
    pub fn constant(temperature: i32, humidity: i32) -> Self {
        Self {
            ramp: false,
            temperature,
            humidity,
        }
    }

    /// Ramping sensors: each sample is one higher than the last.
    pub fn ramp() -> Self {
        Self {
            ramp: true,
            temperature: -20,
            humidity: 0,
        }
    }

    /// Set a channel value (constant mode).
    pub fn set(&mut self, channel: ChannelId, value: i32) {
        match channel {
            ChannelId::Temperature => self.temperature = value,
            ChannelId::Humidity => self.humidity = value,
        }
    }
}

impl Default for SimSensors {
    fn default() -> Self {
        Self::constant(21, 40)
    }
}

impl Sensors for SimSensors {
    fn sample(&mut self, channel: ChannelId) -> i32 {
        let slot = match channel {
            ChannelId::Temperature => &mut self.temperature,
            ChannelId::Humidity => &mut self.humidity,
        };
        if self.ramp {
            *slot += 1;
        }
        *slot
    }
}

/// Type alias for simulated nodes.
pub type SimNodeInner = Node<SimRadio, SimRandom, SimClock, SimSensors>;

/// Wrapper around a motenet Node for simulation.
pub struct SimNode {
    inner: SimNodeInner,
}

impl SimNode {
    /// Create a simulated node with a deterministic jitter seed.
    pub fn new(addr: NodeAddr, seed: u64) -> Self {
        Self::with_sensors(addr, seed, SimSensors::default())
    }

    /// Create a simulated node with specific sensors.
    pub fn with_sensors(addr: NodeAddr, seed: u64, sensors: SimSensors) -> Self {
        let mut inner = Node::new(
            SimRadio::new(),
            SimRandom::with_seed(seed),
            SimClock::new(),
            sensors,
            addr,
        );
        inner.initialize(Timestamp::ZERO);
        Self { inner }
    }

    /// Get the node's address.
    pub fn addr(&self) -> NodeAddr {
        self.inner.addr()
    }

    /// Get a reference to the inner node.
    pub fn inner(&self) -> &SimNodeInner {
        &self.inner
    }

    /// Get a mutable reference to the inner node.
    pub fn inner_mut(&mut self) -> &mut SimNodeInner {
        &mut self.inner
    }

    /// Check if this node is the tree root.
    pub fn is_root(&self) -> bool {
        self.inner.is_root()
    }

    /// Check if this node has a route to the root.
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Hop distance to the root.
    pub fn hops(&self) -> u16 {
        self.inner.hops()
    }

    /// The current parent, if any.
    pub fn parent_addr(&self) -> Option<NodeAddr> {
        self.inner.parent_addr()
    }

    /// The configuration version this node holds.
    pub fn config_version(&self) -> u32 {
        self.inner.config().version
    }

    /// The next timer deadline.
    pub fn next_wake(&self) -> Timestamp {
        self.inner.next_wake()
    }

    /// Handle an incoming frame.
    pub fn handle_frame(&mut self, frame: Received, now: Timestamp) {
        // Keep clock.now() consistent for any code that reads it.
        self.inner.clock().set(now);
        self.inner.handle_frame(frame, now);
    }

    /// Handle a timer expiry.
    pub fn handle_timer(&mut self, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_timer(now);
    }

    /// Deliver a console command or button press.
    pub fn handle_command(&mut self, command: Command, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_command(command, now);
    }

    /// Take all outbound frames queued at the radio.
    pub fn take_outgoing(&self) -> Vec<Outbound> {
        self.inner.radio().take_sent()
    }

    /// Drain the root-side sink.
    pub fn drain_sink(&self) -> Vec<SinkRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.inner.sink().try_receive() {
            records.push(record);
        }
        records
    }

    /// Drain the protocol event channel.
    pub fn drain_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.events().try_receive() {
            events.push(event);
        }
        events
    }

    /// Drain the debug trace channel.
    pub fn take_debug_events(&self) -> Vec<DebugEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.debug_events().try_receive() {
            events.push(event);
        }
        events
    }

    /// Steer sensor values mid-scenario.
    pub fn set_sensor(&mut self, channel: ChannelId, value: i32) {
        self.inner.sensors_mut().set(channel, value);
    }
}
