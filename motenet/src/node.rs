//! The protocol node: state, run loop, and input dispatch.
//!
//! A [`Node`] owns all protocol state and the channels that connect it to the
//! outside world. On hardware, `run()` drives it; in tests and simulation the
//! handler methods (`handle_frame`, `handle_timer`, `handle_command`) are
//! called directly with explicit timestamps.

use embassy_futures::select::{select3, Either3};
use hashbrown::HashMap;

use crate::debug::{DebugChannel, DebugEvent};
use crate::dedup::{DedupLedger, Freshness};
use crate::time::{Duration, Timestamp};
use crate::traits::{
    Clock, CommandChannel, EventChannel, Outbound, Radio, Random, Received, Sensors, SinkChannel,
};
use crate::types::{
    ChannelConfig, ChannelId, Command, Event, NodeAddr, SendMode, CONNECTED_BEACON_SECS,
    DATA_PERIOD_SECS, DEFAULT_ROOT_ADDR, DISCONNECTED_BEACON_SECS,
};
use crate::wire::Message;

/// Link to the currently adopted parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParentLink {
    /// The parent's address.
    pub addr: NodeAddr,
    /// Our own hop distance to the root (parent's announced hops + 1).
    pub hops: u16,
    /// RSSI of the announcement we adopted or last refreshed from.
    pub rssi: i16,
    /// Maintenance cycles since the parent last announced itself.
    pub missed_beats: u8,
}

/// A protocol node, generic over its hardware.
pub struct Node<R: Radio, Rn: Random, C: Clock, S: Sensors> {
    pub(crate) radio: R,
    pub(crate) random: Rn,
    pub(crate) clock: C,
    pub(crate) sensors: S,

    commands: CommandChannel,
    sink: SinkChannel,
    events: EventChannel,
    debug: DebugChannel,

    pub(crate) addr: NodeAddr,
    pub(crate) root_addr: NodeAddr,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) config: ChannelConfig,
    pub(crate) send_mode: SendMode,
    /// Last transmitted value per channel, backing the on-change mode.
    pub(crate) history: HashMap<ChannelId, i32>,
    pub(crate) ledger: DedupLedger,

    next_beacon: Timestamp,
    next_sample: Timestamp,
}

impl<R: Radio, Rn: Random, C: Clock, S: Sensors> Node<R, Rn, C, S> {
    /// Create a node using the deployment default root address.
    pub fn new(radio: R, random: Rn, clock: C, sensors: S, addr: NodeAddr) -> Self {
        Self::with_root(radio, random, clock, sensors, addr, DEFAULT_ROOT_ADDR)
    }

    /// Create a node with an explicit root address.
    pub fn with_root(
        radio: R,
        random: Rn,
        clock: C,
        sensors: S,
        addr: NodeAddr,
        root_addr: NodeAddr,
    ) -> Self {
        Self {
            radio,
            random,
            clock,
            sensors,
            commands: CommandChannel::new(),
            sink: SinkChannel::new(),
            events: EventChannel::new(),
            debug: DebugChannel::new(),
            addr,
            root_addr,
            parent: None,
            config: ChannelConfig::default(),
            send_mode: SendMode::Periodic,
            history: HashMap::new(),
            ledger: DedupLedger::new(),
            next_beacon: Timestamp::ZERO,
            next_sample: Timestamp::ZERO,
        }
    }

    /// This node's address.
    pub fn addr(&self) -> NodeAddr {
        self.addr
    }

    /// True if this node is the tree root.
    pub fn is_root(&self) -> bool {
        self.addr == self.root_addr
    }

    /// True if a route to the root exists (the root always has one).
    pub fn is_connected(&self) -> bool {
        self.is_root() || self.parent.is_some()
    }

    /// Hop distance to the root; meaningless while disconnected.
    pub fn hops(&self) -> u16 {
        if self.is_root() {
            0
        } else {
            self.parent.map(|p| p.hops).unwrap_or(u16::MAX)
        }
    }

    /// The current parent address, if any.
    pub fn parent_addr(&self) -> Option<NodeAddr> {
        self.parent.map(|p| p.addr)
    }

    /// The configuration record this node currently holds.
    pub fn config(&self) -> ChannelConfig {
        self.config
    }

    /// The current data sending mode.
    pub fn send_mode(&self) -> SendMode {
        self.send_mode
    }

    /// Channel for console commands and button presses.
    pub fn commands(&self) -> &CommandChannel {
        &self.commands
    }

    /// Root-side sink output channel.
    pub fn sink(&self) -> &SinkChannel {
        &self.sink
    }

    /// Protocol event channel.
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Debug trace channel.
    pub fn debug_events(&self) -> &DebugChannel {
        &self.debug
    }

    /// Borrow the radio (to inject or drain frames in tests).
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Borrow the clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Borrow the sensors mutably (to steer values in tests and simulation).
    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    /// Schedule the first beacon and sample ticks.
    ///
    /// Must be called once before driving the node with `handle_timer`;
    /// `run()` calls it itself.
    pub fn initialize(&mut self, now: Timestamp) {
        let beacon = self.beacon_interval();
        self.next_beacon = now + self.jittered(beacon);
        self.next_sample = now + self.jittered(Duration::from_secs(DATA_PERIOD_SECS));
    }

    /// The earliest pending timer deadline.
    pub fn next_wake(&self) -> Timestamp {
        self.next_beacon.min(self.next_sample)
    }

    /// Run the node forever.
    ///
    /// Waits on inbound frames, commands, and the next timer deadline.
    pub async fn run(&mut self) -> ! {
        self.initialize(self.clock.now());
        loop {
            let wake = self.next_wake();
            let input = select3(
                self.radio.incoming().receive(),
                self.commands.receive(),
                self.clock.sleep_until(wake),
            )
            .await;
            let now = self.clock.now();
            match input {
                Either3::First(frame) => self.handle_frame(frame, now),
                Either3::Second(command) => self.handle_command(command, now),
                Either3::Third(()) => self.handle_timer(now),
            }
        }
    }

    /// Process one inbound frame.
    pub fn handle_frame(&mut self, frame: Received, _now: Timestamp) {
        // Unicast frames ride the retransmitting hop-by-hop path; the same
        // frame may arrive more than once. Broadcasts are sent exactly once.
        if frame.unicast {
            if self.ledger.accept(frame.src, frame.seq) == Freshness::Duplicate {
                self.trace(DebugEvent::DuplicateSuppressed {
                    from: frame.src,
                    seq: frame.seq,
                });
                return;
            }
        }

        let message = match Message::decode(&frame.data) {
            Ok(message) => message,
            Err(error) => {
                self.trace(DebugEvent::FrameDecodeFailed {
                    from: frame.src,
                    error,
                });
                return;
            }
        };

        match message {
            Message::Discovery => self.on_discovery(frame.src, frame.unicast),
            Message::Status(status) => self.on_status(frame.src, frame.rssi, status),
            Message::Disconnection => self.on_disconnection(frame.src),
            Message::Data(reading) => self.on_data(reading),
            Message::Config(config) => self.on_config(config),
            Message::ConfigRequest => self.on_config_request(frame.src),
        }
    }

    /// Process an expired timer. Fires whichever deadlines have passed and
    /// reschedules them with fresh jitter.
    pub fn handle_timer(&mut self, now: Timestamp) {
        if now >= self.next_beacon {
            self.maintenance_tick();
            let beacon = self.beacon_interval();
            self.next_beacon = now + self.jittered(beacon);
        }
        if now >= self.next_sample {
            if self.is_connected() {
                self.produce_readings();
            }
            self.next_sample = now + self.jittered(Duration::from_secs(DATA_PERIOD_SECS));
        }
    }

    /// Process a console command or button press.
    pub fn handle_command(&mut self, command: Command, _now: Timestamp) {
        match command {
            Command::SetChannel { channel, required } => {
                // Only the root edits the required set; everyone else holds
                // whatever the flood delivered.
                if self.is_root() {
                    self.ingest_command(channel, required);
                } else {
                    self.trace(DebugEvent::CommandIgnored);
                }
            }
            Command::ToggleMode => {
                self.send_mode = match self.send_mode {
                    SendMode::Periodic => SendMode::OnChange,
                    SendMode::OnChange => SendMode::Periodic,
                };
                self.emit(Event::ModeChanged {
                    mode: self.send_mode,
                });
            }
        }
    }

    /// Base maintenance interval for the current connectivity state.
    pub(crate) fn beacon_interval(&self) -> Duration {
        if self.is_connected() {
            Duration::from_secs(CONNECTED_BEACON_SECS)
        } else {
            Duration::from_secs(DISCONNECTED_BEACON_SECS)
        }
    }

    /// Add uniform jitter in [0, base) to a base interval.
    pub(crate) fn jittered(&mut self, base: Duration) -> Duration {
        base + Duration::from_millis(self.random.gen_range(0, base.as_millis()))
    }

    /// Queue a frame, unicast when `dest` is given.
    pub(crate) fn send_message(&mut self, message: &Message, dest: Option<NodeAddr>) {
        let data = message.encode();
        if data.len() > self.radio.mtu() {
            return;
        }
        let _ = self.radio.outgoing().try_send(Outbound { data, dest });
    }

    pub(crate) fn emit(&mut self, event: Event) {
        let _ = self.events.try_send(event);
    }

    pub(crate) fn deliver_sink_record(&mut self, record: crate::types::SinkRecord) {
        let _ = self.sink.try_send(record);
    }

    pub(crate) fn trace(&mut self, event: DebugEvent) {
        let _ = self.debug.try_send(event);
    }
}
