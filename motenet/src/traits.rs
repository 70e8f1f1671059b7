//! Hardware abstraction traits: radio, clock, randomness, sensors.
//!
//! The protocol core is generic over these so the same code runs on real
//! motes and inside the deterministic simulator. Channels use
//! `CriticalSectionRawMutex`, so a radio RX interrupt handler can deliver
//! frames with `try_send` while the node task receives them.

use alloc::vec::Vec;
use core::future::Future;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::types::{ChannelId, Command, Event, NodeAddr, SinkRecord};

/// Queue size for radio channels.
pub(crate) const RADIO_QUEUE_SIZE: usize = 8;

/// Queue size for command and sink channels.
pub(crate) const APP_QUEUE_SIZE: usize = 8;

/// Queue size for the event channel.
pub(crate) const EVENT_QUEUE_SIZE: usize = 16;

/// Mutex type used for channels.
pub(crate) type ChannelMutex = CriticalSectionRawMutex;

/// A frame delivered by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Raw frame bytes.
    pub data: Vec<u8>,
    /// Link-layer sender (the previous hop, not the originator).
    pub src: NodeAddr,
    /// True when addressed to this node, false for broadcast.
    pub unicast: bool,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// Link-layer sequence number, repeated across retransmissions.
    pub seq: u8,
}

/// A frame queued for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Raw frame bytes.
    pub data: Vec<u8>,
    /// Unicast destination, or `None` for broadcast.
    pub dest: Option<NodeAddr>,
}

/// Inbound frame channel.
pub type RadioInChannel = Channel<ChannelMutex, Received, RADIO_QUEUE_SIZE>;

/// Outbound frame channel.
pub type RadioOutChannel = Channel<ChannelMutex, Outbound, RADIO_QUEUE_SIZE>;

/// Console command / button input channel.
pub type CommandChannel = Channel<ChannelMutex, Command, APP_QUEUE_SIZE>;

/// Root-side sink output channel.
pub type SinkChannel = Channel<ChannelMutex, SinkRecord, APP_QUEUE_SIZE>;

/// Protocol event channel.
pub type EventChannel = Channel<ChannelMutex, Event, EVENT_QUEUE_SIZE>;

/// Radio backend trait.
///
/// - Radio ISR calls `incoming().try_send(frame)` when a frame arrives
/// - Node calls `incoming().receive().await`
/// - Node calls `outgoing().try_send(frame)`; the transmit task drains it
pub trait Radio {
    /// Maximum frame size this radio can transmit.
    ///
    /// The node checks encoded frame size before queueing.
    fn mtu(&self) -> usize;

    /// Channel for frames to transmit.
    fn outgoing(&self) -> &RadioOutChannel;

    /// Channel for received frames.
    fn incoming(&self) -> &RadioInChannel;
}

/// Time source trait for real or simulated time.
pub trait Clock {
    /// Future type returned by sleep_until.
    type SleepFuture<'a>: Future<Output = ()>
    where
        Self: 'a;

    /// Get the current timestamp.
    fn now(&self) -> Timestamp;

    /// Sleep until the given timestamp.
    ///
    /// In simulation this completes when the simulator advances time past
    /// the given timestamp.
    fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_>;
}

/// Random number generator trait.
///
/// Used for beacon and data-period jitter.
pub trait Random {
    /// Generate a random u64 in the range [min, max).
    fn gen_range(&mut self, min: u64, max: u64) -> u64;
}

/// Sensor access trait.
pub trait Sensors {
    /// Sample the current value of a measurement channel.
    fn sample(&mut self, channel: ChannelId) -> i32;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    //! Mock implementations of the hardware traits for unit testing.
    //!
    //! Available when running tests or with the `test-support` feature.

    use core::cell::Cell;
    use core::future::{ready, Ready};

    use hashbrown::HashMap;

    use super::*;

    /// Mock radio for testing.
    pub struct MockRadio {
        mtu: usize,
        outgoing: RadioOutChannel,
        incoming: RadioInChannel,
    }

    impl Default for MockRadio {
        fn default() -> Self {
            Self {
                mtu: 128,
                outgoing: Channel::new(),
                incoming: Channel::new(),
            }
        }
    }

    impl MockRadio {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_mtu(mtu: usize) -> Self {
            Self {
                mtu,
                ..Self::default()
            }
        }

        /// Inject a frame as if it was received.
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

    impl Radio for MockRadio {
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

    /// Mock clock for testing (synchronous, time advances manually).
    pub struct MockClock {
        current: Cell<Timestamp>,
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self {
                current: Cell::new(Timestamp::ZERO),
            }
        }
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        /// Jump to a specific time.
        pub fn set(&self, time: Timestamp) {
            self.current.set(time);
        }

        /// Advance time by the given duration.
        pub fn advance(&self, duration: crate::time::Duration) {
            self.current.set(self.current.get() + duration);
        }
    }

    impl Clock for MockClock {
        type SleepFuture<'a> = Ready<()>;

        fn now(&self) -> Timestamp {
            self.current.get()
        }

        fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
            // Synchronous tests advance time manually.
            ready(())
        }
    }

    /// Mock random for testing (deterministic LCG).
    pub struct MockRandom {
        pub state: u64,
    }

    impl Default for MockRandom {
        fn default() -> Self {
            Self { state: 12345 }
        }
    }

    impl MockRandom {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_seed(seed: u64) -> Self {
            Self { state: seed }
        }
    }

    impl Random for MockRandom {
        fn gen_range(&mut self, min: u64, max: u64) -> u64 {
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let range = max - min;
            if range == 0 {
                return min;
            }
            min + (self.state % range)
        }
    }

    /// Mock sensors returning configurable constant values.
    pub struct MockSensors {
        values: HashMap<ChannelId, i32>,
    }

    impl Default for MockSensors {
        fn default() -> Self {
            let mut values = HashMap::new();
            values.insert(ChannelId::Temperature, 21);
            values.insert(ChannelId::Humidity, 40);
            Self { values }
        }
    }

    impl MockSensors {
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the value returned for a channel.
        pub fn set(&mut self, channel: ChannelId, value: i32) {
            self.values.insert(channel, value);
        }
    }

    impl Sensors for MockSensors {
        fn sample(&mut self, channel: ChannelId) -> i32 {
            self.values.get(&channel).copied().unwrap_or(0)
        }
    }
}
