//! Core types and constants for the motenet protocol.

use core::fmt;

// Liveness thresholds, in maintenance cycles without a fresh parent status.
// Probe the parent after the counter exceeds PROBE_MISSED_BEATS; declare it
// lost after it exceeds DEAD_MISSED_BEATS.
pub const PROBE_MISSED_BEATS: u8 = 1;
pub const DEAD_MISSED_BEATS: u8 = 2;

// Maintenance beacon base intervals (seconds). The actual wait adds uniform
// jitter in [0, base) to avoid synchronized broadcast storms. Disconnected
// nodes beacon fast to rejoin quickly; a stable tree minimizes airtime.
pub const DISCONNECTED_BEACON_SECS: u64 = 1;
pub const CONNECTED_BEACON_SECS: u64 = 4;

/// Data production base interval (seconds), jittered the same way.
pub const DATA_PERIOD_SECS: u64 = 5;

/// Capacity of the duplicate suppression ledger.
pub const MAX_DEDUP_ENTRIES: usize = 4;

// Message type tags (0-5 valid; others dropped silently)
pub const MT_DISCOVERY: u8 = 0;
pub const MT_STATUS: u8 = 1;
pub const MT_DISCONNECTION: u8 = 2;
pub const MT_DATA: u8 = 3;
pub const MT_CONFIG: u8 = 4;
pub const MT_CONFIG_REQUEST: u8 = 5;

/// 2-byte mote address. Opaque: ordered for comparison only, no arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeAddr(pub [u8; 2]);

/// The deployment-time root/gateway address (lowest assigned address).
pub const DEFAULT_ROOT_ADDR: NodeAddr = NodeAddr([1, 0]);

impl NodeAddr {
    /// The null address, used on the wire when no parent is meaningful.
    pub const NULL: NodeAddr = NodeAddr([0, 0]);

    pub const fn new(hi: u8, lo: u8) -> Self {
        NodeAddr([hi, lo])
    }

    pub const fn octets(self) -> [u8; 2] {
        self.0
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

impl fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

/// Measurement channels a mote can sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Temperature,
    Humidity,
}

impl ChannelId {
    /// All channels, in wire-tag order.
    pub const ALL: [ChannelId; 2] = [ChannelId::Temperature, ChannelId::Humidity];

    /// Wire tag for this channel.
    pub const fn tag(self) -> u8 {
        match self {
            ChannelId::Temperature => 0,
            ChannelId::Humidity => 1,
        }
    }

    /// Decode a wire tag.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChannelId::Temperature),
            1 => Some(ChannelId::Humidity),
            _ => None,
        }
    }

    /// Channel name as used by the gateway console.
    pub const fn name(self) -> &'static str {
        match self {
            ChannelId::Temperature => "temp",
            ChannelId::Humidity => "hum",
        }
    }

    /// Parse a console channel name.
    pub fn from_name(name: &str) -> Option<Self> {
        ChannelId::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitset of measurement channels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub const EMPTY: ChannelSet = ChannelSet(0);

    /// The set containing every channel.
    pub fn all() -> Self {
        let mut set = ChannelSet::EMPTY;
        for channel in ChannelId::ALL {
            set.insert(channel);
        }
        set
    }

    pub fn contains(self, channel: ChannelId) -> bool {
        self.0 & (1 << channel.tag()) != 0
    }

    pub fn insert(&mut self, channel: ChannelId) {
        self.0 |= 1 << channel.tag();
    }

    pub fn remove(&mut self, channel: ChannelId) {
        self.0 &= !(1 << channel.tag());
    }

    pub fn set(&mut self, channel: ChannelId, member: bool) {
        if member {
            self.insert(channel);
        } else {
            self.remove(channel);
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bits for the wire format.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstruct from wire bits. Bits beyond the known channels are masked.
    pub fn from_bits(bits: u8) -> Self {
        let mut valid = 0u8;
        for channel in ChannelId::ALL {
            valid |= 1 << channel.tag();
        }
        ChannelSet(bits & valid)
    }
}

impl fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(ChannelId::ALL.into_iter().filter(|c| self.contains(*c)))
            .finish()
    }
}

/// Versioned record of which channels the gateway wants.
///
/// Only strictly newer versions are ever adopted; ties and regressions are
/// discarded, so the record held by a node is the highest version it has
/// observed. Only the root increments the version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub version: u32,
    pub required: ChannelSet,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            version: 0,
            required: ChannelSet::all(),
        }
    }
}

/// Status frame payload: a node's current tree position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    /// The sender's parent ([`NodeAddr::NULL`] at the root).
    pub parent: NodeAddr,
    /// Signal strength of the sender's parent link (dBm).
    pub parent_rssi: i16,
    /// The sender's hop distance to the root.
    pub hops: u16,
    /// The configuration version the sender holds.
    pub config_version: u32,
}

/// Data frame payload: one sensor reading, routed hop by hop to the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    pub channel: ChannelId,
    /// The mote that sampled the value (unchanged while forwarding).
    pub origin: NodeAddr,
    pub value: i32,
}

/// A reading accepted by the root, emitted on the gateway console.
///
/// Rendered as `origin;channel;value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkRecord {
    pub origin: NodeAddr,
    pub channel: ChannelId,
    pub value: i32,
}

impl fmt::Display for SinkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.origin, self.channel, self.value)
    }
}

/// Data transmission modes, toggled at runtime by the button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMode {
    /// Transmit every produced value.
    Periodic,
    /// Transmit only when the value differs from the last transmitted one.
    OnChange,
}

/// External inputs: gateway console commands and the mode button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Toggle whether a channel is required (root only).
    SetChannel { channel: ChannelId, required: bool },
    /// Flip between periodic and on-change sending.
    ToggleMode,
}

impl Command {
    /// Parse a console line of the form `flag:channel`, e.g. `1:temp`.
    pub fn parse(line: &str) -> Option<Self> {
        let (flag, name) = line.split_once(':')?;
        let required = match flag {
            "1" => true,
            "0" => false,
            _ => return None,
        };
        let channel = ChannelId::from_name(name)?;
        Some(Command::SetChannel { channel, required })
    }
}

/// Events emitted by the node for application handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A parent was adopted (first join or switch).
    Joined { parent: NodeAddr, hops: u16 },
    /// The parent was lost; the node is disconnected and rejoining.
    ParentLost,
    /// A newer channel configuration was adopted.
    ConfigChanged { version: u32, required: ChannelSet },
    /// The data sending mode changed.
    ModeChanged { mode: SendMode },
}
