//! Debug events for protocol tracing.
//!
//! Structured trace of protocol decisions, consumed by tests and the
//! simulator. The node pushes events on a best-effort channel; when nobody
//! drains it the oldest events are simply lost.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::types::{ChannelId, NodeAddr};
use crate::wire::DecodeError;

/// Queue size for the debug event channel.
pub(crate) const DEBUG_QUEUE_SIZE: usize = 32;

/// Channel carrying debug events out of a node.
pub type DebugChannel = Channel<CriticalSectionRawMutex, DebugEvent, DEBUG_QUEUE_SIZE>;

/// Debug events emitted by the node for protocol tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugEvent {
    /// An inbound frame failed to decode and was dropped.
    FrameDecodeFailed { from: NodeAddr, error: DecodeError },
    /// An inbound unicast frame repeated a known sequence number.
    DuplicateSuppressed { from: NodeAddr, seq: u8 },
    /// A discovery frame arrived.
    DiscoveryReceived { from: NodeAddr, unicast: bool },
    /// A status frame arrived.
    StatusReceived { from: NodeAddr, hops: u16 },
    /// A status frame named this node as the sender's parent; not a candidate.
    StatusRejectedCycle { from: NodeAddr },
    /// A parent was adopted (join or switch).
    ParentAdopted { parent: NodeAddr, hops: u16 },
    /// The current parent re-announced itself; liveness counter reset.
    ParentRefreshed { parent: NodeAddr },
    /// The parent went quiet; a unicast discovery probe was sent.
    ParentProbed { parent: NodeAddr, missed_beats: u8 },
    /// The parent stayed quiet past the liveness limit.
    ParentDeclaredLost { parent: NodeAddr },
    /// A disconnection frame arrived.
    DisconnectionReceived { from: NodeAddr, was_parent: bool },
    /// A strictly newer configuration was adopted and re-flooded.
    ConfigAdopted { version: u32 },
    /// A configuration at or below the held version was discarded.
    ConfigIgnored { version: u32, held: u32 },
    /// A newer version was observed in a status; full record requested.
    ConfigRequested { from: NodeAddr, version: u32 },
    /// A local sensor value was produced for transmission.
    ReadingProduced { channel: ChannelId, value: i32 },
    /// A reading from downstream was forwarded toward the root.
    ReadingForwarded { origin: NodeAddr, channel: ChannelId },
    /// The root discarded a reading for a channel no longer required.
    ReadingFiltered { origin: NodeAddr, channel: ChannelId },
    /// A reading was dropped because no route to the root exists.
    ReadingDropped { origin: NodeAddr, channel: ChannelId },
    /// A maintenance broadcast went out (discovery or status).
    BeaconSent { connected: bool },
    /// A console command was refused (non-root or unparsable).
    CommandIgnored,
}
