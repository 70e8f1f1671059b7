#![forbid(unsafe_code)]
//! motenet - spanning-tree data collection protocol for wireless sensor motes
//!
//! Motes self-organize into a spanning tree rooted at a fixed gateway node.
//! Sensor readings travel hop by hop up the tree to the gateway; a versioned
//! channel configuration floods down from it. The tree repairs itself when
//! links die, cutting whole subtrees loose and letting them rejoin.
//!
//! This crate is `no_std` but **requires the `alloc` crate**. It uses
//! heap-allocated collections (`Vec`, `VecDeque`, `HashMap`) with small,
//! bounded working sets.
//!
//! # Key Properties
//!
//! - Fewest-hops parent selection, RSSI breaking ties
//! - Cascading disconnection: a cut anywhere immediately frees the subtree
//! - Version-monotone configuration flood with lazy pull for stragglers
//! - Hop-by-hop unicast data routing with per-sender duplicate suppression
//! - No clock synchronization required; all timers are local and jittered
//!
//! # Example (basic usage)
//!
//! ```
//! use motenet::{Node, NodeAddr};
//! use motenet::traits::test_impls::{MockClock, MockRadio, MockRandom, MockSensors};
//!
//! // The gateway node, at the deployment default root address.
//! let node = Node::new(
//!     MockRadio::new(),
//!     MockRandom::new(),
//!     MockClock::new(),
//!     MockSensors::new(),
//!     NodeAddr::new(1, 0),
//! );
//!
//! assert!(node.is_root());
//! assert!(node.is_connected());
//! assert_eq!(node.hops(), 0);
//!
//! // Any other address starts disconnected and must find a parent.
//! let mote = Node::new(
//!     MockRadio::new(),
//!     MockRandom::new(),
//!     MockClock::new(),
//!     MockSensors::new(),
//!     NodeAddr::new(2, 0),
//! );
//! assert!(!mote.is_connected());
//! ```
//!
//! # Example (integration pattern)
//!
//! ```text
//! // Implement Radio, Clock, Random, and Sensors for your platform, then:
//! //
//! // let mut node = Node::new(radio, random, clock, sensors, addr);
//! // spawn(async move { node.run().await });
//! //
//! // Feed button presses and console lines:
//! // node.commands().try_send(Command::ToggleMode);
//! //
//! // On the gateway, drain accepted readings:
//! // let record = node.sink().receive().await;
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types (NodeAddr, ChannelConfig, Reading, etc.)
//! - [`wire`] - Wire format serialization
//! - [`traits`] - Radio, Clock, Random, Sensors traits
//! - [`node`] - Main Node struct, run loop, and input dispatch
//! - [`tree`] - Spanning tree construction and maintenance
//! - [`config`] - Channel configuration dissemination
//! - [`data`] - Reading production, forwarding, and sink delivery
//! - [`dedup`] - Duplicate suppression ledger
//! - [`debug`] - Protocol trace events
//! - [`time`] - Timestamp and Duration types

#![no_std]

extern crate alloc;

pub mod config;
pub mod data;
pub mod debug;
pub mod dedup;
pub mod node;
pub mod time;
pub mod traits;
pub mod tree;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use dedup::{DedupLedger, Freshness};
pub use node::Node;
pub use time::{Duration, Timestamp};
pub use traits::{Clock, Outbound, Radio, Random, Received, Sensors};
pub use types::{
    ChannelConfig, ChannelId, ChannelSet, Command, Event, NodeAddr, Reading, SendMode, SinkRecord,
    Status,
};
pub use wire::{DecodeError, Message};

// Re-export constants
pub use types::{
    CONNECTED_BEACON_SECS, DATA_PERIOD_SECS, DEAD_MISSED_BEATS, DEFAULT_ROOT_ADDR,
    DISCONNECTED_BEACON_SECS, MAX_DEDUP_ENTRIES, PROBE_MISSED_BEATS,
};
