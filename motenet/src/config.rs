//! Versioned channel configuration dissemination.
//!
//! The root is the single writer: each console edit bumps the version and
//! floods the full record. Everyone else adopts strictly newer records and
//! re-floods them once; version ties and regressions are discarded, which
//! stops the flood. Nodes that learn of a newer version from a neighbor's
//! status pull the record with a unicast request instead of waiting for the
//! next flood to reach them.

use crate::debug::DebugEvent;
use crate::node::Node;
use crate::traits::{Clock, Radio, Random, Sensors};
use crate::types::{ChannelConfig, ChannelId, Event, NodeAddr};
use crate::wire::Message;

impl<R: Radio, Rn: Random, C: Clock, S: Sensors> Node<R, Rn, C, S> {
    /// Apply a root console edit: flip one channel's required flag, bump the
    /// version, flood. Callers have already verified this node is the root.
    pub(crate) fn ingest_command(&mut self, channel: ChannelId, required: bool) {
        self.config.required.set(channel, required);
        self.config.version += 1;
        self.emit(Event::ConfigChanged {
            version: self.config.version,
            required: self.config.required,
        });
        let config = self.config;
        self.send_message(&Message::Config(config), None);
    }

    /// Handle a configuration flood frame.
    pub(crate) fn on_config(&mut self, config: ChannelConfig) {
        if config.version <= self.config.version {
            self.trace(DebugEvent::ConfigIgnored {
                version: config.version,
                held: self.config.version,
            });
            return;
        }
        // Adopt the record wholesale; per-channel merging would let two
        // records at different versions mix.
        self.config = config;
        self.trace(DebugEvent::ConfigAdopted {
            version: config.version,
        });
        self.emit(Event::ConfigChanged {
            version: config.version,
            required: config.required,
        });
        self.send_message(&Message::Config(config), None);
    }

    /// Handle a unicast pull for the full configuration record.
    pub(crate) fn on_config_request(&mut self, from: NodeAddr) {
        let config = self.config;
        self.send_message(&Message::Config(config), Some(from));
    }
}
