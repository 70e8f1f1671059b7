//! Sensor data production, hop-by-hop forwarding, and root-side delivery.
//!
//! Readings always travel as unicast frames toward the root, one hop at a
//! time. Intermediate nodes relay without looking inside; only the root
//! interprets the reading, filters it against the latest required set, and
//! hands it to the sink.

use crate::debug::DebugEvent;
use crate::node::Node;
use crate::traits::{Clock, Radio, Random, Sensors};
use crate::types::{ChannelId, Reading, SendMode, SinkRecord};
use crate::wire::Message;

impl<R: Radio, Rn: Random, C: Clock, S: Sensors> Node<R, Rn, C, S> {
    /// Sample every required channel once and dispatch the values.
    ///
    /// Callers have already verified the node is connected; a disconnected
    /// mote has nowhere to send and skips the cycle entirely.
    pub(crate) fn produce_readings(&mut self) {
        for channel in ChannelId::ALL {
            if !self.config.required.contains(channel) {
                continue;
            }
            let value = self.sensors.sample(channel);
            if self.send_mode == SendMode::OnChange
                && self.history.get(&channel) == Some(&value)
            {
                continue;
            }
            self.history.insert(channel, value);
            self.trace(DebugEvent::ReadingProduced { channel, value });
            let reading = Reading {
                channel,
                origin: self.addr,
                value,
            };
            self.dispatch_reading(reading);
        }
    }

    /// Handle a data frame from downstream.
    pub(crate) fn on_data(&mut self, reading: Reading) {
        if self.is_root() {
            self.deliver_to_sink(reading);
        } else if self.is_connected() {
            self.trace(DebugEvent::ReadingForwarded {
                origin: reading.origin,
                channel: reading.channel,
            });
            self.dispatch_reading(reading);
        } else {
            // No route while rejoining; the origin keeps producing and later
            // readings will make it through.
            self.trace(DebugEvent::ReadingDropped {
                origin: reading.origin,
                channel: reading.channel,
            });
        }
    }

    /// Move a reading one hop closer to the sink.
    fn dispatch_reading(&mut self, reading: Reading) {
        if self.is_root() {
            self.deliver_to_sink(reading);
        } else if let Some(parent) = self.parent_addr() {
            self.send_message(&Message::Data(reading), Some(parent));
        } else {
            self.trace(DebugEvent::ReadingDropped {
                origin: reading.origin,
                channel: reading.channel,
            });
        }
    }

    /// Root-side delivery: filter against the latest required set. A reading
    /// produced under an older configuration may still be in flight when the
    /// set shrinks; the sink never sees it.
    fn deliver_to_sink(&mut self, reading: Reading) {
        if !self.config.required.contains(reading.channel) {
            self.trace(DebugEvent::ReadingFiltered {
                origin: reading.origin,
                channel: reading.channel,
            });
            return;
        }
        self.deliver_sink_record(SinkRecord {
            origin: reading.origin,
            channel: reading.channel,
            value: reading.value,
        });
    }
}
