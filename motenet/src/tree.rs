//! Spanning tree construction and maintenance.
//!
//! Every node except the root tracks at most one parent. Discovery frames
//! solicit status announcements; status frames drive parent selection and
//! liveness; disconnection frames cut whole subtrees loose at once. The tree
//! converges toward fewer hops, with RSSI breaking ties.

use crate::debug::DebugEvent;
use crate::node::{Node, ParentLink};
use crate::traits::{Clock, Radio, Random, Sensors};
use crate::types::{
    ChannelConfig, Event, NodeAddr, Status, DEAD_MISSED_BEATS, PROBE_MISSED_BEATS,
};
use crate::wire::Message;

impl<R: Radio, Rn: Random, C: Clock, S: Sensors> Node<R, Rn, C, S> {
    /// Handle a discovery frame.
    ///
    /// Connected nodes answer with a unicast status so the asker can consider
    /// them as a parent. A disconnected node answers a unicast probe with a
    /// disconnection frame: the probe means a child still believes in us, and
    /// the reply tells it to stop.
    pub(crate) fn on_discovery(&mut self, from: NodeAddr, unicast: bool) {
        self.trace(DebugEvent::DiscoveryReceived { from, unicast });
        if self.is_connected() {
            let status = self.own_status();
            self.send_message(&Message::Status(status), Some(from));
        } else if unicast {
            self.send_message(&Message::Disconnection, Some(from));
        }
    }

    /// Handle a status announcement.
    pub(crate) fn on_status(&mut self, from: NodeAddr, rssi: i16, status: Status) {
        self.trace(DebugEvent::StatusReceived {
            from,
            hops: status.hops,
        });

        // A connected sender carrying a newer config version has a record we
        // lack; pull it before any topology decision.
        if status.config_version > self.config.version {
            self.trace(DebugEvent::ConfigRequested {
                from,
                version: status.config_version,
            });
            self.send_message(&Message::ConfigRequest, Some(from));
        }

        if self.is_root() {
            return;
        }

        // Never adopt a node that routes through us.
        if status.parent == self.addr {
            self.trace(DebugEvent::StatusRejectedCycle { from });
            return;
        }

        if self.parent_addr() == Some(from) {
            // Parent refresh: track its current distance and reset liveness.
            if let Some(link) = self.parent.as_mut() {
                link.hops = status.hops.saturating_add(1);
                link.rssi = rssi;
                link.missed_beats = 0;
            }
            self.trace(DebugEvent::ParentRefreshed { parent: from });
            return;
        }

        let candidate_hops = status.hops.saturating_add(1);
        let better = match self.parent {
            None => true,
            Some(link) => {
                candidate_hops < link.hops || (candidate_hops == link.hops && rssi > link.rssi)
            }
        };
        if better {
            self.adopt_parent(from, candidate_hops, rssi);
        }
    }

    /// Handle a disconnection frame. Only the parent's word matters; anyone
    /// else announcing disconnection is not on our route.
    pub(crate) fn on_disconnection(&mut self, from: NodeAddr) {
        let was_parent = self.parent_addr() == Some(from);
        self.trace(DebugEvent::DisconnectionReceived { from, was_parent });
        if was_parent {
            self.parent_lost();
        }
    }

    /// Periodic tree upkeep: rejoin attempts while disconnected, parent
    /// liveness and status announcement while connected.
    pub(crate) fn maintenance_tick(&mut self) {
        if !self.is_connected() {
            self.trace(DebugEvent::BeaconSent { connected: false });
            self.send_message(&Message::Discovery, None);
            return;
        }

        if !self.is_root() {
            if let Some(link) = self.parent {
                if link.missed_beats > DEAD_MISSED_BEATS {
                    self.parent_lost();
                    return;
                }
                if link.missed_beats > PROBE_MISSED_BEATS {
                    self.trace(DebugEvent::ParentProbed {
                        parent: link.addr,
                        missed_beats: link.missed_beats,
                    });
                    self.send_message(&Message::Discovery, Some(link.addr));
                }
            }
            if let Some(link) = self.parent.as_mut() {
                link.missed_beats = link.missed_beats.saturating_add(1);
            }
        }

        self.trace(DebugEvent::BeaconSent { connected: true });
        self.broadcast_status();
    }

    /// Switch to a new parent and announce the improved position at once, so
    /// downstream nodes can shorten their own routes without waiting a beacon.
    fn adopt_parent(&mut self, addr: NodeAddr, hops: u16, rssi: i16) {
        self.parent = Some(ParentLink {
            addr,
            hops,
            rssi,
            missed_beats: 0,
        });
        self.trace(DebugEvent::ParentAdopted { parent: addr, hops });
        self.emit(Event::Joined { parent: addr, hops });
        self.broadcast_status();
    }

    /// Tear down all route-derived state and tell the subtree immediately.
    /// Children react by tearing down too, cascading the cut to the leaves.
    pub(crate) fn parent_lost(&mut self) {
        if let Some(link) = self.parent.take() {
            self.trace(DebugEvent::ParentDeclaredLost { parent: link.addr });
        }
        // The held config came over the lost route; a future parent may be in
        // a partition with a different record, so start over from default.
        self.config = ChannelConfig::default();
        self.emit(Event::ParentLost);
        self.send_message(&Message::Disconnection, None);
    }

    pub(crate) fn own_status(&self) -> Status {
        match self.parent {
            Some(link) => Status {
                parent: link.addr,
                parent_rssi: link.rssi,
                hops: link.hops,
                config_version: self.config.version,
            },
            // The root (a disconnected node never calls this with effect).
            None => Status {
                parent: NodeAddr::NULL,
                parent_rssi: 0,
                hops: 0,
                config_version: self.config.version,
            },
        }
    }

    pub(crate) fn broadcast_status(&mut self) {
        let status = self.own_status();
        self.send_message(&Message::Status(status), None);
    }
}

#[cfg(test)]
mod tests {
    use crate::node::test_util::*;
    use crate::time::Timestamp;
    use crate::types::{NodeAddr, Status, DEFAULT_ROOT_ADDR};
    use crate::wire::Message;

    fn status(parent: NodeAddr, hops: u16) -> Message {
        Message::Status(Status {
            parent,
            parent_rssi: -60,
            hops,
            config_version: 0,
        })
    }

    fn root_status() -> Message {
        status(NodeAddr::NULL, 0)
    }

    #[test]
    fn test_disconnected_node_beacons_discovery() {
        let mut node = node_at(NodeAddr::new(2, 0));
        node.handle_timer(Timestamp::from_secs(10));
        assert_eq!(sent_messages(&node), alloc::vec![(Message::Discovery, None)]);
    }

    #[test]
    fn test_adopts_first_announcer() {
        let mut node = node_at(NodeAddr::new(2, 0));
        recv_broadcast(&mut node, DEFAULT_ROOT_ADDR, -70, root_status());

        assert!(node.is_connected());
        assert_eq!(node.parent_addr(), Some(DEFAULT_ROOT_ADDR));
        assert_eq!(node.hops(), 1);

        // Adoption announces the new position immediately.
        let sent = sent_messages(&node);
        assert_eq!(sent.len(), 1);
        match sent[0] {
            (Message::Status(s), None) => {
                assert_eq!(s.parent, DEFAULT_ROOT_ADDR);
                assert_eq!(s.hops, 1);
            }
            ref other => panic!("expected status broadcast, got {:?}", other),
        }
    }

    #[test]
    fn test_switches_to_fewer_hops() {
        let mut node = node_at(NodeAddr::new(5, 0));
        recv_broadcast(&mut node, NodeAddr::new(4, 0), -50, status(NodeAddr::new(3, 0), 3));
        assert_eq!(node.hops(), 4);

        recv_broadcast(&mut node, NodeAddr::new(2, 0), -90, status(DEFAULT_ROOT_ADDR, 1));
        assert_eq!(node.parent_addr(), Some(NodeAddr::new(2, 0)));
        assert_eq!(node.hops(), 2);
    }

    #[test]
    fn test_never_switches_to_more_hops() {
        let mut node = node_at(NodeAddr::new(5, 0));
        recv_broadcast(&mut node, NodeAddr::new(2, 0), -90, status(DEFAULT_ROOT_ADDR, 1));
        recv_broadcast(&mut node, NodeAddr::new(4, 0), -30, status(NodeAddr::new(3, 0), 3));
        assert_eq!(node.parent_addr(), Some(NodeAddr::new(2, 0)));
    }

    #[test]
    fn test_equal_hops_needs_strictly_better_rssi() {
        let mut node = node_at(NodeAddr::new(5, 0));
        recv_broadcast(&mut node, NodeAddr::new(2, 0), -70, status(DEFAULT_ROOT_ADDR, 1));

        // Same hops, same RSSI: keep the incumbent.
        recv_broadcast(&mut node, NodeAddr::new(3, 0), -70, status(DEFAULT_ROOT_ADDR, 1));
        assert_eq!(node.parent_addr(), Some(NodeAddr::new(2, 0)));

        // Same hops, better RSSI: switch.
        recv_broadcast(&mut node, NodeAddr::new(3, 0), -50, status(DEFAULT_ROOT_ADDR, 1));
        assert_eq!(node.parent_addr(), Some(NodeAddr::new(3, 0)));
    }

    #[test]
    fn test_identical_announcement_is_idempotent() {
        let mut node = node_at(NodeAddr::new(5, 0));
        recv_broadcast(&mut node, NodeAddr::new(2, 0), -70, status(DEFAULT_ROOT_ADDR, 1));
        assert_eq!(protocol_events(&node).len(), 1);
        sent_messages(&node);

        recv_broadcast(&mut node, NodeAddr::new(2, 0), -70, status(DEFAULT_ROOT_ADDR, 1));
        assert_eq!(node.parent_addr(), Some(NodeAddr::new(2, 0)));
        // A refresh, not a re-adoption: no new join event, no broadcast.
        assert!(protocol_events(&node).is_empty());
        assert!(sent_messages(&node).is_empty());
    }

    #[test]
    fn test_rejects_own_child_as_parent() {
        let mut node = node_at(NodeAddr::new(2, 0));
        force_parent(&mut node, DEFAULT_ROOT_ADDR, 1, -70);

        // A node claiming us as its parent would form a 2-cycle, even though
        // its hop count looks attractive after our own link degraded.
        recv_broadcast(&mut node, NodeAddr::new(3, 0), -10, status(NodeAddr::new(2, 0), 0));
        assert_eq!(node.parent_addr(), Some(DEFAULT_ROOT_ADDR));
    }

    #[test]
    fn test_root_ignores_status_for_topology() {
        let mut node = root_node();
        recv_broadcast(&mut node, NodeAddr::new(2, 0), -10, root_status());
        assert!(node.is_root());
        assert_eq!(node.parent_addr(), None);
        assert_eq!(node.hops(), 0);
    }

    #[test]
    fn test_parent_refresh_resets_liveness() {
        let mut node = node_at(NodeAddr::new(2, 0));
        recv_broadcast(&mut node, DEFAULT_ROOT_ADDR, -70, root_status());
        sent_messages(&node);

        // Two silent maintenance cycles push the counter to the probe range.
        node.maintenance_tick();
        node.maintenance_tick();
        node.maintenance_tick();
        assert!(sent_messages(&node)
            .iter()
            .any(|(m, dest)| *m == Message::Discovery && *dest == Some(DEFAULT_ROOT_ADDR)));

        // A fresh announcement clears the counter; next cycle does not probe.
        recv_broadcast(&mut node, DEFAULT_ROOT_ADDR, -70, root_status());
        sent_messages(&node);
        node.maintenance_tick();
        assert!(!sent_messages(&node)
            .iter()
            .any(|(m, _)| *m == Message::Discovery));
    }

    #[test]
    fn test_silent_parent_probed_then_dropped() {
        let mut node = node_at(NodeAddr::new(2, 0));
        recv_broadcast(&mut node, DEFAULT_ROOT_ADDR, -70, root_status());
        sent_messages(&node);

        // Cycle 1 and 2: counter at 0 then 1, no probe yet.
        node.maintenance_tick();
        node.maintenance_tick();
        assert!(!sent_messages(&node)
            .iter()
            .any(|(m, _)| *m == Message::Discovery));

        // Cycle 3: counter at 2, unicast probe.
        node.maintenance_tick();
        let sent = sent_messages(&node);
        assert!(sent.contains(&(Message::Discovery, Some(DEFAULT_ROOT_ADDR))));
        assert!(node.is_connected());

        // Cycle 4: counter at 3, parent declared dead.
        node.maintenance_tick();
        assert!(!node.is_connected());
        let sent = sent_messages(&node);
        assert!(sent.contains(&(Message::Disconnection, None)));
    }

    #[test]
    fn test_parent_disconnection_cascades() {
        let mut node = node_at(NodeAddr::new(3, 0));
        force_parent(&mut node, NodeAddr::new(2, 0), 2, -70);

        recv_broadcast(&mut node, NodeAddr::new(2, 0), -70, Message::Disconnection);
        assert!(!node.is_connected());
        // The cut is re-broadcast at once for our own children.
        assert!(sent_messages(&node).contains(&(Message::Disconnection, None)));
    }

    #[test]
    fn test_disconnection_from_non_parent_ignored() {
        let mut node = node_at(NodeAddr::new(3, 0));
        force_parent(&mut node, NodeAddr::new(2, 0), 2, -70);

        recv_broadcast(&mut node, NodeAddr::new(9, 0), -70, Message::Disconnection);
        assert!(node.is_connected());
        assert!(sent_messages(&node).is_empty());
    }

    #[test]
    fn test_connected_node_answers_discovery_with_unicast_status() {
        let mut node = root_node();
        recv_broadcast(&mut node, NodeAddr::new(2, 0), -60, Message::Discovery);

        let sent = sent_messages(&node);
        assert_eq!(sent.len(), 1);
        match sent[0] {
            (Message::Status(s), Some(dest)) => {
                assert_eq!(dest, NodeAddr::new(2, 0));
                assert_eq!(s.hops, 0);
                assert_eq!(s.parent, NodeAddr::NULL);
            }
            ref other => panic!("expected unicast status, got {:?}", other),
        }
    }

    #[test]
    fn test_disconnected_node_answers_probe_with_disconnection() {
        let mut node = node_at(NodeAddr::new(2, 0));

        // Broadcast discovery: stay silent, nothing to offer.
        recv_broadcast(&mut node, NodeAddr::new(3, 0), -60, Message::Discovery);
        assert!(sent_messages(&node).is_empty());

        // Unicast probe: the sender thinks we are its parent; correct it.
        recv_unicast(&mut node, NodeAddr::new(3, 0), -60, 1, Message::Discovery);
        assert_eq!(
            sent_messages(&node),
            alloc::vec![(Message::Disconnection, Some(NodeAddr::new(3, 0)))]
        );
    }

    #[test]
    fn test_connected_beacon_is_status_broadcast() {
        let mut node = node_at(NodeAddr::new(2, 0));
        recv_broadcast(&mut node, DEFAULT_ROOT_ADDR, -70, root_status());
        sent_messages(&node);

        node.maintenance_tick();
        let sent = sent_messages(&node);
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], (Message::Status(_), None)));
    }
}
