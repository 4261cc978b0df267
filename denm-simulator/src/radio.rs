//! ## denm-simulator::radio
//! **Shared broadcast medium between every station of a run**
//!
//! Requests handed over during a tick are collected in an outbox. At the end
//! of the tick they are fanned out to the stations in reach, passed through
//! the link model and parked on the bounded event bus until due.
//!
//! Reach:
//! - single-hop: within `radio_range_m` of the sender
//! - geo-area: inside the destination area
//!
//! A station never hears its own transmission.

use std::time::Duration;

use blake3::Hasher;
use bytes::Bytes;
use tracing::{trace, warn};

use denm_core::events::{EventBus, EventError, TimedEvent};
use denm_core::geo::Position;
use denm_core::station::StationId;
use denm_engine::{Origin, Transport};
use denm_protocols::{DataIndication, DataRequest, TransportType};

use crate::network_simulation::LinkModel;

/// A station the medium can deliver to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioNode {
    pub station: StationId,
    pub position: Position,
}

/// Frame waiting on the bus for its receiver.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub receiver: StationId,
    pub indication: DataIndication,
    pub payload: Bytes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioStats {
    pub transmitted: u64,
    pub delivered: u64,
    pub lost: u64,
    /// Deliveries refused because the bus was full.
    pub overflow: u64,
}

struct Transmission {
    origin: Origin,
    request: DataRequest,
    payload: Bytes,
}

pub struct RadioMedium {
    outbox: Vec<Transmission>,
    in_flight: EventBus<TimedEvent<Delivery>>,
    link: LinkModel,
    radio_range_m: f64,
    stats: RadioStats,
}

impl RadioMedium {
    pub fn new(link: LinkModel, radio_range_m: f64, capacity: usize) -> Self {
        Self {
            outbox: Vec::new(),
            in_flight: EventBus::with_capacity(capacity),
            link,
            radio_range_m,
            stats: RadioStats::default(),
        }
    }

    pub fn stats(&self) -> RadioStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn in_reach(&self, transmission: &Transmission, node: &RadioNode) -> bool {
        match transmission.request.transport_type {
            TransportType::SingleHopBroadcast => {
                transmission.origin.position.distance_to(&node.position) <= self.radio_range_m
            }
            TransportType::GeoAreaBroadcast => transmission
                .request
                .destination
                .is_some_and(|area| area.contains(&node.position)),
        }
    }

    /// Fan the outbox out to `nodes`. Every delivery decision is folded into
    /// `digest` so lost frames also change the run fingerprint.
    pub fn propagate(&mut self, now_ns: u64, nodes: &[RadioNode], digest: &mut Hasher) {
        let outbox = std::mem::take(&mut self.outbox);
        for transmission in outbox {
            self.stats.transmitted += 1;
            for node in nodes {
                if node.station == transmission.origin.station || !self.in_reach(&transmission, node)
                {
                    continue;
                }
                digest.update(&node.station.raw().to_le_bytes());
                digest.update(&transmission.origin.station.raw().to_le_bytes());

                let Some(delay) = self.link.delivery_delay() else {
                    digest.update(b"LOST");
                    self.stats.lost += 1;
                    continue;
                };
                let due_ns = now_ns.saturating_add(duration_ns(delay));
                digest.update(&due_ns.to_le_bytes());

                let delivery = Delivery {
                    receiver: node.station,
                    indication: DataIndication {
                        destination_port: transmission.request.destination_port,
                        transport_type: transmission.request.transport_type,
                        source_station: transmission.origin.station,
                        source_position: transmission.origin.position,
                    },
                    payload: transmission.payload.clone(),
                };
                if let Err(EventError::QueueFull) = self.in_flight.event_enqueue(TimedEvent {
                    due_ns,
                    event: delivery,
                }) {
                    warn!(
                        receiver = %node.station,
                        capacity = self.in_flight.capacity(),
                        "Radio queue full, delivery dropped"
                    );
                    digest.update(b"OVERFLOW");
                    self.stats.overflow += 1;
                }
            }
        }
    }

    /// Deliveries due at `now_ns`, in transmission order. The rest stay
    /// queued.
    pub fn due(&mut self, now_ns: u64) -> Vec<Delivery> {
        let mut due = Vec::new();
        for timed in self.in_flight.event_drain() {
            if timed.due_ns <= now_ns {
                due.push(timed.event);
            } else if self.in_flight.event_enqueue(timed).is_err() {
                // Re-queueing never exceeds what was just drained.
                self.stats.overflow += 1;
            }
        }
        self.stats.delivered += due.len() as u64;
        trace!(now_ns, delivered = due.len(), pending = self.in_flight.len(), "Radio tick");
        due
    }
}

impl Transport for RadioMedium {
    fn data_request(&mut self, origin: Origin, request: DataRequest, payload: Bytes) {
        self.outbox.push(Transmission {
            origin,
            request,
            payload,
        });
    }
}

fn duration_ns(delay: Duration) -> u64 {
    u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use denm_config::NetworkModelConfig;
    use denm_core::geo::GeoArea;
    use denm_protocols::{DENM_PORT, RELAY_PORT};

    fn node(station: u32, x: f64) -> RadioNode {
        RadioNode {
            station: StationId(station),
            position: Position::new(x, 0.0),
        }
    }

    fn origin(station: u32, x: f64) -> Origin {
        Origin {
            station: StationId(station),
            position: Position::new(x, 0.0),
        }
    }

    fn receivers(deliveries: &[Delivery]) -> Vec<u32> {
        deliveries.iter().map(|d| d.receiver.raw()).collect()
    }

    #[test]
    fn single_hop_respects_range_and_skips_sender() {
        let mut medium = RadioMedium::new(LinkModel::ideal(), 500.0, 64);
        let nodes = [node(1, 0.0), node(2, 499.0), node(3, 501.0)];
        medium.data_request(
            origin(1, 0.0),
            DataRequest::single_hop(DENM_PORT),
            Bytes::from_static(b"frame"),
        );
        medium.propagate(0, &nodes, &mut Hasher::new());

        let due = medium.due(0);
        assert_eq!(receivers(&due), vec![2]);
        assert_eq!(due[0].indication.source_station, StationId(1));
        assert_eq!(due[0].indication.destination_port, DENM_PORT);
        assert_eq!(due[0].payload, Bytes::from_static(b"frame"));
    }

    #[test]
    fn geo_area_reaches_everyone_inside() {
        let mut medium = RadioMedium::new(LinkModel::ideal(), 500.0, 64);
        // Node 3 sits exactly on the boundary, node 4 just past it.
        let nodes = [
            node(1, 0.0),
            node(2, 900.0),
            node(3, 1300.0),
            node(4, 1300.5),
            node(500, 300.0),
        ];
        let area = GeoArea::circle(Position::new(300.0, 0.0), 1000.0);
        medium.data_request(
            origin(500, 300.0),
            DataRequest::geo_area(RELAY_PORT, area),
            Bytes::from_static(b"frame"),
        );
        medium.propagate(0, &nodes, &mut Hasher::new());
        assert_eq!(receivers(&medium.due(0)), vec![1, 2, 3]);
    }

    #[test]
    fn latency_holds_frames_until_due() {
        let config = NetworkModelConfig {
            latency_ms: 150,
            ..NetworkModelConfig::default()
        };
        let link = LinkModel::from_config(&config, 1).unwrap();
        let mut medium = RadioMedium::new(link, 500.0, 64);
        medium.data_request(
            origin(1, 0.0),
            DataRequest::single_hop(DENM_PORT),
            Bytes::from_static(b"frame"),
        );
        medium.propagate(0, &[node(1, 0.0), node(2, 10.0)], &mut Hasher::new());

        assert!(medium.due(100_000_000).is_empty());
        assert_eq!(medium.in_flight(), 1);
        assert_eq!(receivers(&medium.due(200_000_000)), vec![2]);
        assert_eq!(medium.stats().delivered, 1);
    }

    #[test]
    fn losses_are_counted() {
        let config = NetworkModelConfig {
            packet_loss: 1.0,
            ..NetworkModelConfig::default()
        };
        let link = LinkModel::from_config(&config, 1).unwrap();
        let mut medium = RadioMedium::new(link, 500.0, 64);
        medium.data_request(
            origin(1, 0.0),
            DataRequest::single_hop(DENM_PORT),
            Bytes::from_static(b"frame"),
        );
        medium.propagate(0, &[node(1, 0.0), node(2, 10.0), node(3, 20.0)], &mut Hasher::new());
        assert!(medium.due(0).is_empty());
        assert_eq!(
            medium.stats(),
            RadioStats {
                transmitted: 1,
                delivered: 0,
                lost: 2,
                overflow: 0
            }
        );
    }

    #[test]
    fn full_bus_drops_excess() {
        let mut medium = RadioMedium::new(LinkModel::ideal(), 500.0, 1);
        medium.data_request(
            origin(1, 0.0),
            DataRequest::single_hop(DENM_PORT),
            Bytes::from_static(b"frame"),
        );
        medium.propagate(0, &[node(1, 0.0), node(2, 10.0), node(3, 20.0)], &mut Hasher::new());
        assert_eq!(medium.stats().overflow, 1);
        assert_eq!(medium.due(0).len(), 1);
    }
}
