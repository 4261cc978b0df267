//! ## denm-protocols::btp
//! Transport request/indication primitives exchanged with the external
//! geographic broadcast layer. Delivery is best effort: a request is handed
//! over and forgotten.

use denm_core::geo::{GeoArea, Position};
use denm_core::station::StationId;

/// Destination port vehicles send DENMs on.
pub const DENM_PORT: u16 = 2002;
/// Destination port relays rebroadcast on.
pub const RELAY_PORT: u16 = 2003;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// Single-hop broadcast, no destination area.
    SingleHopBroadcast,
    /// Geo-area broadcast to every station inside the destination area.
    GeoAreaBroadcast,
}

/// Traffic class (DCC profile) of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficClass(pub u8);

impl TrafficClass {
    /// DP2, the profile used for event-triggered DENMs.
    pub const DP2: TrafficClass = TrafficClass(2);
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub destination_port: u16,
    pub transport_type: TransportType,
    pub traffic_class: TrafficClass,
    pub destination: Option<GeoArea>,
}

impl DataRequest {
    pub fn single_hop(destination_port: u16) -> Self {
        Self {
            destination_port,
            transport_type: TransportType::SingleHopBroadcast,
            traffic_class: TrafficClass::DP2,
            destination: None,
        }
    }

    pub fn geo_area(destination_port: u16, area: GeoArea) -> Self {
        Self {
            destination_port,
            transport_type: TransportType::GeoAreaBroadcast,
            traffic_class: TrafficClass::DP2,
            destination: Some(area),
        }
    }
}

/// Metadata accompanying an inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataIndication {
    pub destination_port: u16,
    pub transport_type: TransportType,
    pub source_station: StationId,
    pub source_position: Position,
}
