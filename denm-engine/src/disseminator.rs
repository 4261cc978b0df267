//! ## denm-engine::disseminator
//! **Transmission policy for outgoing alerts**
//!
//! Vehicles announce with a single-hop broadcast on the DENM port. Relays
//! rebroadcast unmodified frames to a geo-area circle on the relay port.

use bytes::Bytes;
use tracing::debug;

use denm_core::geo::GeoArea;
use denm_protocols::{Alert, DataRequest, DenmEncoder, DENM_PORT, RELAY_PORT};

use crate::transport::{Origin, Transport};

#[derive(Default, Debug, Clone, Copy)]
pub struct AlertDisseminator {
    encoder: DenmEncoder,
}

impl AlertDisseminator {
    pub fn new() -> Self {
        Self {
            encoder: DenmEncoder::new(),
        }
    }

    /// Encode and hand over as a single-hop broadcast.
    pub fn alert_broadcast(&self, origin: Origin, alert: &Alert, transport: &mut dyn Transport) {
        let frame = self.encoder.encode(alert);
        debug!(
            station = %origin.station,
            cause = alert.cause().as_u8(),
            sub_cause = alert.severity.as_u8(),
            bytes = frame.len(),
            "SHB request"
        );
        transport.data_request(origin, DataRequest::single_hop(DENM_PORT), frame);
    }

    /// Hand an already encoded frame over as a geo-area broadcast.
    pub fn frame_area_broadcast(
        &self,
        origin: Origin,
        frame: Bytes,
        area: GeoArea,
        transport: &mut dyn Transport,
    ) {
        debug!(station = %origin.station, area = ?area, bytes = frame.len(), "GBC request");
        transport.data_request(origin, DataRequest::geo_area(RELAY_PORT, area), frame);
    }
}
