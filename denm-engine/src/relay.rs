//! ## denm-engine::relay
//! **Roadside relay node**
//!
//! Forwards vehicle-originated DENMs unmodified to a geo-area circle around
//! its own fixed position. No relevance filtering. Frames that arrived on
//! the relay port are never forwarded again.

use bytes::Bytes;
use opentelemetry::KeyValue;
use tracing::{debug, info, instrument};

use denm_config::RelayConfig;
use denm_core::geo::{GeoArea, Position};
use denm_core::station::StationId;
use denm_protocols::{CauseCode, DataIndication, DenmParser, DENM_PORT};
use denm_telemetry::EventLogger;

use crate::context::TelemetrySinks;
use crate::disseminator::AlertDisseminator;
use crate::transport::{Origin, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayDecision {
    Forwarded(CauseCode),
    /// Not vehicle-originated.
    WrongPort,
    NotDenm,
    CauseFiltered(CauseCode),
}

pub struct RelayService {
    origin: Origin,
    config: RelayConfig,
    parser: DenmParser,
    disseminator: AlertDisseminator,
    telemetry: TelemetrySinks,
    forwarded: u64,
}

impl RelayService {
    pub fn new(
        station: StationId,
        position: Position,
        config: RelayConfig,
        telemetry: TelemetrySinks,
    ) -> Self {
        info!(
            station = %station,
            x = position.x,
            y = position.y,
            range_m = config.transmission_range_m,
            "Relay ready"
        );
        Self {
            origin: Origin { station, position },
            config,
            parser: DenmParser::new(),
            disseminator: AlertDisseminator::new(),
            telemetry,
            forwarded: 0,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Rebroadcast area: the transmission range around the relay.
    pub fn area(&self) -> GeoArea {
        GeoArea::circle(self.origin.position, self.config.transmission_range_m)
    }

    #[instrument(level = "debug", skip_all, fields(relay = %self.origin.station, source = %indication.source_station))]
    pub fn indicate(
        &mut self,
        indication: &DataIndication,
        payload: &Bytes,
        transport: &mut dyn Transport,
    ) -> RelayDecision {
        if indication.destination_port != DENM_PORT {
            return RelayDecision::WrongPort;
        }
        let cause = match self.parser.parse(payload) {
            Ok(alert) => alert.cause(),
            Err(err) => {
                debug!(error = %err, "Relay dropping non-DENM payload");
                return RelayDecision::NotDenm;
            }
        };
        if !self.config.causes.is_empty() && !self.config.causes.contains(&cause.as_u8()) {
            return RelayDecision::CauseFiltered(cause);
        }

        let area = self.area();
        let center = area.center_geo();
        self.disseminator
            .frame_area_broadcast(self.origin, payload.clone(), area, transport);
        self.forwarded += 1;
        self.telemetry
            .with_metrics(|m| m.inc_relayed(cause.family()));
        EventLogger::log_event(
            "alert_relayed",
            vec![
                KeyValue::new("family", cause.family()),
                KeyValue::new("relay", i64::from(self.origin.station.raw())),
                KeyValue::new("source", i64::from(indication.source_station.raw())),
                KeyValue::new("center_lat", center.latitude),
                KeyValue::new("center_lon", center.longitude),
                KeyValue::new("radius_m", self.config.transmission_range_m),
            ],
        );
        RelayDecision::Forwarded(cause)
    }
}
