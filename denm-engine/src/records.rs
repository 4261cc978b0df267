//! CSV rows written by alert services.
//!
//! Receivers share a common prefix (`Time,VehicleID,Speed,AlertReceived,
//! AlertType,SenderID`) followed by family-specific columns and `Action`.
//! Missing values print as `N/A`.

use std::path::Path;

use serde::Serialize;

use denm_core::station::StationId;
use denm_protocols::{Alert, AlertPayload, CauseCode};
use denm_reaction::ReactionAction;
use denm_telemetry::{
    serialize_display_or_na, serialize_fixed3, serialize_fixed3_or_na, CsvRecorder,
    TelemetryError,
};

/// One receiver observation, family agnostic.
#[derive(Debug, Clone)]
pub struct ReceiverRecord {
    pub time: f64,
    pub vehicle_id: String,
    pub speed: f64,
    pub alert: Option<Alert>,
    pub distance: Option<f64>,
    pub action: ReactionAction,
}

impl ReceiverRecord {
    fn received(&self) -> &'static str {
        if self.alert.is_some() {
            "Yes"
        } else {
            "No"
        }
    }

    fn alert_type(&self) -> Option<&'static str> {
        self.alert.as_ref().map(|alert| alert.severity.label())
    }

    fn sender(&self) -> Option<StationId> {
        self.alert.as_ref().map(|alert| alert.station_id)
    }

    fn payload(&self) -> Option<&AlertPayload> {
        self.alert.as_ref().map(|alert| &alert.payload)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollisionReceiverRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Speed", serialize_with = "serialize_fixed3")]
    pub speed: f64,
    #[serde(rename = "AlertReceived")]
    pub alert_received: &'static str,
    #[serde(rename = "AlertType", serialize_with = "serialize_display_or_na")]
    pub alert_type: Option<&'static str>,
    #[serde(rename = "SenderID", serialize_with = "serialize_display_or_na")]
    pub sender_id: Option<StationId>,
    #[serde(rename = "TTC", serialize_with = "serialize_fixed3_or_na")]
    pub ttc: Option<f64>,
    #[serde(rename = "Distance", serialize_with = "serialize_fixed3_or_na")]
    pub distance: Option<f64>,
    #[serde(rename = "Action")]
    pub action: &'static str,
}

impl From<ReceiverRecord> for CollisionReceiverRow {
    fn from(record: ReceiverRecord) -> Self {
        let ttc = match record.payload() {
            Some(AlertPayload::Collision { time_to_collision }) => Some(*time_to_collision),
            _ => None,
        };
        Self {
            alert_received: record.received(),
            alert_type: record.alert_type(),
            sender_id: record.sender(),
            ttc,
            distance: record.distance,
            action: record.action.label(),
            time: record.time,
            speed: record.speed,
            vehicle_id: record.vehicle_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DrowsinessReceiverRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Speed", serialize_with = "serialize_fixed3")]
    pub speed: f64,
    #[serde(rename = "AlertReceived")]
    pub alert_received: &'static str,
    #[serde(rename = "AlertType", serialize_with = "serialize_display_or_na")]
    pub alert_type: Option<&'static str>,
    #[serde(rename = "SenderID", serialize_with = "serialize_display_or_na")]
    pub sender_id: Option<StationId>,
    #[serde(rename = "DrowsinessLevel", serialize_with = "serialize_fixed3_or_na")]
    pub drowsiness_level: Option<f64>,
    #[serde(rename = "ReactionTime", serialize_with = "serialize_fixed3_or_na")]
    pub reaction_time: Option<f64>,
    #[serde(rename = "Distance", serialize_with = "serialize_fixed3_or_na")]
    pub distance: Option<f64>,
    #[serde(rename = "Action")]
    pub action: &'static str,
}

impl From<ReceiverRecord> for DrowsinessReceiverRow {
    fn from(record: ReceiverRecord) -> Self {
        let (drowsiness_level, reaction_time) = match record.payload() {
            Some(AlertPayload::Drowsiness {
                drowsiness_level,
                reaction_time,
            }) => (Some(*drowsiness_level), Some(*reaction_time)),
            _ => (None, None),
        };
        Self {
            alert_received: record.received(),
            alert_type: record.alert_type(),
            sender_id: record.sender(),
            drowsiness_level,
            reaction_time,
            distance: record.distance,
            action: record.action.label(),
            time: record.time,
            speed: record.speed,
            vehicle_id: record.vehicle_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LaneChangeReceiverRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Speed", serialize_with = "serialize_fixed3")]
    pub speed: f64,
    #[serde(rename = "AlertReceived")]
    pub alert_received: &'static str,
    #[serde(rename = "AlertType", serialize_with = "serialize_display_or_na")]
    pub alert_type: Option<&'static str>,
    #[serde(rename = "SenderID", serialize_with = "serialize_display_or_na")]
    pub sender_id: Option<StationId>,
    #[serde(rename = "Risk", serialize_with = "serialize_fixed3_or_na")]
    pub risk: Option<f64>,
    #[serde(rename = "CurrentLane", serialize_with = "serialize_display_or_na")]
    pub current_lane: Option<u8>,
    #[serde(rename = "TargetLane", serialize_with = "serialize_display_or_na")]
    pub target_lane: Option<u8>,
    #[serde(rename = "Action")]
    pub action: &'static str,
}

impl From<ReceiverRecord> for LaneChangeReceiverRow {
    fn from(record: ReceiverRecord) -> Self {
        let (risk, current_lane, target_lane) = match record.payload() {
            Some(AlertPayload::LaneChange {
                current_lane,
                target_lane,
                risk_score,
                ..
            }) => (Some(*risk_score), Some(*current_lane), Some(*target_lane)),
            _ => (None, None, None),
        };
        Self {
            alert_received: record.received(),
            alert_type: record.alert_type(),
            sender_id: record.sender(),
            risk,
            current_lane,
            target_lane,
            action: record.action.label(),
            time: record.time,
            speed: record.speed,
            vehicle_id: record.vehicle_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeedReceiverRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Speed", serialize_with = "serialize_fixed3")]
    pub speed: f64,
    #[serde(rename = "AlertReceived")]
    pub alert_received: &'static str,
    #[serde(rename = "AlertType", serialize_with = "serialize_display_or_na")]
    pub alert_type: Option<&'static str>,
    #[serde(rename = "SenderID", serialize_with = "serialize_display_or_na")]
    pub sender_id: Option<StationId>,
    #[serde(rename = "OffenderID", serialize_with = "serialize_display_or_na")]
    pub offender_id: Option<StationId>,
    #[serde(rename = "CurrentSpeed", serialize_with = "serialize_fixed3_or_na")]
    pub current_speed: Option<f64>,
    #[serde(rename = "SpeedLimit", serialize_with = "serialize_fixed3_or_na")]
    pub speed_limit: Option<f64>,
    #[serde(rename = "Distance", serialize_with = "serialize_fixed3_or_na")]
    pub distance: Option<f64>,
    #[serde(rename = "Action")]
    pub action: &'static str,
}

impl From<ReceiverRecord> for SpeedReceiverRow {
    fn from(record: ReceiverRecord) -> Self {
        let (offender_id, current_speed, speed_limit) = match record.payload() {
            Some(AlertPayload::Speed {
                offending_vehicle,
                current_speed,
                speed_limit,
            }) => (
                Some(*offending_vehicle),
                Some(*current_speed),
                Some(*speed_limit),
            ),
            _ => (None, None, None),
        };
        Self {
            alert_received: record.received(),
            alert_type: record.alert_type(),
            sender_id: record.sender(),
            offender_id,
            current_speed,
            speed_limit,
            distance: record.distance,
            action: record.action.label(),
            time: record.time,
            speed: record.speed,
            vehicle_id: record.vehicle_id,
        }
    }
}

/// Receiver-side CSV output, erased over the family row type.
pub trait ReceiverSink {
    fn row_write(&mut self, record: ReceiverRecord) -> Result<(), TelemetryError>;

    fn path(&self) -> &Path;
}

impl<R> ReceiverSink for CsvRecorder<R>
where
    R: Serialize + From<ReceiverRecord>,
{
    fn row_write(&mut self, record: ReceiverRecord) -> Result<(), TelemetryError> {
        self.record_append(&R::from(record))
    }

    fn path(&self) -> &Path {
        CsvRecorder::path(self)
    }
}

/// Open the receiver CSV for `cause` as `<family>_receiver_<vehicle>.csv`.
pub fn receiver_sink_create(
    cause: CauseCode,
    dir: &Path,
    vehicle_id: &str,
) -> Result<Box<dyn ReceiverSink>, TelemetryError> {
    let file_name = format!("{}_receiver_{}.csv", cause.family(), vehicle_id);
    Ok(match cause {
        CauseCode::Collision => Box::new(CsvRecorder::<CollisionReceiverRow>::create(
            dir, &file_name,
        )?),
        CauseCode::AnomalousDriving => Box::new(CsvRecorder::<DrowsinessReceiverRow>::create(
            dir, &file_name,
        )?),
        CauseCode::DangerousLaneChange => Box::new(
            CsvRecorder::<LaneChangeReceiverRow>::create(dir, &file_name)?,
        ),
        CauseCode::SpeedViolation => {
            Box::new(CsvRecorder::<SpeedReceiverRow>::create(dir, &file_name)?)
        }
    })
}

/// Sender-side observation: one per resolved object per tick.
#[derive(Debug, Clone)]
pub struct SenderRecord {
    pub time: f64,
    pub vehicle_id: String,
    pub speed: f64,
    pub object_id: String,
    pub distance: f64,
    pub metric: f64,
    pub sub_cause: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollisionSenderRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Speed", serialize_with = "serialize_fixed3")]
    pub speed: f64,
    #[serde(rename = "ObjectID")]
    pub object_id: String,
    #[serde(rename = "Distance", serialize_with = "serialize_fixed3")]
    pub distance: f64,
    #[serde(rename = "TTC", serialize_with = "serialize_fixed3")]
    pub ttc: f64,
    #[serde(rename = "SubCauseCode")]
    pub sub_cause: u8,
}

/// `metric` is the TTC for collision senders.
impl From<SenderRecord> for CollisionSenderRow {
    fn from(r: SenderRecord) -> Self {
        Self {
            time: r.time,
            vehicle_id: r.vehicle_id,
            speed: r.speed,
            object_id: r.object_id,
            distance: r.distance,
            ttc: r.metric,
            sub_cause: r.sub_cause,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LaneChangeSenderRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Speed", serialize_with = "serialize_fixed3")]
    pub speed: f64,
    #[serde(rename = "ObjectID")]
    pub object_id: String,
    #[serde(rename = "Distance", serialize_with = "serialize_fixed3")]
    pub distance: f64,
    #[serde(rename = "Risk", serialize_with = "serialize_fixed3")]
    pub risk: f64,
    #[serde(rename = "SubCauseCode")]
    pub sub_cause: u8,
}

/// `metric` is the composite risk for lane-change senders.
impl From<SenderRecord> for LaneChangeSenderRow {
    fn from(r: SenderRecord) -> Self {
        Self {
            time: r.time,
            vehicle_id: r.vehicle_id,
            speed: r.speed,
            object_id: r.object_id,
            distance: r.distance,
            risk: r.metric,
            sub_cause: r.sub_cause,
        }
    }
}

/// Speed-monitor detections, one per announced violation.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedViolationRow {
    #[serde(rename = "Time", serialize_with = "serialize_fixed3")]
    pub time: f64,
    #[serde(rename = "SenderID")]
    pub sender_id: String,
    #[serde(rename = "OffenderID")]
    pub offender_id: String,
    #[serde(rename = "OffenderStationID")]
    pub offender_station: StationId,
    #[serde(rename = "DetectedSpeed", serialize_with = "serialize_fixed3")]
    pub detected_speed: f64,
    #[serde(rename = "PosX", serialize_with = "serialize_fixed3")]
    pub pos_x: f64,
    #[serde(rename = "PosY", serialize_with = "serialize_fixed3")]
    pub pos_y: f64,
    #[serde(rename = "ViolationType")]
    pub violation: &'static str,
}
