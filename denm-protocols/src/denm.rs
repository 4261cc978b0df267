//! ## denm-protocols::denm
//! Fixed-offset DENM codec.
//!
//! Frame layout (big endian):
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 1    | protocol version (1)           |
//! | 1      | 1    | message id (1 = DENM)          |
//! | 2      | 1    | cause code                     |
//! | 3      | 1    | sub-cause code (severity)      |
//! | 4      | 4    | originating station id         |
//! | 8      | 8    | detection time (s)             |
//! | 16     | 8    | reference time (s)             |
//! | 24     | 1    | termination flag               |
//! | 25     | 1    | information quality            |
//! | 26     | 2    | reserved                       |
//! | 28     | 16   | event position x, y (m)        |
//! | 44     | 4    | event speed (m/s, f32)         |
//! | 48     | 4    | event heading (deg, f32)       |
//! | 52     | ..   | cause-specific payload         |
//!
//! Collision frames are padded to 64 bytes, every other family to 128.
//! Event speed and heading are narrowed to `f32` to keep the collision
//! frame at 64 bytes, so a parsed alert carries them rounded to single
//! precision. Every other field survives a round trip exactly.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use denm_core::geo::Position;
use denm_core::station::StationId;

pub const PROTOCOL_VERSION: u8 = 1;
pub const MESSAGE_ID_DENM: u8 = 1;
pub const DEFAULT_INFORMATION_QUALITY: u8 = 7;
pub const HEADER_LEN: usize = 52;

const FLAG_EMERGENCY_VEHICLE: u8 = 0b0000_0001;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum DenmParseError {
    #[error("Insufficient data to parse DENM: need {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
    #[error("Unsupported protocol version {0}")]
    InvalidVersion(u8),
    #[error("Not a DENM (message id {0})")]
    NotDenm(u8),
    #[error("Unknown cause code {0}")]
    UnknownCauseCode(u8),
    #[error("Invalid sub-cause code {0}")]
    InvalidSeverity(u8),
    #[error("Invalid hex frame: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Hazard class carried in the cause code field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CauseCode {
    AnomalousDriving = 91,
    SpeedViolation = 94,
    Collision = 97,
    DangerousLaneChange = 98,
}

impl CauseCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Family label used in logs and metrics.
    pub fn family(self) -> &'static str {
        match self {
            CauseCode::AnomalousDriving => "drowsiness",
            CauseCode::SpeedViolation => "speed",
            CauseCode::Collision => "collision",
            CauseCode::DangerousLaneChange => "lane_change",
        }
    }

    /// Encoded frame length for this family.
    pub fn frame_len(self) -> usize {
        match self {
            CauseCode::Collision => 64,
            _ => 128,
        }
    }
}

impl TryFrom<u8> for CauseCode {
    type Error = DenmParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            91 => Ok(CauseCode::AnomalousDriving),
            94 => Ok(CauseCode::SpeedViolation),
            97 => Ok(CauseCode::Collision),
            98 => Ok(CauseCode::DangerousLaneChange),
            other => Err(DenmParseError::UnknownCauseCode(other)),
        }
    }
}

/// Sub-cause severity. `None` means no alert is warranted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    None = 0,
    Warning = 1,
    Critical = 2,
}

impl Severity {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::None => "Info",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = DenmParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Severity::None),
            1 => Ok(Severity::Warning),
            2 => Ok(Severity::Critical),
            other => Err(DenmParseError::InvalidSeverity(other)),
        }
    }
}

/// Cause-specific part of an alert. The variant determines the cause code.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertPayload {
    Collision {
        time_to_collision: f64,
    },
    Drowsiness {
        drowsiness_level: f64,
        reaction_time: f64,
    },
    LaneChange {
        current_lane: u8,
        target_lane: u8,
        risk_score: f64,
        lateral_speed: f64,
        is_emergency_vehicle: bool,
    },
    Speed {
        offending_vehicle: StationId,
        current_speed: f64,
        speed_limit: f64,
    },
}

impl AlertPayload {
    pub fn cause(&self) -> CauseCode {
        match self {
            AlertPayload::Collision { .. } => CauseCode::Collision,
            AlertPayload::Drowsiness { .. } => CauseCode::AnomalousDriving,
            AlertPayload::LaneChange { .. } => CauseCode::DangerousLaneChange,
            AlertPayload::Speed { .. } => CauseCode::SpeedViolation,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            AlertPayload::Collision { .. } => 8,
            AlertPayload::Drowsiness { .. } => 16,
            AlertPayload::LaneChange { .. } => 20,
            AlertPayload::Speed { .. } => 24,
        }
    }
}

/// Decoded DENM. Immutable once sent; receivers clone it for retention.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub protocol_version: u8,
    pub station_id: StationId,
    pub detection_time: f64,
    pub reference_time: f64,
    pub termination: bool,
    pub information_quality: u8,
    pub severity: Severity,
    pub event_position: Position,
    /// Single precision on the air.
    pub event_speed: f64,
    /// Single precision on the air.
    pub event_heading: f64,
    pub payload: AlertPayload,
}

impl Alert {
    /// New alert detected and referenced at `time`, with default header fields.
    pub fn new(
        station_id: StationId,
        time: f64,
        severity: Severity,
        event_position: Position,
        event_speed: f64,
        event_heading: f64,
        payload: AlertPayload,
    ) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            station_id,
            detection_time: time,
            reference_time: time,
            termination: false,
            information_quality: DEFAULT_INFORMATION_QUALITY,
            severity,
            event_position,
            event_speed,
            event_heading,
            payload,
        }
    }

    pub fn cause(&self) -> CauseCode {
        self.payload.cause()
    }

    /// Station the alert is about: the offender for speed violations,
    /// the sender otherwise.
    pub fn offender(&self) -> StationId {
        match self.payload {
            AlertPayload::Speed {
                offending_vehicle, ..
            } => offending_vehicle,
            _ => self.station_id,
        }
    }
}

#[derive(Default, Debug, Copy, Clone)]
pub struct DenmEncoder;

impl DenmEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, alert: &Alert) -> Bytes {
        let cause = alert.cause();
        let mut buf = BytesMut::with_capacity(cause.frame_len());

        buf.put_u8(alert.protocol_version);
        buf.put_u8(MESSAGE_ID_DENM);
        buf.put_u8(cause.as_u8());
        buf.put_u8(alert.severity.as_u8());
        buf.put_u32(alert.station_id.raw());
        buf.put_f64(alert.detection_time);
        buf.put_f64(alert.reference_time);
        buf.put_u8(u8::from(alert.termination));
        buf.put_u8(alert.information_quality);
        buf.put_u16(0);
        buf.put_f64(alert.event_position.x);
        buf.put_f64(alert.event_position.y);
        buf.put_f32(alert.event_speed as f32);
        buf.put_f32(alert.event_heading as f32);

        match &alert.payload {
            AlertPayload::Collision { time_to_collision } => {
                buf.put_f64(*time_to_collision);
            }
            AlertPayload::Drowsiness {
                drowsiness_level,
                reaction_time,
            } => {
                buf.put_f64(*drowsiness_level);
                buf.put_f64(*reaction_time);
            }
            AlertPayload::LaneChange {
                current_lane,
                target_lane,
                risk_score,
                lateral_speed,
                is_emergency_vehicle,
            } => {
                buf.put_u8(*current_lane);
                buf.put_u8(*target_lane);
                buf.put_u8(if *is_emergency_vehicle {
                    FLAG_EMERGENCY_VEHICLE
                } else {
                    0
                });
                buf.put_u8(0);
                buf.put_f64(*risk_score);
                buf.put_f64(*lateral_speed);
            }
            AlertPayload::Speed {
                offending_vehicle,
                current_speed,
                speed_limit,
            } => {
                buf.put_u32(offending_vehicle.raw());
                buf.put_u32(0);
                buf.put_f64(*current_speed);
                buf.put_f64(*speed_limit);
            }
        }

        buf.resize(cause.frame_len(), 0);
        buf.freeze()
    }
}

#[derive(Default, Debug, Copy, Clone)]
pub struct DenmParser;

impl DenmParser {
    pub fn new() -> Self {
        Self
    }

    /// Cheap type check used to drop foreign packets before a full parse.
    pub fn is_denm(data: &[u8]) -> bool {
        data.len() >= 2 && data[1] == MESSAGE_ID_DENM
    }

    pub fn parse(&self, data: &Bytes) -> Result<Alert, DenmParseError> {
        if data.len() < 2 {
            return Err(DenmParseError::InsufficientData {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }
        if data[1] != MESSAGE_ID_DENM {
            return Err(DenmParseError::NotDenm(data[1]));
        }
        if data[0] != PROTOCOL_VERSION {
            return Err(DenmParseError::InvalidVersion(data[0]));
        }
        if data.len() < HEADER_LEN {
            return Err(DenmParseError::InsufficientData {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut cursor = &data[..];
        let protocol_version = cursor.get_u8();
        let _message_id = cursor.get_u8();
        let cause = CauseCode::try_from(cursor.get_u8())?;
        let severity = Severity::try_from(cursor.get_u8())?;
        let station_id = StationId(cursor.get_u32());
        let detection_time = cursor.get_f64();
        let reference_time = cursor.get_f64();
        let termination = cursor.get_u8() != 0;
        let information_quality = cursor.get_u8();
        cursor.advance(2);
        let event_position = Position::new(cursor.get_f64(), cursor.get_f64());
        let event_speed = f64::from(cursor.get_f32());
        let event_heading = f64::from(cursor.get_f32());

        let payload = Self::parse_payload(cause, cursor)?;

        Ok(Alert {
            protocol_version,
            station_id,
            detection_time,
            reference_time,
            termination,
            information_quality,
            severity,
            event_position,
            event_speed,
            event_heading,
            payload,
        })
    }

    /// Parse a hex-encoded frame, as printed by packet dumps.
    pub fn parse_hex(&self, frame: &str) -> Result<Alert, DenmParseError> {
        let raw = hex::decode(frame.trim())?;
        self.parse(&Bytes::from(raw))
    }

    fn parse_payload(cause: CauseCode, mut cursor: &[u8]) -> Result<AlertPayload, DenmParseError> {
        let needed = match cause {
            CauseCode::Collision => 8,
            CauseCode::AnomalousDriving => 16,
            CauseCode::DangerousLaneChange => 20,
            CauseCode::SpeedViolation => 24,
        };
        if cursor.remaining() < needed {
            return Err(DenmParseError::InsufficientData {
                expected: HEADER_LEN + needed,
                actual: HEADER_LEN + cursor.remaining(),
            });
        }

        let payload = match cause {
            CauseCode::Collision => AlertPayload::Collision {
                time_to_collision: cursor.get_f64(),
            },
            CauseCode::AnomalousDriving => AlertPayload::Drowsiness {
                drowsiness_level: cursor.get_f64(),
                reaction_time: cursor.get_f64(),
            },
            CauseCode::DangerousLaneChange => {
                let current_lane = cursor.get_u8();
                let target_lane = cursor.get_u8();
                let flags = cursor.get_u8();
                cursor.advance(1);
                AlertPayload::LaneChange {
                    current_lane,
                    target_lane,
                    risk_score: cursor.get_f64(),
                    lateral_speed: cursor.get_f64(),
                    is_emergency_vehicle: flags & FLAG_EMERGENCY_VEHICLE != 0,
                }
            }
            CauseCode::SpeedViolation => {
                let offending_vehicle = StationId(cursor.get_u32());
                cursor.advance(4);
                AlertPayload::Speed {
                    offending_vehicle,
                    current_speed: cursor.get_f64(),
                    speed_limit: cursor.get_f64(),
                }
            }
        };
        debug_assert_eq!(needed, payload.encoded_len());
        Ok(payload)
    }
}
