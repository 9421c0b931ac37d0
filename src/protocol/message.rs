use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::core::{Error, ProtocolRevision, Result};
use crate::model::ModeCode;
use crate::util;

/// Decoded inbound frame from the device
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Instantaneous readings
    #[serde(default)]
    pub measurements: Option<Measurements>,
    /// Authoritative control state
    #[serde(default)]
    pub state: Option<WireState>,
    /// Error reply to a rejected command
    #[serde(default)]
    pub error: Option<String>,
}

impl InboundMessage {
    /// Parses one text frame
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::malformed(format!("Failed to decode message: {}", e)))
    }
}

/// Instantaneous readings reported by the device
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    /// Volts
    pub voltage: f64,
    /// Amperes
    pub current: f64,
    /// Watts
    pub power: f64,
    /// Kiloohms; non-finite for an open circuit
    #[serde(default = "not_measured")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_lenient_f64")]
    pub resistance: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent
    pub fan_speed: f64,
    /// Kilojoules delivered since the output was engaged
    #[serde(default)]
    pub energy: Option<f64>,
    /// Time the output has been engaged
    #[serde(default)]
    pub uptime: Option<Uptime>,
}

fn not_measured() -> f64 {
    f64::NAN
}

/// Uptime as either seconds or preformatted text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Uptime {
    Seconds(f64),
    Text(String),
}

impl Measurements {
    /// Formats every reading for display
    pub fn display(&self) -> MeasurementDisplay {
        MeasurementDisplay {
            voltage: util::format_reading(self.voltage, 3, "V"),
            current: util::format_reading(self.current, 3, "A"),
            power: util::format_reading(self.power, 3, "W"),
            resistance: util::format_reading(self.resistance, 3, "kΩ"),
            temperature: util::format_reading(self.temperature, 1, "°C"),
            fan_speed: util::format_verbatim(self.fan_speed, "%"),
            energy: self.energy.map(|e| util::format_reading(e, 3, "kJ")),
            uptime: self.uptime.as_ref().map(|u| match u {
                Uptime::Seconds(secs) => util::format_uptime(*secs),
                Uptime::Text(text) => text.clone(),
            }),
        }
    }
}

/// Display strings for a set of readings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementDisplay {
    pub voltage: String,
    pub current: String,
    pub power: String,
    pub resistance: String,
    pub temperature: String,
    pub fan_speed: String,
    pub energy: Option<String>,
    pub uptime: Option<String>,
}

/// Readings as last received, with their display form
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementsSnapshot {
    /// Readings verbatim
    pub readings: Measurements,
    /// Display strings
    pub display: MeasurementDisplay,
    /// Local receipt time
    pub received_at: DateTime<Utc>,
}

impl MeasurementsSnapshot {
    /// Captures readings received now
    pub fn capture(readings: Measurements) -> Self {
        MeasurementsSnapshot {
            display: readings.display(),
            readings,
            received_at: Utc::now(),
        }
    }
}

/// Control state fields as they appear on the wire
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireState {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub output_active: Option<bool>,
    #[serde(default)]
    pub relay_enabled: Option<bool>,
}

impl WireState {
    /// Maps the wire fields onto a single engagement flag for `revision`
    pub fn decode(&self, revision: ProtocolRevision) -> StateUpdate {
        let engaged = match revision {
            ProtocolRevision::Relay => self.relay_enabled.or(self.output_active),
            ProtocolRevision::Output => self.output_active.or(self.relay_enabled),
        };
        StateUpdate {
            mode: self.mode.clone(),
            value: self.value,
            engaged,
        }
    }
}

/// Control state with the engagement flag resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// Mode code, not yet resolved against the registry
    pub mode: Option<String>,
    /// Setpoint for `mode`
    pub value: Option<f64>,
    /// Output engagement
    pub engaged: Option<bool>,
}

/// Outbound command intent
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetMode(ModeCode),
    SetValue(f64),
    SetRelay(bool),
    SetOutput { active: bool, value: f64 },
    Exit,
    GetMeasurements,
}

impl Command {
    /// Builds the engagement command for `revision`
    pub fn engagement(revision: ProtocolRevision, active: bool, value: f64) -> Self {
        match revision {
            ProtocolRevision::Relay => Command::SetRelay(active),
            ProtocolRevision::Output => Command::SetOutput { active, value },
        }
    }

    /// Returns the wire command name
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetMode(_) => "setMode",
            Command::SetValue(_) => "setValue",
            Command::SetRelay(_) => "setRelay",
            Command::SetOutput { .. } => "setOutput",
            Command::Exit => "exit",
            Command::GetMeasurements => "getMeasurements",
        }
    }

    /// Encodes the command as a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Serialize)]
struct OutputPayload {
    active: bool,
    value: f64,
}

impl Serialize for Command {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Command", 2)?;
        s.serialize_field("command", self.name())?;
        match self {
            Command::SetMode(mode) => s.serialize_field("value", mode.wire_code())?,
            Command::SetValue(value) => s.serialize_field("value", value)?,
            Command::SetRelay(active) => s.serialize_field("value", active)?,
            Command::SetOutput { active, value } => s.serialize_field(
                "value",
                &OutputPayload {
                    active: *active,
                    value: *value,
                },
            )?,
            Command::Exit | Command::GetMeasurements => s.serialize_field("value", &())?,
        }
        s.end()
    }
}
