// ==============================================================================
// vehicle.rs — VEHICLE DESCRIPTORS + PRESET ROSTER
// ------------------------------------------------------------------------------
// VehicleSpec is the closed, validated set of chassis numbers the threshold
// model reads:
// - weight (lbs), CoM height / wheelbase / track widths (inches)
// - drive layout (FWD | RWD | AWD)
//
// Every length and the weight are strictly positive. Construction goes through
// VehicleSpec::new (or serde, which routes through the same check), so a spec
// that exists is always safe to divide by.
//
// The roster holds the two vehicles the duel ships with, from manufacturer data
// and NHTSA estimates for the CoM height.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParameterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "FWD")]
    Fwd,
    #[serde(rename = "RWD")]
    Rwd,
    #[serde(rename = "AWD")]
    Awd,
}

impl DriveType {
    /// Lateral grip multiplier for the drive layout.
    /// FWD understeers (front weight bias), RWD tends to oversteer.
    pub fn grip_factor(&self) -> f64 {
        match self {
            DriveType::Fwd => 1.05,
            DriveType::Rwd => 0.98,
            DriveType::Awd => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveType::Fwd => "FWD",
            DriveType::Rwd => "RWD",
            DriveType::Awd => "AWD",
        }
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// ----- vehicle spec -------------------------
// ============================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVehicleSpec")]
pub struct VehicleSpec {
    weight: f64,                // lbs
    center_of_mass_height: f64, // inches
    wheelbase: f64,             // inches (informational)
    front_track: f64,           // inches
    rear_track: f64,            // inches
    drive_type: DriveType,
}

impl VehicleSpec {
    pub fn new(
        weight: f64,
        center_of_mass_height: f64,
        wheelbase: f64,
        front_track: f64,
        rear_track: f64,
        drive_type: DriveType,
    ) -> Result<Self, ParameterError> {
        Ok(Self {
            weight: ParameterError::require_positive("weight", weight)?,
            center_of_mass_height: ParameterError::require_positive(
                "center_of_mass_height",
                center_of_mass_height,
            )?,
            wheelbase: ParameterError::require_positive("wheelbase", wheelbase)?,
            front_track: ParameterError::require_positive("front_track", front_track)?,
            rear_track: ParameterError::require_positive("rear_track", rear_track)?,
            drive_type,
        })
    }

    pub fn weight(&self) -> f64 { self.weight }
    pub fn center_of_mass_height(&self) -> f64 { self.center_of_mass_height }
    pub fn wheelbase(&self) -> f64 { self.wheelbase }
    pub fn front_track(&self) -> f64 { self.front_track }
    pub fn rear_track(&self) -> f64 { self.rear_track }
    pub fn drive_type(&self) -> DriveType { self.drive_type }

    /// Mean of front and rear track (inches).
    pub fn average_track(&self) -> f64 {
        (self.front_track + self.rear_track) / 2.0
    }
}

/// Unchecked wire shape; converted through `VehicleSpec::new`.
#[derive(Deserialize)]
struct RawVehicleSpec {
    weight: f64,
    center_of_mass_height: f64,
    wheelbase: f64,
    front_track: f64,
    rear_track: f64,
    drive_type: DriveType,
}

impl TryFrom<RawVehicleSpec> for VehicleSpec {
    type Error = ParameterError;

    fn try_from(raw: RawVehicleSpec) -> Result<Self, Self::Error> {
        VehicleSpec::new(
            raw.weight,
            raw.center_of_mass_height,
            raw.wheelbase,
            raw.front_track,
            raw.rear_track,
            raw.drive_type,
        )
    }
}

// ============================================
// ----- preset roster ------------------------
// ============================================
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub year: u16,
    pub spec: VehicleSpec,
}

pub const CELICA_2004: Preset = Preset {
    key: "celica",
    name: "Toyota Celica",
    year: 2004,
    spec: VehicleSpec {
        weight: 2650.0,              // lbs curb weight, base model
        center_of_mass_height: 21.0, // in, NHTSA estimate for similar sedans
        wheelbase: 102.4,            // in
        front_track: 59.9,           // in
        rear_track: 59.4,            // in
        drive_type: DriveType::Fwd,
    },
};

pub const CARAVAN_2016: Preset = Preset {
    key: "caravan",
    name: "Dodge Caravan",
    year: 2016,
    spec: VehicleSpec {
        weight: 4560.0,              // lbs curb weight, Grand Caravan
        center_of_mass_height: 27.0, // in, higher minivan body
        wheelbase: 121.2,            // in
        front_track: 64.8,           // in
        rear_track: 64.8,            // in
        drive_type: DriveType::Fwd,
    },
};

pub static ROSTER: [Preset; 2] = [CELICA_2004, CARAVAN_2016];

pub fn preset(key: &str) -> Option<&'static Preset> {
    ROSTER.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}
