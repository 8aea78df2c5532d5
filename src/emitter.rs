//! Maps decoded frames onto output slots and named notifications.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::decoder::Frame;
use crate::error::ConfigError;
use crate::variant::Layout;

/// Number of numbered output slots per attachment.
pub const SLOT_COUNT: usize = 4;

// Field indices, shared by every layout that has them.
const PM1_0_ATM: usize = 3;
const PM2_5_ATM: usize = 4;
const PM10_ATM: usize = 5;
const CNT1_0: usize = 8;
const CNT2_5: usize = 9;
const CNT5: usize = 10;
const CNT10: usize = 11;
const HCHO: usize = 12;
const TEMP: usize = 13;
const HUMI: usize = 14;

/// Which decoded quantities land in the four output slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputProjection {
    /// PM1.0, PM2.5, PM10 (atmospheric), 0.
    ParticleMass = 0,
    /// PM2.5, temperature, humidity, formaldehyde.
    Environment = 1,
    /// Particle counts above 1.0, 2.5, 5 and 10 µm.
    ParticleCount = 2,
}

impl OutputProjection {
    pub fn from_selector(selector: u8) -> Option<OutputProjection> {
        match selector {
            0 => Some(OutputProjection::ParticleMass),
            1 => Some(OutputProjection::Environment),
            2 => Some(OutputProjection::ParticleCount),
            _ => None,
        }
    }

    /// Whether a variant with this layout sends every field the projection reads.
    pub fn supported_by(self, layout: Layout) -> bool {
        match self {
            OutputProjection::ParticleMass => layout.is_supported(),
            OutputProjection::Environment => layout.has_environment,
            OutputProjection::ParticleCount => layout.has_counts,
        }
    }
}

impl fmt::Display for OutputProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputProjection::ParticleMass => "particle mass",
            OutputProjection::Environment => "pm2.5/temperature/humidity/HCHO",
            OutputProjection::ParticleCount => "particle count",
        })
    }
}

impl FromStr for OutputProjection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "mass" | "pm" => Ok(OutputProjection::ParticleMass),
            "1" | "env" | "thc" => Ok(OutputProjection::Environment),
            "2" | "count" | "cnt" => Ok(OutputProjection::ParticleCount),
            _ => Err(ConfigError::UnknownProjection(s.to_string())),
        }
    }
}

/// How many named notifications to send per decoded frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventMode {
    None = 0,
    /// Quantities not already in the output slots.
    Basic = 1,
    /// Basic, plus particle counts.
    BasicWithCounts = 2,
}

impl EventMode {
    pub fn from_selector(selector: u8) -> Option<EventMode> {
        match selector {
            0 => Some(EventMode::None),
            1 => Some(EventMode::Basic),
            2 => Some(EventMode::BasicWithCounts),
            _ => None,
        }
    }
}

impl FromStr for EventMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "none" => Ok(EventMode::None),
            "1" | "basic" => Ok(EventMode::Basic),
            "2" | "counts" => Ok(EventMode::BasicWithCounts),
            _ => Err(ConfigError::UnknownEventMode(s.to_string())),
        }
    }
}

/// The four numbered output values of one attachment.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OutputSlots([f32; SLOT_COUNT]);

impl OutputSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, values: [f32; SLOT_COUNT]) {
        self.0 = values;
    }

    pub fn values(&self) -> [f32; SLOT_COUNT] {
        self.0
    }
}

impl Index<usize> for OutputSlots {
    type Output = f32;

    fn index(&self, slot: usize) -> &f32 {
        &self.0[slot]
    }
}

/// Computes the slot values for `projection`.
///
/// The configuration is responsible for only selecting projections the
/// frame's variant supports; missing fields read as zero.
pub fn project(frame: &Frame, projection: OutputProjection) -> [f32; SLOT_COUNT] {
    let raw = |i| f32::from(frame.field(i).unwrap_or(0));
    match projection {
        OutputProjection::ParticleMass => [raw(PM1_0_ATM), raw(PM2_5_ATM), raw(PM10_ATM), 0.0],
        OutputProjection::Environment => [
            raw(PM2_5_ATM),
            raw(TEMP) / 10.0,
            raw(HUMI) / 10.0,
            raw(HCHO) / 1000.0,
        ],
        OutputProjection::ParticleCount => [raw(CNT1_0), raw(CNT2_5), raw(CNT5), raw(CNT10)],
    }
}

/// One named value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Notification {
    pub name: &'static str,
    pub value: f32,
}

/// Builds the notifications for one frame.
///
/// Each projection announces what its slots leave out. Environmental values
/// and counts are only included when the frame's variant sends them.
pub fn notifications(
    frame: &Frame,
    projection: OutputProjection,
    mode: EventMode,
) -> Vec<Notification> {
    let mut out = Vec::new();
    if mode == EventMode::None {
        return out;
    }

    let layout = frame.variant().layout();
    let raw = |i| f32::from(frame.field(i).unwrap_or(0));
    let mut note = |name, value| out.push(Notification { name, value });

    match projection {
        OutputProjection::ParticleMass => {
            if layout.has_environment {
                note("Temp", raw(TEMP) / 10.0);
                note("Humi", raw(HUMI) / 10.0);
                note("HCHO", raw(HCHO) / 1000.0);
            }
        }
        OutputProjection::Environment => {
            note("pm1.0", raw(PM1_0_ATM));
            note("pm10", raw(PM10_ATM));
        }
        OutputProjection::ParticleCount => {
            note("pm1.0", raw(PM1_0_ATM));
            note("pm2.5", raw(PM2_5_ATM));
            note("pm10", raw(PM10_ATM));
            if layout.has_environment {
                note("Temp", raw(TEMP) / 10.0);
                note("Humi", raw(HUMI) / 10.0);
                note("HCHO", raw(HCHO) / 1000.0);
            }
        }
    }

    // Counts are already the slots of the count projection.
    if mode == EventMode::BasicWithCounts
        && layout.has_counts
        && projection != OutputProjection::ParticleCount
    {
        note("cnt1.0", raw(CNT1_0));
        note("cnt2.5", raw(CNT2_5));
        note("cnt5", raw(CNT5));
        note("cnt10", raw(CNT10));
    }

    out
}

/// Destination for rendered notifications, e.g. a host's event queue.
pub trait EventSink {
    fn send(&mut self, event: String);
}

impl EventSink for Vec<String> {
    fn send(&mut self, event: String) {
        self.push(event);
    }
}

/// Renders each notification as `<prefix>#<name>=<value>` and sends it.
pub fn emit<E: EventSink + ?Sized>(sink: &mut E, prefix: &str, notes: &[Notification]) {
    for n in notes {
        sink.send(format!("{}#{}={:.2}", prefix, n.name, n.value));
    }
}
