//! Catalog of supported PMSx003 wire layouts.
//!
//! Every model in the family starts its frames with the same `0x42 0x4D`
//! signature, so the layout can't be detected from the stream. It has to be
//! configured, and everything that depends on it (frame size, field count,
//! which fields mean something) is looked up here.

use std::fmt;
use std::str::FromStr;

/// Largest number of 16-bit data fields any variant sends.
pub const MAX_FIELDS: usize = 17;

/// Sensor model, identified by its stored selector value.
///
/// The discriminants are persisted by hosts, so they must not change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorVariant {
    /// PMS1003 / PMS5003 / PMS7003: mass concentrations and particle counts.
    Pms5003 = 0,
    /// PMS2003 / PMS3003: mass concentrations only, short frame.
    Pms3003 = 1,
    /// PMS5003S.
    Pms5003S = 2,
    /// PMS5003T.
    Pms5003T = 3,
    /// PMS5003ST: adds formaldehyde, temperature and humidity.
    Pms5003St = 4,
}

/// Wire layout and capabilities of one variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Total bytes on the wire, signature and checksum included.
    pub frame_size: usize,
    /// Number of 16-bit data fields between the length and the checksum.
    pub field_count: usize,
    /// Fields 6..=11 carry particle counts.
    pub has_counts: bool,
    /// Fields 12..=14 carry formaldehyde, temperature and humidity.
    pub has_environment: bool,
}

impl Layout {
    /// Returned for selector values no variant answers to. A zero frame size
    /// can never describe a real frame.
    pub const UNSUPPORTED: Layout = Layout {
        frame_size: 0,
        field_count: 0,
        has_counts: false,
        has_environment: false,
    };

    /// Looks up the layout for a raw stored selector.
    pub fn for_selector(selector: u8) -> Layout {
        SensorVariant::from_selector(selector)
            .map(SensorVariant::layout)
            .unwrap_or(Layout::UNSUPPORTED)
    }

    /// Value the frame's length field must carry: everything after the
    /// signature and the length field itself.
    pub fn declared_length(&self) -> usize {
        self.frame_size.saturating_sub(4)
    }

    pub fn is_supported(&self) -> bool {
        self.frame_size != 0
    }
}

const BASE: Layout = Layout {
    frame_size: 32,
    field_count: 13,
    has_counts: true,
    has_environment: false,
};

const REDUCED: Layout = Layout {
    frame_size: 24,
    field_count: 9,
    has_counts: false,
    has_environment: false,
};

const ENVIRONMENTAL: Layout = Layout {
    frame_size: 40,
    field_count: 17,
    has_counts: true,
    has_environment: true,
};

impl SensorVariant {
    pub const ALL: [SensorVariant; 5] = [
        SensorVariant::Pms5003,
        SensorVariant::Pms3003,
        SensorVariant::Pms5003S,
        SensorVariant::Pms5003T,
        SensorVariant::Pms5003St,
    ];

    pub fn from_selector(selector: u8) -> Option<SensorVariant> {
        SensorVariant::ALL
            .iter()
            .copied()
            .find(|v| v.selector() == selector)
    }

    pub fn selector(self) -> u8 {
        self as u8
    }

    pub fn layout(self) -> Layout {
        match self {
            SensorVariant::Pms5003 | SensorVariant::Pms5003S | SensorVariant::Pms5003T => BASE,
            SensorVariant::Pms3003 => REDUCED,
            SensorVariant::Pms5003St => ENVIRONMENTAL,
        }
    }

    pub fn frame_size(self) -> usize {
        self.layout().frame_size
    }

    pub fn field_count(self) -> usize {
        self.layout().field_count
    }

    /// Short name accepted on the command line.
    fn short_name(self) -> &'static str {
        match self {
            SensorVariant::Pms5003 => "pms5003",
            SensorVariant::Pms3003 => "pms3003",
            SensorVariant::Pms5003S => "pms5003s",
            SensorVariant::Pms5003T => "pms5003t",
            SensorVariant::Pms5003St => "pms5003st",
        }
    }
}

impl fmt::Display for SensorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorVariant::Pms5003 => "PMS1003 / PMS5003 / PMS7003",
            SensorVariant::Pms3003 => "PMS2003 / PMS3003",
            SensorVariant::Pms5003S => "PMS5003S",
            SensorVariant::Pms5003T => "PMS5003T",
            SensorVariant::Pms5003St => "PMS5003ST",
        })
    }
}

impl FromStr for SensorVariant {
    type Err = crate::error::ConfigError;

    /// Accepts either the stored selector number or a model name. The
    /// family aliases (pms1003, pms7003, pms2003) map onto their shared layout.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(n) = lower.parse::<u8>() {
            return SensorVariant::from_selector(n)
                .ok_or_else(|| crate::error::ConfigError::UnknownVariant(s.to_string()));
        }
        match lower.as_str() {
            "pms1003" | "pms7003" => Ok(SensorVariant::Pms5003),
            "pms2003" => Ok(SensorVariant::Pms3003),
            _ => SensorVariant::ALL
                .iter()
                .copied()
                .find(|v| v.short_name() == lower)
                .ok_or_else(|| crate::error::ConfigError::UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_sizes() {
        assert_eq!(SensorVariant::Pms5003.frame_size(), 32);
        assert_eq!(SensorVariant::Pms5003.field_count(), 13);
        assert_eq!(SensorVariant::Pms3003.frame_size(), 24);
        assert_eq!(SensorVariant::Pms3003.field_count(), 9);
        assert_eq!(SensorVariant::Pms5003St.frame_size(), 40);
        assert_eq!(SensorVariant::Pms5003St.field_count(), 17);
        assert_eq!(SensorVariant::Pms5003S.layout(), SensorVariant::Pms5003.layout());
        assert_eq!(SensorVariant::Pms5003T.layout(), SensorVariant::Pms5003.layout());
    }

    #[test]
    fn field_count_fits_frame() {
        for v in SensorVariant::ALL.iter() {
            let layout = v.layout();
            // signature + length + fields + checksum
            assert_eq!(4 + layout.field_count * 2 + 2, layout.frame_size, "{}", v);
            assert!(layout.field_count <= MAX_FIELDS);
        }
    }

    #[test]
    fn unknown_selector_is_zero_size() {
        let layout = Layout::for_selector(9);
        assert_eq!(layout, Layout::UNSUPPORTED);
        assert_eq!(layout.frame_size, 0);
        assert!(!layout.is_supported());
        assert_eq!(layout.declared_length(), 0);
    }

    #[test]
    fn selectors_round_trip() {
        for v in SensorVariant::ALL.iter() {
            assert_eq!(SensorVariant::from_selector(v.selector()), Some(*v));
        }
        assert_eq!(SensorVariant::from_selector(5), None);
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("4".parse::<SensorVariant>().unwrap(), SensorVariant::Pms5003St);
        assert_eq!("PMS7003".parse::<SensorVariant>().unwrap(), SensorVariant::Pms5003);
        assert_eq!("pms2003".parse::<SensorVariant>().unwrap(), SensorVariant::Pms3003);
        assert!("pms9000".parse::<SensorVariant>().is_err());
        assert!("7".parse::<SensorVariant>().is_err());
    }
}
