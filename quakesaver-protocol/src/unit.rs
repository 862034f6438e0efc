use serde::{Deserialize, Serialize};

/// Physical unit of the samples carried by a waveform frame.
///
/// The unit determines the element type channel data decodes into:
/// raw ADC counts are 32-bit signed integers, both physical units are
/// 64-bit floats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataUnit {
    /// Raw ADC counts (`i32` samples).
    #[serde(rename = "counts")]
    Counts,
    /// Ground velocity in m/s (`f64` samples).
    #[serde(rename = "m_s")]
    MetersPerSecond,
    /// Ground acceleration in m/s² (`f64` samples).
    #[serde(rename = "m_s2")]
    MetersPerSecondSquared,
}

impl DataUnit {
    /// Width in bytes of one encoded sample of this unit.
    pub fn sample_width(self) -> usize {
        match self {
            Self::Counts => 4,
            Self::MetersPerSecond | Self::MetersPerSecondSquared => 8,
        }
    }

    /// Returns the wire name of this unit.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counts => "counts",
            Self::MetersPerSecond => "m_s",
            Self::MetersPerSecondSquared => "m_s2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip() {
        for unit in [
            DataUnit::Counts,
            DataUnit::MetersPerSecond,
            DataUnit::MetersPerSecondSquared,
        ] {
            let json = serde_json::to_string(&unit).unwrap();
            assert_eq!(json, format!("\"{}\"", unit.as_str()));
            let parsed: DataUnit = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, unit);
        }
    }

    #[test]
    fn unknown_unit_rejected() {
        assert!(serde_json::from_str::<DataUnit>("\"furlongs\"").is_err());
    }

    #[test]
    fn sample_widths() {
        assert_eq!(DataUnit::Counts.sample_width(), 4);
        assert_eq!(DataUnit::MetersPerSecond.sample_width(), 8);
        assert_eq!(DataUnit::MetersPerSecondSquared.sample_width(), 8);
    }
}
