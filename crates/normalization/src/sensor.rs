//! Supported sensors and the stretch each one uses.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tile_common::TilerError;

/// Stretch algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Optical imagery: 0.1 / 99.9 percentile stretch over nonzero pixels.
    PercentileEo,
    /// Radar imagery: 2 / 98 percentile clip, min-max scale, 3x3 median.
    PercentileSar,
}

/// Satellite sensor of the input imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sensor {
    /// KOMPSAT-3
    K3,
    /// KOMPSAT-3A
    K3A,
    /// KOMPSAT-5 (SAR)
    K5,
    /// Sentinel-1 (SAR)
    S1,
    /// Sentinel-2
    S2,
    /// Landsat-8
    L8,
}

impl Sensor {
    pub const ALL: [Sensor; 6] = [
        Sensor::K3,
        Sensor::K3A,
        Sensor::K5,
        Sensor::S1,
        Sensor::S2,
        Sensor::L8,
    ];

    /// Short identifier, as used in product file names.
    pub fn id(&self) -> &'static str {
        match self {
            Sensor::K3 => "K3",
            Sensor::K3A => "K3A",
            Sensor::K5 => "K5",
            Sensor::S1 => "S1",
            Sensor::S2 => "S2",
            Sensor::L8 => "L8",
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Sensor::K3 | Sensor::K3A | Sensor::S2 | Sensor::L8 => Algorithm::PercentileEo,
            Sensor::K5 | Sensor::S1 => Algorithm::PercentileSar,
        }
    }

    /// Detect the sensor from a product file name.
    ///
    /// The file stem is split on `_` and a token must equal a sensor id,
    /// e.g. `K3A_20200505_PS.tif`.
    pub fn from_file_name(path: impl AsRef<Path>) -> Option<Sensor> {
        let stem = path.as_ref().file_stem()?.to_str()?;
        let tokens: Vec<&str> = stem.split('_').collect();
        Sensor::ALL
            .into_iter()
            .find(|sensor| tokens.iter().any(|t| t.eq_ignore_ascii_case(sensor.id())))
    }
}

impl FromStr for Sensor {
    type Err = TilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "K3" | "KOMPSAT3" => Ok(Sensor::K3),
            "K3A" | "KOMPSAT3A" => Ok(Sensor::K3A),
            "K5" | "KOMPSAT5" => Ok(Sensor::K5),
            "S1" | "SENTINEL1" => Ok(Sensor::S1),
            "S2" | "SENTINEL2" => Ok(Sensor::S2),
            "L8" | "LANDSAT8" => Ok(Sensor::L8),
            _ => Err(TilerError::configuration(format!(
                "unknown sensor '{}', expected one of: {}",
                s,
                Sensor::ALL.map(|s| s.id()).join(", ")
            ))),
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl TryFrom<String> for Sensor {
    type Error = TilerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sensor> for String {
    fn from(sensor: Sensor) -> Self {
        sensor.id().to_string()
    }
}
