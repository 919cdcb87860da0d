//! Coordinate Reference System identifiers.
//!
//! A [`Crs`] is an EPSG code resolved against the crs-definitions database,
//! so that every value in circulation is known to be transformable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{TilerError, TilerResult};

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";
const WEB_MERCATOR_PROJ4: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 \
+x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// A resolved coordinate reference system.
///
/// Serialized as its `EPSG:<code>` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u16,
    proj4: &'static str,
}

impl Crs {
    /// WGS84 geographic (lon/lat in degrees).
    pub fn wgs84() -> Self {
        Self {
            epsg: 4326,
            proj4: WGS84_PROJ4,
        }
    }

    /// Web Mercator (meters).
    pub fn web_mercator() -> Self {
        Self {
            epsg: 3857,
            proj4: WEB_MERCATOR_PROJ4,
        }
    }

    /// Resolve an EPSG code.
    pub fn from_epsg(code: u32) -> TilerResult<Self> {
        match code {
            4326 => return Ok(Self::wgs84()),
            3857 | 900913 => return Ok(Self::web_mercator()),
            _ => {}
        }

        let epsg = u16::try_from(code)
            .map_err(|_| TilerError::configuration(format!("EPSG code out of range: {}", code)))?;

        crs_definitions::from_code(epsg)
            .map(|def| Self {
                epsg,
                proj4: def.proj4,
            })
            .ok_or_else(|| {
                TilerError::configuration(format!("coordinate system not supported: EPSG:{}", code))
            })
    }

    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:3857"
    /// - "3857"
    /// - "CRS:84" (equivalent to EPSG:4326)
    pub fn parse(s: &str) -> TilerResult<Self> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" {
            return Ok(Self::wgs84());
        }

        let digits = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);
        let code: u32 = digits
            .parse()
            .map_err(|_| TilerError::configuration(format!("unparsable coordinate system: {}", s)))?;

        Self::from_epsg(code)
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// PROJ4 definition string for this CRS.
    pub fn proj4(&self) -> &'static str {
        self.proj4
    }

    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        self.proj4.contains("+proj=longlat")
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::web_mercator()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl TryFrom<String> for Crs {
    type Error = TilerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Crs::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// The proj4 string is looked up again rather than borrowed from the input.
impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Crs::try_from(id).map_err(serde::de::Error::custom)
    }
}
