//! Output tile formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tile_common::{TilerError, TilerResult};

use crate::png::encode_png_auto;

/// Image format of written tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    #[default]
    Png,
}

impl TileFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
        }
    }

    /// Encode a `width * height` RGBA buffer.
    pub fn encode(&self, rgba: &[u8], width: usize, height: usize) -> TilerResult<Vec<u8>> {
        match self {
            TileFormat::Png => encode_png_auto(rgba, width, height),
        }
    }
}

impl FromStr for TileFormat {
    type Err = TilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(TileFormat::Png),
            other => Err(TilerError::configuration(format!(
                "unsupported tile format '{}', expected: png",
                other
            ))),
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("png".parse::<TileFormat>().unwrap(), TileFormat::Png);
        assert_eq!("PNG".parse::<TileFormat>().unwrap(), TileFormat::Png);
        assert!(matches!(
            "jpeg".parse::<TileFormat>(),
            Err(TilerError::Configuration(_))
        ));
    }

    #[test]
    fn test_encode_png_signature() {
        let rgba = vec![0u8; 4 * 4 * 4];
        let png = TileFormat::Png.encode(&rgba, 4, 4).unwrap();
        assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        assert_eq!(TileFormat::default().extension(), "png");
    }
}
