use geo::{MultiLineString, MultiPolygon};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// County FIPS code. Sources disagree on whether it is a number (`1001`) or a
/// zero-padded string (`"01001"`); both parse to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fips(pub u32);

impl Fips {
    /// Read an identifier out of a loosely typed JSON value (TopoJSON `id`).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(Fips),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for Fips {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Fips)
    }
}

impl fmt::Display for Fips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Fips {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Fips(n)),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid FIPS code: {s:?}"))),
        }
    }
}

/// One row of the education dataset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Education {
    pub fips: Fips,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}

#[derive(Debug, Clone)]
pub struct County {
    pub fips: Fips,
    pub geometry: MultiPolygon<f64>,
}

/// Outline overlays drawn on top of the counties.
#[derive(Debug, Clone)]
pub struct Borders {
    // Arcs shared by two different states
    pub states: MultiLineString<f64>,
    pub nation: MultiLineString<f64>,
}

impl Default for Borders {
    fn default() -> Self {
        Self {
            states: MultiLineString::new(Vec::new()),
            nation: MultiLineString::new(Vec::new()),
        }
    }
}
