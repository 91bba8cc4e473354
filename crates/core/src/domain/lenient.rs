//! Upstream quote feeds mix numbers, numeric strings, `null` and a `"-"` marker for
//! "no data" (suspended or not yet traded). These helpers normalise all of them.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

fn parse(raw: Option<RawNumber>) -> Option<f64> {
    match raw? {
        RawNumber::Number(n) => Some(n).filter(|n| n.is_finite()),
        RawNumber::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    }
}

/// `None` for null, `"-"`, unparsable text or a missing field (with `#[serde(default)]`).
pub fn option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(parse(raw))
}

/// Like [`option`] but collapses absent values to 0.
pub fn zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(parse(raw).unwrap_or(0.0))
}

/// Counts arrive as floats from some feeds.
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(parse(raw).filter(|n| *n > 0.0).map(|n| n as u32).unwrap_or(0))
}
