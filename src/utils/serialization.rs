use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Exchange APIs quote prices as decimal strings ("65000.01000000") but
/// occasionally as bare numbers. Accept both.
pub(crate) fn value_as_f64(v: &Value) -> Result<f64, String> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number out of f64 range: {n}")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not parse f64 from string: {s}")),
        other => Err(format!("expected number or string, got: {other}")),
    }
}

pub(crate) fn de_f64_flexible<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    value_as_f64(&v).map_err(de::Error::custom)
}
