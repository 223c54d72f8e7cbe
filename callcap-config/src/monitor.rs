//! Monitored number configuration.
//!
//! Calls are only tracked when the caller or called number of the inbound
//! leg appears in this list.

use serde::{de, Deserialize, Deserializer, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Monitoring configuration parameters.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct MonitorConfig {
    /// Caller ids to watch, compared verbatim. At least one is required.
    #[validate(
        length(min = 1, message = "at least one number must be monitored"),
        custom(function = validation::validate_numbers)
    )]
    #[serde(default, deserialize_with = "deserialize_numbers")]
    pub numbers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberValue {
    Num(u64),
    Str(String),
}

/// YAML and environment sources hand unquoted numbers over as integers,
/// which has already dropped leading zeros. Those are refused rather than
/// monitored under a number that never matches.
fn deserialize_numbers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<NumberValue>::deserialize(deserializer)?;
    let mut numbers = Vec::with_capacity(values.len());
    for value in values {
        match value {
            NumberValue::Num(n) => {
                return Err(de::Error::custom(format!(
                    "monitored number {} must be quoted, e.g. \"{}\"",
                    n, n
                )))
            }
            NumberValue::Str(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    numbers.push(s.to_string());
                }
            }
        }
    }
    Ok(numbers)
}
