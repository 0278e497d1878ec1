//! JSON helpers built on `sonic-rs`, used everywhere the pipeline
//! crosses a process or sandbox boundary (parser/validator contracts,
//! cache entries, artifact emission).

use crate::error::{CrucibleError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn wrap(err: sonic_rs::Error) -> CrucibleError {
    CrucibleError::UnexpectedInference {
        message: format!("json: {err}"),
    }
}

/// Deserialize `T` from a JSON string.
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T> {
    sonic_rs::from_str(s).map_err(wrap)
}

/// Deserialize `T` from raw JSON bytes, as returned over a sandbox's
/// stdout channel.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    sonic_rs::from_slice(bytes).map_err(wrap)
}

/// Serialize `T` into a `sonic_rs::Value`, for callers that need to
/// inspect or merge fields before emitting.
pub fn to_json<T: Serialize>(value: &T) -> Result<sonic_rs::Value> {
    sonic_rs::to_value(value).map_err(wrap)
}

/// Serialize `T` into a pretty-printed JSON string, used for the
/// metadata artifact format (§4.J) and CLI error output.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string_pretty(value).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips_through_value() {
        let sample = Sample {
            name: "numpy".into(),
            count: 3,
        };
        let value = to_json(&sample).expect("serializes");
        assert_eq!(value["name"], "numpy");
        let pretty = to_json_pretty(&sample).expect("pretty prints");
        let back: Sample = from_json(&pretty).expect("deserializes");
        assert_eq!(sample, back);
    }

    #[test]
    fn from_json_slice_rejects_malformed_input() {
        let result: Result<Sample> = from_json_slice(b"{not json");
        assert!(result.is_err());
    }
}
