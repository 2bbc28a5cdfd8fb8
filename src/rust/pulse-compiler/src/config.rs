// SPDX-License-Identifier: Apache-2.0

//! Raw configuration input and its validation.
//!
//! A program variant receives its parameters as a flat name→value
//! mapping, typically parsed from JSON. Before a typed configuration is
//! materialized, the variant's required-key list is checked against the
//! mapping and the first missing key aborts construction. Numeric
//! bounds are checked afterwards on the typed struct, so every error
//! names the offending field and value.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// Flat parameter mapping handed in by the caller. Insertion order is
/// preserved so error reporting follows the author's layout.
pub type Parameters = IndexMap<String, Value>;

/// Checks that every key in `required` is present in `params`.
///
/// Fails with [`Error::Configuration`] naming the first missing key.
pub fn require(params: &Parameters, required: &'static [&'static str]) -> Result<()> {
    for key in required {
        if !params.contains_key(*key) {
            return Err(Error::Configuration(format!(
                "missing required parameter '{key}'"
            )));
        }
    }
    Ok(())
}

/// Checks the required keys, then deserializes `params` into the typed
/// configuration `T`.
pub fn materialize<T: DeserializeOwned>(
    params: &Parameters,
    required: &'static [&'static str],
) -> Result<T> {
    require(params, required)?;
    let map: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(Value::Object(map))
        .map_err(|err| Error::Configuration(err.to_string()))
}

/// Checks `start < end` for a paired range parameter.
pub fn check_range_order<T: PartialOrd + std::fmt::Display>(
    start_field: &'static str,
    start: T,
    end_field: &'static str,
    end: T,
) -> Result<()> {
    if end <= start {
        return Err(Error::Configuration(format!(
            "{end_field} ({end}) must be greater than {start_field} ({start})"
        )));
    }
    Ok(())
}

/// Checks a gain value against the register range `[0, max]`.
pub fn check_gain(field: &'static str, value: i32, max: i32) -> Result<()> {
    if value < 0 {
        return Err(Error::Configuration(format!(
            "{field} ({value}) must not be negative"
        )));
    }
    if value > max {
        return Err(Error::Configuration(format!(
            "{field} ({value}) exceeds the maximum gain of {max}"
        )));
    }
    Ok(())
}

/// Checks that a count or length parameter is strictly positive.
pub fn check_positive<T: PartialOrd + Default + std::fmt::Display>(
    field: &'static str,
    value: T,
) -> Result<()> {
    if value <= T::default() {
        return Err(Error::Configuration(format!(
            "{field} ({value}) must be positive"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn params(entries: &[(&str, Value)]) -> Parameters {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_require_reports_first_missing_key() {
        let p = params(&[("pulse_len", json!(100))]);
        let err = require(&p, &["pulse_len", "gate_pin", "reps"]).unwrap_err();
        assert!(err.to_string().contains("gate_pin"), "{err}");
    }

    #[test]
    fn test_materialize_typed_config() {
        #[derive(Deserialize)]
        struct Cfg {
            pulse_len: i64,
            gate_pin: u8,
        }
        let p = params(&[("pulse_len", json!(430)), ("gate_pin", json!(1))]);
        let cfg: Cfg = materialize(&p, &["pulse_len", "gate_pin"]).unwrap();
        assert_eq!(cfg.pulse_len, 430);
        assert_eq!(cfg.gate_pin, 1);
    }

    #[test]
    fn test_materialize_rejects_wrong_type() {
        #[derive(Debug, Deserialize)]
        struct Cfg {
            #[allow(dead_code)]
            pulse_len: i64,
        }
        let p = params(&[("pulse_len", json!("long"))]);
        let err = materialize::<Cfg>(&p, &["pulse_len"]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_range_order() {
        assert!(check_range_order("cycles_start", 5, "cycles_end", 10).is_ok());
        let err = check_range_order("cycles_start", 10, "cycles_end", 5).unwrap_err();
        assert!(err.to_string().contains("cycles_end"), "{err}");
        // Equal endpoints are a degenerate range as well.
        assert!(check_range_order("cycles_start", 5, "cycles_end", 5).is_err());
    }

    #[test]
    fn test_gain_bounds() {
        assert!(check_gain("gain", 0, 32767).is_ok());
        assert!(check_gain("gain", 32767, 32767).is_ok());
        assert!(check_gain("gain", -1, 32767).is_err());
        assert!(check_gain("gain", 32768, 32767).is_err());
    }

    #[test]
    fn test_positive() {
        assert!(check_positive("nsweep_points", 1).is_ok());
        assert!(check_positive("nsweep_points", 0).is_err());
        assert!(check_positive("sigma", -0.5).is_err());
    }
}
