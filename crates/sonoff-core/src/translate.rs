//! Raw wire values to host settings and back

use crate::cluster::{AttributeSpec, Conversion, TURBO_MODE_OFF, TURBO_MODE_ON};
use crate::error::DriverError;
use serde_json::{Number, Value};
use zcl_protocol::AttributeValue;

/// Host settings object
pub type Settings = serde_json::Map<String, Value>;

/// A value in either representation
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// As decoded from the device
    Raw(AttributeValue),
    /// As shown to the host
    Semantic(Value),
}

impl SettingValue {
    /// Convert to the semantic representation
    pub fn into_semantic(self, spec: &AttributeSpec) -> Value {
        match self {
            SettingValue::Raw(raw) => to_semantic(spec, &raw),
            SettingValue::Semantic(value) => value,
        }
    }

    /// Convert to the raw representation
    pub fn into_raw(self, spec: &AttributeSpec) -> Result<AttributeValue, DriverError> {
        match self {
            SettingValue::Raw(raw) => Ok(raw),
            SettingValue::Semantic(value) => to_raw(spec, &value),
        }
    }
}

/// Translate a decoded attribute into its settings value
#[must_use]
pub fn to_semantic(spec: &AttributeSpec, raw: &AttributeValue) -> Value {
    match spec.conversion {
        Conversion::TurboMode => match raw.as_i64() {
            Some(v) => Value::Bool(v != TURBO_MODE_OFF && v != 0),
            None => Value::Bool(false),
        },
        Conversion::DecimalString => match raw.as_i64() {
            Some(v) => Value::String(v.to_string()),
            None => plain(raw),
        },
        Conversion::Enum(table) => match raw.as_i64() {
            Some(v) => table
                .iter()
                .find(|(_, code)| i64::from(*code) == v)
                .map_or_else(|| Value::from(v), |(name, _)| Value::from(*name)),
            None => plain(raw),
        },
        Conversion::Plain => plain(raw),
    }
}

fn plain(raw: &AttributeValue) -> Value {
    match raw {
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Octets(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        AttributeValue::String(s) => Value::String(s.clone()),
        other => other.as_i64().map_or(Value::Null, Value::from),
    }
}

/// Translate a settings value into the attribute's wire value
pub fn to_raw(spec: &AttributeSpec, value: &Value) -> Result<AttributeValue, DriverError> {
    let data_type = spec.wire_type.data_type();
    let invalid = |reason: String| DriverError::InvalidSetting {
        key: spec.setting.to_string(),
        reason,
    };

    let number = match spec.conversion {
        Conversion::TurboMode => {
            if truthy(value) {
                TURBO_MODE_ON
            } else {
                TURBO_MODE_OFF
            }
        }
        Conversion::DecimalString => match value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| invalid(format!("{s:?} is not a decimal number: {e}")))?,
            Value::Number(n) => integer(n).ok_or_else(|| invalid(format!("{n} is not an integer")))?,
            other => return Err(invalid(format!("expected a decimal string, got {other}"))),
        },
        Conversion::Enum(table) => match value {
            Value::String(s) => table
                .iter()
                .find(|(name, _)| *name == s.as_str())
                .map(|(_, code)| i64::from(*code))
                .ok_or_else(|| invalid(format!("unknown value {s:?}")))?,
            Value::Number(n) => integer(n).ok_or_else(|| invalid(format!("{n} is not an integer")))?,
            other => return Err(invalid(format!("expected a name, got {other}"))),
        },
        Conversion::Plain => match value {
            Value::Bool(b) => i64::from(*b),
            Value::Number(n) => integer(n).ok_or_else(|| invalid(format!("{n} is not an integer")))?,
            other => return Err(invalid(format!("expected a number or boolean, got {other}"))),
        },
    };

    AttributeValue::from_i64(data_type, number).map_err(|e| invalid(e.to_string()))
}

fn integer(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ON_OFF_CLUSTER, SONOFF_CLUSTER};
    use serde_json::json;

    fn spec(name: &str) -> &'static AttributeSpec {
        SONOFF_CLUSTER
            .attribute(name)
            .or_else(|_| ON_OFF_CLUSTER.attribute(name))
            .unwrap()
    }

    #[test]
    fn test_turbo_mode_to_semantic() {
        let turbo = spec("TurboMode");
        assert_eq!(to_semantic(turbo, &AttributeValue::I16(20)), json!(true));
        assert_eq!(to_semantic(turbo, &AttributeValue::I16(9)), json!(false));
        assert_eq!(to_semantic(turbo, &AttributeValue::I16(0)), json!(false));
        assert_eq!(to_semantic(turbo, &AttributeValue::I16(15)), json!(true));
    }

    #[test]
    fn test_turbo_mode_to_raw() {
        let turbo = spec("TurboMode");
        assert_eq!(to_raw(turbo, &json!(true)).unwrap(), AttributeValue::I16(20));
        assert_eq!(to_raw(turbo, &json!(false)).unwrap(), AttributeValue::I16(9));
        assert_eq!(to_raw(turbo, &json!(1)).unwrap(), AttributeValue::I16(20));
        assert_eq!(to_raw(turbo, &Value::Null).unwrap(), AttributeValue::I16(9));
    }

    #[test]
    fn test_switch_mode_round_trip() {
        let switch_mode = spec("switch_mode");
        for raw in [0u8, 1, 2, 0x82, 255] {
            let semantic = to_semantic(switch_mode, &AttributeValue::U8(raw));
            assert_eq!(semantic, Value::String(raw.to_string()));
            assert_eq!(to_raw(switch_mode, &semantic).unwrap(), AttributeValue::U8(raw));
        }
        assert_eq!(to_raw(switch_mode, &json!(2)).unwrap(), AttributeValue::U8(2));
    }

    #[test]
    fn test_switch_mode_rejects_garbage() {
        let switch_mode = spec("switch_mode");
        assert!(matches!(
            to_raw(switch_mode, &json!("pulse")),
            Err(DriverError::InvalidSetting { .. })
        ));
        assert!(matches!(
            to_raw(switch_mode, &json!("256")),
            Err(DriverError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_plain_values() {
        let led = spec("network_led");
        assert_eq!(to_semantic(led, &AttributeValue::Bool(true)), json!(true));
        assert_eq!(to_raw(led, &json!(false)).unwrap(), AttributeValue::Bool(false));

        let delay = spec("power_on_delay_time");
        assert_eq!(to_raw(delay, &json!(1500)).unwrap(), AttributeValue::U16(1500));
        assert_eq!(to_semantic(delay, &AttributeValue::U16(1500)), json!(1500));
        assert!(to_raw(delay, &json!(-1)).is_err());
        assert!(to_raw(delay, &json!("1500")).is_err());
    }

    #[test]
    fn test_power_on_behavior() {
        let pob = spec("power_on_behavior");
        assert_eq!(
            to_raw(pob, &json!("last_state")).unwrap(),
            AttributeValue::Enum8(0xFF)
        );
        assert_eq!(to_semantic(pob, &AttributeValue::Enum8(0x01)), json!("on"));
        assert_eq!(to_semantic(pob, &AttributeValue::Enum8(0x07)), json!(7));
        assert!(to_raw(pob, &json!("sometimes")).is_err());
    }

    #[test]
    fn test_setting_value_conversions() {
        let turbo = spec("TurboMode");
        let raw = SettingValue::Raw(AttributeValue::I16(20));
        assert_eq!(raw.into_semantic(turbo), json!(true));

        let semantic = SettingValue::Semantic(json!(false));
        assert_eq!(semantic.into_raw(turbo).unwrap(), AttributeValue::I16(9));
    }
}
