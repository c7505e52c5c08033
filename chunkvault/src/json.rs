use fastnbt::Value;
use serde_json::{Map, Number, Value as JsonValue};

/// Converts a chunk payload to JSON for display.
///
/// Typed arrays become single-key objects (`__byte_array`, `__int_array`,
/// `__long_array`) so they can be told apart from NBT lists.
pub fn nbt_to_json(nbt: Value) -> JsonValue {
    match nbt {
        Value::Compound(c) => {
            let mut map = Map::new();
            for (k, v) in c {
                map.insert(k, nbt_to_json(v));
            }
            JsonValue::Object(map)
        }
        Value::List(l) => JsonValue::Array(l.into_iter().map(nbt_to_json).collect()),
        Value::String(s) => JsonValue::String(s),
        Value::Byte(b) => JsonValue::Number(b.into()),
        Value::Short(s) => JsonValue::Number(s.into()),
        Value::Int(i) => JsonValue::Number(i.into()),
        Value::Long(l) => JsonValue::Number(l.into()),
        Value::Float(f) => float(f as f64),
        Value::Double(d) => float(d),
        Value::ByteArray(ba) => tagged("__byte_array", ba.iter().map(|&b| b.into())),
        Value::IntArray(ia) => tagged("__int_array", ia.iter().map(|&i| i.into())),
        Value::LongArray(la) => tagged("__long_array", la.iter().map(|&l| l.into())),
    }
}

fn float(f: f64) -> JsonValue {
    Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
}

fn tagged(key: &str, values: impl Iterator<Item = Number>) -> JsonValue {
    let mut map = Map::new();
    map.insert(
        key.to_string(),
        JsonValue::Array(values.map(JsonValue::Number).collect()),
    );
    JsonValue::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastnbt::{ByteArray, LongArray};
    use std::collections::HashMap;

    #[test]
    fn test_typed_arrays_are_tagged() {
        let json = nbt_to_json(Value::LongArray(LongArray::new(vec![1, 2, 4096])));
        assert_eq!(json, serde_json::json!({ "__long_array": [1, 2, 4096] }));
        let json = nbt_to_json(Value::ByteArray(ByteArray::new(vec![-1, 0])));
        assert_eq!(json, serde_json::json!({ "__byte_array": [-1, 0] }));
    }

    #[test]
    fn test_compound_and_list() {
        let mut level = HashMap::new();
        level.insert("xPos".to_string(), Value::Int(-3));
        level.insert("Status".to_string(), Value::String("full".to_string()));
        level.insert(
            "Entities".to_string(),
            Value::List(vec![Value::Short(7), Value::Double(0.5)]),
        );
        let json = nbt_to_json(Value::Compound(level));
        assert_eq!(
            json,
            serde_json::json!({ "Entities": [7, 0.5], "Status": "full", "xPos": -3 })
        );
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(nbt_to_json(Value::Float(f32::NAN)), JsonValue::Null);
    }
}
