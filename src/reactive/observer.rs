//! Observer - turns plain data into the reactive graph.
//!
//! Walks a JSON document recursively: every object becomes an [`ObjectRef`]
//! whose properties are reactive cells with fresh dependencies, every array
//! becomes an observable [`ArrayRef`] whose elements are observed in turn.
//!
//! `Value::from(json)` goes through here, which is how values inserted by
//! array operations or property writes arrive already observed.

use serde_json::Value as Json;

use super::{ArrayRef, ObjectRef};
use crate::types::Value;

/// Observe a JSON value, producing its reactive counterpart.
pub fn observe(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(ArrayRef::from_values(items.iter().map(observe))),
        Json::Object(map) => Value::Object(observe_object(map)),
    }
}

/// Observe a JSON object.
pub fn observe_object(map: &serde_json::Map<String, Json>) -> ObjectRef {
    ObjectRef::from_pairs(map.iter().map(|(k, v)| (k.clone(), observe(v))))
}

/// Snapshot the reactive graph back into JSON, without tracking.
///
/// Functions and `undefined` become `null`; non-finite numbers become `null`.
/// The graph must be acyclic.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Undefined | Value::Null | Value::Function(_) => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(a) => Json::Array(a.to_vec().iter().map(to_json).collect()),
        Value::Object(o) => Json::Object(
            o.keys()
                .into_iter()
                .map(|k| {
                    let v = to_json(&o.peek(&k));
                    (k, v)
                })
                .collect(),
        ),
    }
}

/// Integral numbers in `i64` range come back as JSON integers.
fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        observe(&json)
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        observe(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_observe_nested_graph() {
        let value = observe(&json!({
            "user": { "name": "ada", "tags": ["x", "y"] },
            "count": 3
        }));

        let root = value.as_object().unwrap();
        assert_eq!(root.keys(), vec!["user".to_string(), "count".to_string()]);

        let user = root.peek("user");
        let user = user.as_object().unwrap();
        assert!(user.cell("name").is_some());

        let tags = user.peek("tags");
        assert_eq!(tags.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_inserted_json_is_observed() {
        let list = ArrayRef::new();
        list.push(json!({ "done": false })).unwrap();

        let item = list.get(0);
        let item = item.as_object().unwrap();
        assert!(item.cell("done").is_some());
    }

    #[test]
    fn test_to_json_snapshot() {
        let data = json!({ "a": [1, 2, { "b": null }], "s": "t" });
        assert_eq!(to_json(&observe(&data)), data);
    }

    #[test]
    fn test_to_json_keeps_integers_and_fractions() {
        let data = json!({ "n": 3, "neg": -7, "f": 1.5, "big": 9007199254740992i64 });
        let out = to_json(&observe(&data));
        assert_eq!(out, data);
        assert!(out["n"].is_i64());
        assert!(out["f"].is_f64());
        assert_eq!(to_json(&Value::Number(f64::NAN)), Json::Null);
    }
}
