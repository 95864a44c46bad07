//! Serialized value wire shape
//!
//! Primitives map to their JSON counterparts. Containers with identity carry
//! a `__type__` tag so viewers can tell them apart from plain JSON arrays and
//! objects:
//!
//! | value                  | JSON                                                 |
//! |------------------------|------------------------------------------------------|
//! | tracked list           | `{"__type__":"list","id":…,"items":[…]}`             |
//! | plain list             | `[…]`                                                |
//! | tuple / set / deque    | `{"__type__":"tuple","items":[…]}` (etc.)            |
//! | dict                   | `{…}` with stringified keys                          |
//! | instance               | `{"__type__":"object","id":…,"class":…,"data":{…}}` |
//! | back-reference (cycle) | `{"__type__":"cyclic","id":…}`                       |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

pub const TYPE_TAG: &str = "__type__";

/// A JSON-safe copy of a runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Json", into = "Json")]
pub enum SerializedValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Untracked list
    PlainList(Vec<SerializedValue>),
    /// Access-tracked list with identity
    List {
        id: String,
        items: Vec<SerializedValue>,
    },
    Tuple(Vec<SerializedValue>),
    Set(Vec<SerializedValue>),
    Deque(Vec<SerializedValue>),
    Mapping(IndexMap<String, SerializedValue>),
    Object {
        id: String,
        class: String,
        data: IndexMap<String, SerializedValue>,
    },
    /// Reference back to a container already on the current path
    Cyclic {
        id: String,
    },
}

impl SerializedValue {
    /// Tagged list, plain list or tuple: anything drawn as an array
    pub fn sequence_items(&self) -> Option<&[SerializedValue]> {
        match self {
            SerializedValue::PlainList(items)
            | SerializedValue::List { items, .. }
            | SerializedValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Items of any list-like value, including sets and deques
    pub fn collection_items(&self) -> Option<&[SerializedValue]> {
        match self {
            SerializedValue::Set(items) | SerializedValue::Deque(items) => Some(items),
            other => other.sequence_items(),
        }
    }

    /// Field map of a mapping or an object
    pub fn fields(&self) -> Option<&IndexMap<String, SerializedValue>> {
        match self {
            SerializedValue::Mapping(map) => Some(map),
            SerializedValue::Object { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            SerializedValue::List { id, .. }
            | SerializedValue::Object { id, .. }
            | SerializedValue::Cyclic { id } => Some(id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SerializedValue::Int(n) => Some(*n as f64),
            SerializedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            SerializedValue::None
                | SerializedValue::Bool(_)
                | SerializedValue::Int(_)
                | SerializedValue::Float(_)
                | SerializedValue::Str(_)
        )
    }
}

fn tagged(tag: &str, mut fields: Map<String, Json>) -> Json {
    let mut map = Map::new();
    map.insert(TYPE_TAG.to_string(), Json::from(tag));
    map.append(&mut fields);
    Json::Object(map)
}

fn items_json(items: Vec<SerializedValue>) -> Json {
    Json::Array(items.into_iter().map(Json::from).collect())
}

fn fields_json(fields: IndexMap<String, SerializedValue>) -> Json {
    Json::Object(fields.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
}

impl From<SerializedValue> for Json {
    fn from(value: SerializedValue) -> Self {
        match value {
            SerializedValue::None => Json::Null,
            SerializedValue::Bool(b) => Json::Bool(b),
            SerializedValue::Int(n) => Json::from(n),
            // JSON has no NaN/Infinity; fall back to their text form
            SerializedValue::Float(f) => Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(crate::memory::format::format_float(f))),
            SerializedValue::Str(s) => Json::String(s),
            SerializedValue::PlainList(items) => items_json(items),
            SerializedValue::List { id, items } => {
                let mut fields = Map::new();
                fields.insert("id".into(), Json::String(id));
                fields.insert("items".into(), items_json(items));
                tagged("list", fields)
            }
            SerializedValue::Tuple(items) => {
                tagged("tuple", Map::from_iter([("items".to_string(), items_json(items))]))
            }
            SerializedValue::Set(items) => {
                tagged("set", Map::from_iter([("items".to_string(), items_json(items))]))
            }
            SerializedValue::Deque(items) => {
                tagged("deque", Map::from_iter([("items".to_string(), items_json(items))]))
            }
            SerializedValue::Mapping(map) => fields_json(map),
            SerializedValue::Object { id, class, data } => {
                let mut fields = Map::new();
                fields.insert("id".into(), Json::String(id));
                fields.insert("class".into(), Json::String(class));
                fields.insert("data".into(), fields_json(data));
                tagged("object", fields)
            }
            SerializedValue::Cyclic { id } => {
                tagged("cyclic", Map::from_iter([("id".to_string(), Json::String(id))]))
            }
        }
    }
}

fn items_from(value: Option<&Json>) -> Option<Vec<SerializedValue>> {
    match value {
        Some(Json::Array(items)) => Some(items.iter().cloned().map(SerializedValue::from).collect()),
        _ => None,
    }
}

fn fields_from(map: Map<String, Json>) -> IndexMap<String, SerializedValue> {
    map.into_iter()
        .map(|(k, v)| (k, SerializedValue::from(v)))
        .collect()
}

/// Ids are emitted as strings; accept numbers too
fn id_from(value: Option<&Json>) -> Option<String> {
    match value {
        Some(Json::String(s)) => Some(s.clone()),
        Some(Json::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl From<Json> for SerializedValue {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => SerializedValue::None,
            Json::Bool(b) => SerializedValue::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => SerializedValue::Int(i),
                None => SerializedValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => SerializedValue::Str(s),
            Json::Array(items) => {
                SerializedValue::PlainList(items.into_iter().map(SerializedValue::from).collect())
            }
            Json::Object(map) => {
                let tag = map.get(TYPE_TAG).and_then(Json::as_str).map(str::to_string);
                let decoded = match tag.as_deref() {
                    Some("list") => id_from(map.get("id"))
                        .zip(items_from(map.get("items")))
                        .map(|(id, items)| SerializedValue::List { id, items }),
                    Some("tuple") => items_from(map.get("items")).map(SerializedValue::Tuple),
                    Some("set") => items_from(map.get("items")).map(SerializedValue::Set),
                    Some("deque") => items_from(map.get("items")).map(SerializedValue::Deque),
                    Some("cyclic") => {
                        id_from(map.get("id")).map(|id| SerializedValue::Cyclic { id })
                    }
                    Some("object") => {
                        let class = map
                            .get("class")
                            .and_then(Json::as_str)
                            .unwrap_or("object")
                            .to_string();
                        match (id_from(map.get("id")), map.get("data")) {
                            (Some(id), Some(Json::Object(data))) => Some(SerializedValue::Object {
                                id,
                                class,
                                data: fields_from(data.clone()),
                            }),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                // Unknown or malformed tags degrade to a plain mapping
                decoded.unwrap_or_else(|| SerializedValue::Mapping(fields_from(map)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_shapes() {
        let value = SerializedValue::List {
            id: "3".into(),
            items: vec![
                SerializedValue::Int(1),
                SerializedValue::Tuple(vec![SerializedValue::Str("a".into())]),
                SerializedValue::Cyclic { id: "3".into() },
            ],
        };
        assert_eq!(
            Json::from(value),
            json!({
                "__type__": "list",
                "id": "3",
                "items": [1, {"__type__": "tuple", "items": ["a"]}, {"__type__": "cyclic", "id": "3"}]
            })
        );
    }

    #[test]
    fn test_plain_containers_are_untagged() {
        let mut map = IndexMap::new();
        map.insert(
            "k".to_string(),
            SerializedValue::PlainList(vec![SerializedValue::None]),
        );
        assert_eq!(
            Json::from(SerializedValue::Mapping(map)),
            json!({"k": [null]})
        );
    }

    #[test]
    fn test_object_decodes() {
        let decoded = SerializedValue::from(json!({
            "__type__": "object", "id": "9", "class": "Node",
            "data": {"val": 1, "next": null}
        }));
        match decoded {
            SerializedValue::Object { id, class, data } => {
                assert_eq!(id, "9");
                assert_eq!(class, "Node");
                assert_eq!(data.get("val"), Some(&SerializedValue::Int(1)));
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_tag_degrades_to_mapping() {
        let decoded = SerializedValue::from(json!({"__type__": "list"}));
        assert!(matches!(decoded, SerializedValue::Mapping(_)));
    }

    #[test]
    fn test_non_finite_float_becomes_text() {
        assert_eq!(Json::from(SerializedValue::Float(f64::INFINITY)), json!("inf"));
    }
}
