//! One-line text for serialized values, used by the flat inspector and for
//! node labels

use crate::memory::format::{format_float, quote_str};
use crate::snapshot::SerializedValue;

/// Drawn wherever a value refers back to a container on its own path
pub const CYCLE_GLYPH: &str = "⟳";

fn joined(items: &[SerializedValue]) -> String {
    items.iter().map(format_value).collect::<Vec<_>>().join(", ")
}

pub fn format_value(value: &SerializedValue) -> String {
    match value {
        SerializedValue::None => "None".to_string(),
        SerializedValue::Bool(true) => "True".to_string(),
        SerializedValue::Bool(false) => "False".to_string(),
        SerializedValue::Int(n) => n.to_string(),
        SerializedValue::Float(f) => format_float(*f),
        SerializedValue::Str(s) => quote_str(s),
        SerializedValue::PlainList(items) | SerializedValue::List { items, .. } => {
            format!("[{}]", joined(items))
        }
        SerializedValue::Tuple(items) if items.len() == 1 => format!("({},)", joined(items)),
        SerializedValue::Tuple(items) => format!("({})", joined(items)),
        SerializedValue::Set(items) if items.is_empty() => "set()".to_string(),
        SerializedValue::Set(items) => format!("{{{}}}", joined(items)),
        SerializedValue::Deque(items) => format!("deque([{}])", joined(items)),
        SerializedValue::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote_str(k), format_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        SerializedValue::Object { class, data, .. } => {
            let fields: Vec<String> = data
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{}{{{}}}", class, fields.join(", "))
        }
        SerializedValue::Cyclic { .. } => CYCLE_GLYPH.to_string(),
    }
}

/// Like [`format_value`] but strings are shown bare
pub fn label_text(value: &SerializedValue) -> String {
    match value {
        SerializedValue::Str(s) => s.clone(),
        other => format_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_scalars() {
        assert_eq!(format_value(&SerializedValue::None), "None");
        assert_eq!(format_value(&SerializedValue::Bool(false)), "False");
        assert_eq!(format_value(&SerializedValue::Float(2.0)), "2.0");
        assert_eq!(format_value(&SerializedValue::Str("hi".into())), "'hi'");
        assert_eq!(label_text(&SerializedValue::Str("hi".into())), "hi");
    }

    #[test]
    fn test_containers() {
        let one = vec![SerializedValue::Int(1)];
        assert_eq!(format_value(&SerializedValue::Tuple(one.clone())), "(1,)");
        assert_eq!(format_value(&SerializedValue::Set(Vec::new())), "set()");
        assert_eq!(format_value(&SerializedValue::Deque(one)), "deque([1])");

        let mut data = IndexMap::new();
        data.insert("val".to_string(), SerializedValue::Int(4));
        data.insert("next".to_string(), SerializedValue::Cyclic { id: "1".into() });
        let node = SerializedValue::Object {
            id: "1".into(),
            class: "Node".into(),
            data,
        };
        assert_eq!(format_value(&node), "Node{val: 4, next: ⟳}");
    }
}
