//! Path selection inside JSON/YAML documents.

use serde_json::Value as JsonValue;
use std::str::FromStr;

use crate::error::Error;

/// A dotted path such as `.items.0.name` or `items[0].name`.
///
/// Object members are selected by key, array elements by index. A non-index
/// segment applied to an array is mapped over its elements. Anything that
/// does not resolve selects null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSelector {
    segments: Vec<String>,
}

impl PathSelector {
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
        let normalized = expr.replace('[', ".").replace(']', "");
        let segments = normalized
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn is_identity(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn select(&self, doc: &JsonValue) -> JsonValue {
        select(doc, &self.segments)
    }
}

impl FromStr for PathSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

fn select(value: &JsonValue, segments: &[String]) -> JsonValue {
    let Some((head, rest)) = segments.split_first() else {
        return value.clone();
    };
    match value {
        JsonValue::Object(map) => map.get(head).map_or(JsonValue::Null, |v| select(v, rest)),
        JsonValue::Array(items) => match head.parse::<usize>() {
            Ok(i) => items.get(i).map_or(JsonValue::Null, |v| select(v, rest)),
            Err(_) => JsonValue::Array(items.iter().map(|v| select(v, segments)).collect()),
        },
        _ => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_member() {
        let doc = json!({"menu": {"items": [{"id": 1}, {"id": 2}]}});
        assert_eq!(PathSelector::parse(".menu.items").select(&doc), json!([{"id": 1}, {"id": 2}]));
        assert_eq!(PathSelector::parse("menu.items.1.id").select(&doc), json!(2));
        assert_eq!(PathSelector::parse("menu.items[0]").select(&doc), json!({"id": 1}));
    }

    #[test]
    fn test_map_over_array() {
        let doc = json!([{"a": {"b": 1}}, {"a": {"b": 2}}]);
        assert_eq!(PathSelector::parse("a.b").select(&doc), json!([1, 2]));
    }

    #[test]
    fn test_missing() {
        let doc = json!({"a": 1});
        assert_eq!(PathSelector::parse("b").select(&doc), JsonValue::Null);
        assert_eq!(PathSelector::parse("a.b").select(&doc), JsonValue::Null);
    }

    #[test]
    fn test_identity() {
        let p = PathSelector::parse(".");
        assert!(p.is_identity());
        assert_eq!(p.select(&json!([1])), json!([1]));
    }
}
