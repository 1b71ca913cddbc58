//! Store items: attribute maps with DynamoDB-typed values.
//!
//! Both backends speak this shape, so the local table file holds the same
//! JSON a DynamoDB export would (`{"S": ".."}`, `{"N": "100"}`, ...).
//! Numbers stay decimal strings inside the store; they become plain JSON
//! numbers only when rendered for a client (see [`item_to_json`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// One attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    #[serde(rename = "S")]
    S(String),
    /// Arbitrary-precision decimal kept as text.
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "L")]
    L(Vec<AttrValue>),
    #[serde(rename = "M")]
    M(BTreeMap<String, AttrValue>),
}

/// A stored item (attribute name -> value).
pub type Item = BTreeMap<String, AttrValue>;

impl AttrValue {
    pub fn number<N: ToString>(n: N) -> Self {
        AttrValue::N(n.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::N(n) => n.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Plain JSON rendering of this value.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::S(s) => Value::String(s.clone()),
            AttrValue::N(n) => decimal_to_json(n),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Null(_) => Value::Null,
            AttrValue::L(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::M(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
        }
    }
}

/// Decimal text -> JSON number.
///
/// Integral values that fit 64 bits stay integers (`100`, not `100.0`);
/// anything else goes through f64. Text that is not a number at all is
/// passed through as a string rather than dropped.
pub fn decimal_to_json(text: &str) -> Value {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Ok(u) = t.parse::<u64>() {
        return Value::Number(Number::from(u));
    }
    if let Ok(f) = t.parse::<f64>() {
        // "1E+2" and "100.000" are integral decimals too
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return Value::Number(Number::from(f as i64));
        }
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

/// Render a whole item as a JSON object.
pub fn item_to_json(item: &Item) -> Value {
    let mut out = Map::new();
    for (k, v) in item {
        out.insert(k.clone(), v.to_json());
    }
    Value::Object(out)
}

/// Render a sequence of items as a JSON array, preserving order.
pub fn items_to_json(items: &[Item]) -> Value {
    Value::Array(items.iter().map(item_to_json).collect())
}

/// Drop every string attribute whose value is empty.
pub fn drop_empty_strings(item: &mut Item) {
    item.retain(|_, v| !matches!(v, AttrValue::S(s) if s.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_render_as_plain_numbers() {
        assert_eq!(decimal_to_json("100").to_string(), "100");
        assert_eq!(decimal_to_json("-7").to_string(), "-7");
        assert_eq!(decimal_to_json("1.5").to_string(), "1.5");
        assert_eq!(decimal_to_json("100.000").to_string(), "100");
        assert_eq!(decimal_to_json("1E+2").to_string(), "100");
        assert_eq!(decimal_to_json("18446744073709551615").to_string(), "18446744073709551615");
        assert_eq!(decimal_to_json("abc"), Value::String("abc".into()));
    }

    #[test]
    fn wire_shape_matches_dynamodb_json() {
        let mut item = Item::new();
        item.insert("snapshotId".into(), AttrValue::S("snap-1".into()));
        item.insert("volumeSize".into(), AttrValue::number(8));
        item.insert("encrypted".into(), AttrValue::Bool(false));

        let text = serde_json::to_string(&item).unwrap();
        assert_eq!(
            text,
            r#"{"encrypted":{"BOOL":false},"snapshotId":{"S":"snap-1"},"volumeSize":{"N":"8"}}"#
        );
        let back: Item = serde_json::from_str(&text).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn nested_values_render_recursively() {
        let mut inner = BTreeMap::new();
        inner.insert("size".to_string(), AttrValue::number(3));
        let v = AttrValue::L(vec![AttrValue::M(inner), AttrValue::Null(true)]);
        assert_eq!(v.to_json().to_string(), r#"[{"size":3},null]"#);
    }

    #[test]
    fn empty_strings_are_dropped_but_other_values_kept() {
        let mut item = Item::new();
        item.insert("ownerAlias".into(), AttrValue::S(String::new()));
        item.insert("description".into(), AttrValue::S("x".into()));
        item.insert("volumeSize".into(), AttrValue::number(0));
        item.insert("encrypted".into(), AttrValue::Bool(false));
        drop_empty_strings(&mut item);

        assert!(!item.contains_key("ownerAlias"));
        assert_eq!(item.len(), 3);
    }
}
