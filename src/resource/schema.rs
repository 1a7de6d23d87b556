//! Schema mapping between logical attributes and wire bodies
//!
//! Each [`ResourceDef`] carries an ordered field list. `encode` turns the
//! attribute names callers use into request body keys, `decode` does the
//! reverse for replies. Keys the schema does not know about pass through
//! untouched in both directions so newer API fields are not lost.

use super::registry::{FieldDef, ResourceDef};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute / body mapping
pub type Attrs = Map<String, Value>;

/// Value kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    /// Boolean carried on the wire as the string `"true"` / `"false"`
    BoolStr,
    /// Native JSON boolean
    Boolean,
    Mapping,
    List,
    #[default]
    Any,
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Coerce a logical value into its wire form
fn to_wire(field: &FieldDef, value: &Value) -> Result<Value> {
    let reject = || {
        Error::validation(
            &field.name,
            format!("expected {:?}, got {}", field.kind, describe(value)),
        )
    };

    if value.is_null() {
        return Ok(Value::Null);
    }

    match field.kind {
        FieldKind::Any => Ok(value.clone()),
        FieldKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(reject()),
        },
        FieldKind::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| Error::validation(&field.name, format!("{:?} is not an integer", s))),
            _ => Err(reject()),
        },
        FieldKind::BoolStr => match value {
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::String(s) => parse_bool(s)
                .map(|b| Value::String(b.to_string()))
                .ok_or_else(|| Error::validation(&field.name, format!("{:?} is not boolean-like", s))),
            _ => Err(reject()),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => parse_bool(s)
                .map(Value::Bool)
                .ok_or_else(|| Error::validation(&field.name, format!("{:?} is not boolean-like", s))),
            _ => Err(reject()),
        },
        FieldKind::Mapping => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(reject()),
        },
        FieldKind::List => match value {
            Value::Array(_) => Ok(value.clone()),
            _ => Err(reject()),
        },
    }
}

/// Coerce a wire value into its logical form; falls back to the raw value
fn from_wire(field: &FieldDef, value: Value) -> Value {
    let coerced = match (field.kind, &value) {
        (FieldKind::BoolStr | FieldKind::Boolean, Value::String(s)) => parse_bool(s).map(Value::Bool),
        (FieldKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => return value,
    };

    coerced.unwrap_or_else(|| {
        tracing::warn!(
            "Keeping raw value for {} ({:?}): {}",
            field.wire_key,
            field.kind,
            value
        );
        value
    })
}

/// Translate logical attributes into a wire body.
///
/// A declared wire key is accepted in place of its logical name and coerced
/// the same way.
pub fn encode(def: &ResourceDef, attrs: &Attrs) -> Result<Attrs> {
    let mut body = Map::new();
    for (name, value) in attrs {
        match def.field(name).or_else(|| def.field_by_wire_key(name)) {
            Some(field) => {
                body.insert(field.wire_key.clone(), to_wire(field, value)?);
            },
            None => {
                body.insert(name.clone(), value.clone());
            },
        }
    }
    Ok(body)
}

/// Translate a wire body into logical attributes
pub fn decode(def: &ResourceDef, body: Attrs) -> Attrs {
    body.into_iter()
        .map(|(key, value)| match def.field_by_wire_key(&key) {
            Some(field) => (field.name.clone(), from_wire(field, value)),
            None => (key, value),
        })
        .collect()
}

/// A single addressable resource instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    #[serde(skip)]
    resource: String,
    #[serde(flatten)]
    attrs: Attrs,
}

impl Entity {
    /// Build an entity from caller-supplied logical attributes
    pub fn new(def: &ResourceDef, attrs: Attrs) -> Self {
        Self {
            resource: def.key.clone(),
            attrs,
        }
    }

    /// Build an entity that only carries its id
    pub fn reference(def: &ResourceDef, id: &str) -> Self {
        let mut attrs = Map::new();
        attrs.insert("id".to_string(), Value::String(id.to_string()));
        Self::new(def, attrs)
    }

    /// Decode a server reply body
    pub fn from_wire(def: &ResourceDef, body: Value) -> Self {
        let attrs = match body {
            Value::Object(map) => decode(def, map),
            Value::Null => Map::new(),
            other => {
                tracing::warn!("Unexpected {} body for {}", describe(&other), def.key);
                Map::new()
            },
        };
        Self::new(def, attrs)
    }

    /// Registry key of the entity type
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn into_attrs(self) -> Attrs {
        self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.attrs.get(name).and_then(Value::as_i64)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn status(&self) -> Option<&str> {
        self.get_str("status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::get_resource;
    use serde_json::json;

    fn attrs(value: Value) -> Attrs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_volume_bool_fields_are_sent_as_strings() {
        let volume = get_resource("volume").unwrap();
        let body = encode(
            volume,
            &attrs(json!({"name": "data", "is_bootable": true, "is_encrypted": "No", "size": "10"})),
        )
        .unwrap();

        assert_eq!(body["bootable"], json!("true"));
        assert_eq!(body["encrypted"], json!("false"));
        assert_eq!(body["size"], json!(10));
        assert!(!body.contains_key("is_bootable"));
    }

    #[test]
    fn test_wire_key_input_is_coerced_like_its_field() {
        let volume = get_resource("volume").unwrap();
        let body = encode(volume, &attrs(json!({"bootable": true, "imageRef": "img-1"}))).unwrap();

        assert_eq!(body["bootable"], json!("true"));
        assert_eq!(body["imageRef"], json!("img-1"));
        assert_eq!(
            decode(volume, body),
            attrs(json!({"is_bootable": true, "image_id": "img-1"}))
        );

        let err = encode(volume, &attrs(json!({"size": "big"}))).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_entity_hands_back_its_attributes() {
        let share = get_resource("share").unwrap();
        let entity = Entity::from_wire(share, json!({"id": "s1", "share_proto": "NFS"}));
        assert_eq!(entity.into_attrs(), attrs(json!({"id": "s1", "share_protocol": "NFS"})));
    }

    #[test]
    fn test_volume_wire_keys_are_renamed_on_decode() {
        let volume = get_resource("volume").unwrap();
        let decoded = decode(
            volume,
            attrs(json!({
                "os-vol-host-attr:host": "node1@lvm#pool",
                "bootable": "false",
                "imageRef": "img-1",
                "brand_new_field": 7
            })),
        );

        assert_eq!(decoded["host"], json!("node1@lvm#pool"));
        assert_eq!(decoded["is_bootable"], json!(false));
        assert_eq!(decoded["image_id"], json!("img-1"));
        assert_eq!(decoded["brand_new_field"], json!(7));
    }

    #[test]
    fn test_unknown_keys_pass_through_encode() {
        let share = get_resource("share").unwrap();
        let body = encode(share, &attrs(json!({"share_protocol": "NFS", "scheduler_hints": {"a": "b"}}))).unwrap();
        assert_eq!(body["share_proto"], json!("NFS"));
        assert_eq!(body["scheduler_hints"], json!({"a": "b"}));
    }

    #[test]
    fn test_invalid_bool_str_is_rejected() {
        let volume = get_resource("volume").unwrap();
        let err = encode(volume, &attrs(json!({"is_bootable": "maybe"}))).unwrap_err();
        match err {
            Error::Validation { field, .. } => assert_eq!(field, "is_bootable"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_mapping_and_integer_kinds_reject_wrong_shapes() {
        let volume = get_resource("volume").unwrap();
        assert!(encode(volume, &attrs(json!({"metadata": "k=v"}))).is_err());
        assert!(encode(volume, &attrs(json!({"size": 1.5}))).is_err());
        assert!(encode(volume, &attrs(json!({"size": "ten"}))).is_err());
    }

    #[test]
    fn test_null_is_always_accepted() {
        let volume = get_resource("volume").unwrap();
        let body = encode(volume, &attrs(json!({"is_bootable": null, "size": null}))).unwrap();
        assert_eq!(body["bootable"], Value::Null);
        assert_eq!(body["size"], Value::Null);
    }

    #[test]
    fn test_decode_keeps_uncoercible_values() {
        let volume = get_resource("volume").unwrap();
        let decoded = decode(volume, attrs(json!({"bootable": "sometimes", "size": "huge"})));
        assert_eq!(decoded["is_bootable"], json!("sometimes"));
        assert_eq!(decoded["size"], json!("huge"));
    }

    #[test]
    fn test_entity_reference_and_accessors() {
        let share = get_resource("share").unwrap();
        let entity = Entity::reference(share, "abc");
        assert_eq!(entity.id(), Some("abc"));
        assert_eq!(entity.status(), None);
        assert_eq!(entity.resource(), "share");

        let entity = Entity::from_wire(share, json!({"id": "abc", "size": 5, "status": "available"}));
        assert_eq!(entity.get_i64("size"), Some(5));
        assert_eq!(entity.status(), Some("available"));
    }

    #[test]
    fn test_entity_from_empty_body() {
        let share = get_resource("share").unwrap();
        let entity = Entity::from_wire(share, Value::Null);
        assert!(entity.attrs().is_empty());
    }
}
