//! Collection operations
//!
//! Thin create/list/get/update/delete pass-throughs driven by a [`ResourceDef`].

use super::registry::{Operation, ResourceDef};
use super::schema::{encode, Attrs, Entity};
use crate::cloud::client::CloudClient;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Server-side list filters, forwarded verbatim as query parameters
pub type Query = BTreeMap<String, String>;

/// Values for `{param}` placeholders in a base path
pub type PathParams<'a> = &'a [(&'a str, &'a str)];

/// Delete behaviour. The default treats an already missing entity as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    pub ignore_missing: bool,
}

impl DeleteOptions {
    /// Report `NotFound` for a missing entity
    pub fn strict() -> Self {
        Self { ignore_missing: false }
    }
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self { ignore_missing: true }
    }
}

/// Fail before any network call if the type does not declare `operation`
pub fn require(def: &ResourceDef, operation: Operation) -> Result<()> {
    if def.allows(&operation) {
        Ok(())
    } else {
        Err(Error::UnsupportedOperation {
            resource: def.key.clone(),
            operation,
        })
    }
}

/// Substitute `{param}` placeholders in a path template
pub fn expand_path(template: &str, params: PathParams<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            return Err(Error::validation("path", format!("unterminated placeholder in {}", template)));
        };
        let name = &rest[start + 1..start + len];
        let value = params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::validation(name, "required path parameter is missing"))?;
        out.push_str(&urlencoding::encode(value));
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Path of a single item under the collection base path
pub fn item_path(def: &ResourceDef, params: PathParams<'_>, id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(Error::validation("id", "must not be empty"));
    }
    Ok(format!("{}/{}", expand_path(&def.base_path, params)?, urlencoding::encode(id)))
}

fn add_query_params(path: &str, def: &ResourceDef, query: &Query) -> String {
    let query_parts: Vec<String> = query
        .iter()
        .map(|(key, value)| {
            let key = def.query_aliases.get(key).unwrap_or(key);
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
        })
        .collect();

    if query_parts.is_empty() {
        path.to_string()
    } else if path.contains('?') {
        format!("{}&{}", path, query_parts.join("&"))
    } else {
        format!("{}?{}", path, query_parts.join("&"))
    }
}

/// Extract list items from a reply using the collection envelope key
fn extract_items(response: Value, resources_key: Option<&str>) -> Vec<Value> {
    let inner = match resources_key {
        Some(key) => match response {
            Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
            _ => Value::Null,
        },
        None => response,
    };

    match inner {
        Value::Array(items) => items,
        Value::Object(_) => vec![inner],
        _ => vec![],
    }
}

/// Strip the single-entity envelope, if the reply has one
fn unwrap_envelope(response: Value, resource_key: Option<&str>) -> Value {
    match (resource_key, response) {
        (Some(key), Value::Object(mut map)) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        (_, other) => other,
    }
}

fn wrap_envelope(body: Attrs, resource_key: Option<&str>) -> Value {
    match resource_key {
        Some(key) => {
            let mut outer = Map::new();
            outer.insert(key.to_string(), Value::Object(body));
            Value::Object(outer)
        },
        None => Value::Object(body),
    }
}

/// List a collection; `details` selects the detail path when the type has one
pub async fn fetch_resources(
    client: &CloudClient,
    def: &ResourceDef,
    params: PathParams<'_>,
    details: bool,
    query: &Query,
) -> Result<Vec<Entity>> {
    require(def, Operation::List)?;

    let template = match (&def.detail_path, details) {
        (Some(detail), true) => detail,
        _ => &def.base_path,
    };
    let path = add_query_params(&expand_path(template, params)?, def, query);

    let response = client.get(def.service, &path).await?;
    let items = extract_items(response, def.resources_key.as_deref());
    tracing::debug!("Listed {} {}", items.len(), def.key);

    Ok(items
        .into_iter()
        .map(|item| Entity::from_wire(def, item))
        .collect())
}

/// Fetch one entity by id
pub async fn fetch_resource(
    client: &CloudClient,
    def: &ResourceDef,
    params: PathParams<'_>,
    id: &str,
) -> Result<Entity> {
    require(def, Operation::Fetch)?;
    let path = item_path(def, params, id)?;

    let response = client
        .get(def.service, &path)
        .await
        .map_err(|e| e.for_resource(&def.key, id))?;

    Ok(Entity::from_wire(
        def,
        unwrap_envelope(response, def.resource_key.as_deref()),
    ))
}

/// Create an entity from logical attributes
pub async fn create_resource(
    client: &CloudClient,
    def: &ResourceDef,
    params: PathParams<'_>,
    attrs: &Attrs,
) -> Result<Entity> {
    require(def, Operation::Create)?;
    let body = wrap_envelope(encode(def, attrs)?, def.resource_key.as_deref());
    let path = expand_path(&def.base_path, params)?;

    let response = client.post(def.service, &path, Some(&body)).await?;
    let entity = Entity::from_wire(def, unwrap_envelope(response, def.resource_key.as_deref()));
    tracing::info!("Created {} {}", def.key, entity.id().unwrap_or("-"));

    Ok(entity)
}

/// Update an entity in place (PUT)
pub async fn update_resource(
    client: &CloudClient,
    def: &ResourceDef,
    params: PathParams<'_>,
    id: &str,
    attrs: &Attrs,
) -> Result<Entity> {
    require(def, Operation::Commit)?;
    let path = item_path(def, params, id)?;
    let body = wrap_envelope(encode(def, attrs)?, def.resource_key.as_deref());

    let response = client
        .put(def.service, &path, Some(&body))
        .await
        .map_err(|e| e.for_resource(&def.key, id))?;

    Ok(Entity::from_wire(
        def,
        unwrap_envelope(response, def.resource_key.as_deref()),
    ))
}

/// Delete an entity; a missing entity counts as deleted unless `options` is strict
pub async fn delete_resource(
    client: &CloudClient,
    def: &ResourceDef,
    params: PathParams<'_>,
    id: &str,
    options: DeleteOptions,
) -> Result<()> {
    require(def, Operation::Delete)?;
    let path = item_path(def, params, id)?;

    match client.delete(def.service, &path).await {
        Ok(_) => {
            tracing::info!("Deleted {} {}", def.key, id);
            Ok(())
        },
        Err(e) if e.is_not_found() && options.ignore_missing => {
            tracing::debug!("{} {} already gone", def.key, id);
            Ok(())
        },
        Err(e) => Err(e.for_resource(&def.key, id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::get_resource;
    use serde_json::json;

    #[test]
    fn test_expand_path_substitutes_and_encodes() {
        let path = expand_path("/shares/{share_id}/export_locations", &[("share_id", "a b")]).unwrap();
        assert_eq!(path, "/shares/a%20b/export_locations");
    }

    #[test]
    fn test_expand_path_requires_every_placeholder() {
        let err = expand_path("/share-networks/{share_network_id}/subnets", &[]).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "share_network_id"));
    }

    #[test]
    fn test_item_path_rejects_empty_id() {
        let share = get_resource("share").unwrap();
        assert!(item_path(share, &[], "").is_err());
        assert_eq!(item_path(share, &[], "abc").unwrap(), "/shares/abc");
    }

    #[test]
    fn test_query_aliases_are_applied() {
        let volume = get_resource("volume").unwrap();
        let mut query = Query::new();
        query.insert("all_projects".to_string(), "true".to_string());
        query.insert("status".to_string(), "in-use".to_string());
        assert_eq!(
            add_query_params("/volumes/detail", volume, &query),
            "/volumes/detail?all_tenants=true&status=in-use"
        );
    }

    #[test]
    fn test_query_passthrough_for_types_without_aliases() {
        let share = get_resource("share").unwrap();
        let mut query = Query::new();
        query.insert("all_projects".to_string(), "1".to_string());
        query.insert("name~".to_string(), "db".to_string());
        assert_eq!(
            add_query_params("/shares", share, &query),
            "/shares?all_projects=1&name~=db"
        );
    }

    #[test]
    fn test_extract_items_handles_object_listing() {
        let items = extract_items(json!({"limits": {"rate": [], "absolute": {}}}), Some("limits"));
        assert_eq!(items.len(), 1);
        assert!(extract_items(json!({"other": []}), Some("shares")).is_empty());
        assert_eq!(extract_items(json!([{"id": "1"}]), None).len(), 1);
    }

    #[test]
    fn test_delete_ignores_missing_unless_strict() {
        assert!(DeleteOptions::default().ignore_missing);
        assert!(!DeleteOptions::strict().ignore_missing);
    }

    #[test]
    fn test_require_reports_operation() {
        let pools = get_resource("storage_pool").unwrap();
        let err = require(pools, Operation::Delete).unwrap_err();
        assert_eq!(err.to_string(), "storage_pool does not support delete");
    }
}
