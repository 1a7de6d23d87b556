//! Action dispatch
//!
//! Named server-side operations are POSTed to `<base_path>/<id>/action` as a
//! single-key envelope `{ "<action>": params }`.

use super::collection::{item_path, require, PathParams};
use super::registry::{Operation, ResourceDef};
use crate::cloud::client::CloudClient;
use crate::error::Result;
use serde_json::{Map, Value};

/// Build the `{ action: params }` envelope
pub fn action_body(action: &str, params: Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert(action.to_string(), params);
    Value::Object(envelope)
}

/// Invoke a named action on an existing entity.
///
/// Always addresses the plain collection path, never the detail path. The
/// reply may be empty, in which case `Value::Null` is returned.
pub async fn invoke_action(
    client: &CloudClient,
    def: &ResourceDef,
    params: PathParams<'_>,
    id: &str,
    action: &str,
    body: Value,
) -> Result<Value> {
    require(def, Operation::Action(action.to_string()))?;
    let path = format!("{}/action", item_path(def, params, id)?);

    tracing::info!("execute_action: resource={}, action={}, id={}", def.key, action, id);

    client
        .post_action(def.service, &path, &action_body(action, body))
        .await
        .map_err(|e| e.for_resource(&def.key, id))
}

/// Outcome of comparing a requested size with the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    Extend { new_size: i64, force: bool },
    Shrink { new_size: i64 },
}

/// Decide which resize action, if any, applies.
///
/// Equal sizes, or a direction suppressed by its flag, yield `None`.
pub fn resize_direction(
    current: i64,
    new_size: i64,
    no_shrink: bool,
    no_extend: bool,
    force: bool,
) -> Option<Resize> {
    if new_size > current && !no_extend {
        Some(Resize::Extend { new_size, force })
    } else if new_size < current && !no_shrink {
        Some(Resize::Shrink { new_size })
    } else {
        None
    }
}
