//! Resource abstraction layer
//!
//! This module provides a data-driven approach to managing storage resources.
//! Resource definitions are loaded from JSON files at compile time, so a new
//! resource type or field is a data change rather than a code change.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`schema`] - Encodes logical attributes to wire bodies and back
//! - [`collection`] - List/get/create/update/delete against a definition
//! - [`action`] - `<base_path>/<id>/action` envelopes and the resize policy
//! - [`wait`] - Status and deletion polling
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `block_storage.json` - Block storage volumes
//! - `shared_file_system.json` - Shares, snapshots, networks, access rules, ...
//!
//! # Example
//!
//! ```ignore
//! use tstack::resource::{fetch_resources, get_resource, Query};
//! use tstack::cloud::client::CloudClient;
//!
//! async fn list_shares(client: &CloudClient) -> tstack::Result<Vec<tstack::resource::Entity>> {
//!     let shares = get_resource("share").unwrap();
//!     fetch_resources(client, shares, &[], true, &Query::new()).await
//! }
//! ```

pub mod action;
pub mod collection;
pub mod registry;
pub mod schema;
pub mod wait;

pub use action::{invoke_action, resize_direction, Resize};
pub use collection::{
    create_resource, delete_resource, fetch_resource, fetch_resources, update_resource, DeleteOptions,
    Query,
};
pub use registry::*;
pub use schema::{decode, encode, Attrs, Entity, FieldKind};
pub use wait::{wait_for_delete, wait_for_status, WaitOptions};
