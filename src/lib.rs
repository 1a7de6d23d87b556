//! # tstack
//!
//! Client library for OpenStack block storage volumes and shared file system
//! shares.
//!
//! Resource types are declared as data (see [`resource::registry`]): each
//! definition maps logical attribute names to wire keys and value kinds, and
//! lists which operations and actions the type supports. Generic routines
//! then handle collection CRUD, `<base_path>/<id>/action` envelopes and status
//! polling for every type.
//!
//! ## Modules
//!
//! - [`cloud`] - HTTP transport and endpoint handling
//! - [`config`] - Persistent configuration with `OS_*` environment overrides
//! - [`error`] - Error taxonomy
//! - [`resource`] - Schemas, collection operations, actions, polling
//! - [`service`] - Named operations per service

pub mod cloud;
pub mod config;
pub mod error;
pub mod resource;
pub mod service;

pub use cloud::client::{CloudClient, Endpoints};
pub use error::{Error, Result};
pub use resource::{Entity, Query, WaitOptions};
