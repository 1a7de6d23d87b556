//! OpenStack API interaction module
//!
//! This module provides the transport for talking to the block storage and
//! shared file system REST APIs.
//!
//! # Module Structure
//!
//! - [`client`] - Main client holding endpoints, token and microversions
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use tstack::cloud::client::{CloudClient, Endpoints};
//! use tstack::resource::Service;
//!
//! async fn example(endpoints: Endpoints) -> tstack::Result<()> {
//!     let client = CloudClient::new(endpoints, Some("token".to_string()))?;
//!     let shares = client.get(Service::SharedFileSystem, "/shares/detail").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
