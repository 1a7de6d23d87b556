//! OpenStack Client
//!
//! Main client for talking to the storage services, combining endpoint
//! configuration, the auth token and the HTTP layer.

use super::http::{CloudHttpClient, RequestOptions};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::resource::Service;
use serde_json::Value;
use url::Url;

/// Service endpoints, e.g. `https://cinder.example.com/v3/<project_id>`
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub block_storage: Option<Url>,
    pub shared_file_system: Option<Url>,
}

/// Microversions requested per service
#[derive(Debug, Clone, Default)]
pub struct Microversions {
    pub block_storage: Option<String>,
    pub shared_file_system: Option<String>,
}

/// Main OpenStack client
#[derive(Clone)]
pub struct CloudClient {
    pub http: CloudHttpClient,
    pub endpoints: Endpoints,
    pub microversions: Microversions,
    token: Option<String>,
}

impl CloudClient {
    /// Create a new client
    pub fn new(endpoints: Endpoints, token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: CloudHttpClient::new()?,
            endpoints,
            microversions: Microversions::default(),
            token,
        })
    }

    /// Build a client from the effective configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoints = Endpoints {
            block_storage: config
                .block_storage_endpoint
                .as_deref()
                .map(parse_endpoint)
                .transpose()?,
            shared_file_system: config
                .shared_file_system_endpoint
                .as_deref()
                .map(parse_endpoint)
                .transpose()?,
        };

        let mut client = Self::new(endpoints, config.auth_token.clone())?;
        client.microversions = Microversions {
            block_storage: config.block_storage_microversion.clone(),
            shared_file_system: config.shared_file_system_microversion.clone(),
        };
        Ok(client)
    }

    /// Replace the auth token
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    /// Get the endpoint of a service
    pub fn endpoint(&self, service: Service) -> Result<&Url> {
        let endpoint = match service {
            Service::BlockStorage => self.endpoints.block_storage.as_ref(),
            Service::SharedFileSystem => self.endpoints.shared_file_system.as_ref(),
        };
        endpoint.ok_or_else(|| Error::Config(format!("no endpoint configured for {}", service)))
    }

    /// Build a full URL from a service endpoint and an API path
    pub fn service_url(&self, service: Service, path: &str) -> Result<String> {
        let base = self.endpoint(service)?;
        Ok(format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    fn api_version(&self, service: Service) -> Option<String> {
        let version = match service {
            Service::BlockStorage => self.microversions.block_storage.as_deref(),
            Service::SharedFileSystem => self.microversions.shared_file_system.as_deref(),
        }?;
        Some(format!("{} {}", service, version))
    }

    /// Make a GET request against a service path
    pub async fn get(&self, service: Service, path: &str) -> Result<Value> {
        let url = self.service_url(service, path)?;
        let version = self.api_version(service);
        let options = RequestOptions {
            no_accept: false,
            api_version: version.as_deref(),
        };
        self.http.get(&url, self.token.as_deref(), options).await
    }

    /// Make a POST request against a service path
    pub async fn post(&self, service: Service, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.service_url(service, path)?;
        let version = self.api_version(service);
        let options = RequestOptions {
            no_accept: false,
            api_version: version.as_deref(),
        };
        self.http.post(&url, self.token.as_deref(), body, options).await
    }

    /// POST an action envelope; requests no particular reply content type
    pub async fn post_action(&self, service: Service, path: &str, body: &Value) -> Result<Value> {
        let url = self.service_url(service, path)?;
        let version = self.api_version(service);
        let options = RequestOptions {
            no_accept: true,
            api_version: version.as_deref(),
        };
        self.http.post(&url, self.token.as_deref(), Some(body), options).await
    }

    /// Make a PUT request against a service path
    pub async fn put(&self, service: Service, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.service_url(service, path)?;
        let version = self.api_version(service);
        let options = RequestOptions {
            no_accept: false,
            api_version: version.as_deref(),
        };
        self.http.put(&url, self.token.as_deref(), body, options).await
    }

    /// Make a DELETE request against a service path
    pub async fn delete(&self, service: Service, path: &str) -> Result<Value> {
        let url = self.service_url(service, path)?;
        let version = self.api_version(service);
        let options = RequestOptions {
            no_accept: false,
            api_version: version.as_deref(),
        };
        self.http.delete(&url, self.token.as_deref(), options).await
    }
}

/// Parse and validate a configured endpoint URL
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("invalid endpoint {}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("unsupported endpoint scheme: {}", url.scheme())));
    }
    Ok(url)
}
