//! Status polling
//!
//! Re-fetch an entity until its `status` settles, or until a fetch reports
//! the entity gone. Both loops are generic over the refresh call so they can
//! run against any fetch implementation.

use super::registry::ResourceDef;
use super::schema::Entity;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Poll timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Time between checks
    pub interval: Duration,
    /// Total time budget
    pub wait: Duration,
}

impl WaitOptions {
    pub fn from_secs(interval: u64, wait: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval),
            wait: Duration::from_secs(wait),
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_secs(
            crate::config::DEFAULT_POLL_INTERVAL_SECS,
            crate::config::DEFAULT_WAIT_SECS,
        )
    }
}

/// Wait for `entity` to reach `target` status.
///
/// Matching is exact and case-sensitive. Fails with `ResourceFailure` on any
/// of `failures` and with `ResourceTimeout` once the budget is exceeded.
pub async fn wait_for_status<F, Fut>(
    def: &ResourceDef,
    entity: Entity,
    target: &str,
    failures: &[&str],
    options: WaitOptions,
    mut refresh: F,
) -> Result<Entity>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Entity>>,
{
    if !def.has_status() {
        return Err(Error::Precondition(format!(
            "{} has no status attribute to wait on",
            def.key
        )));
    }

    if entity.status() == Some(target) {
        return Ok(entity);
    }

    let id = entity.id().unwrap_or_default().to_string();
    let start = Instant::now();

    loop {
        let current = refresh().await?;
        let status = current.status().map(str::to_string);
        tracing::debug!("{} {} status: {:?} (waiting for {})", def.key, id, status, target);

        match status.as_deref() {
            Some(s) if s == target => return Ok(current),
            Some(s) if failures.contains(&s) => {
                return Err(Error::ResourceFailure {
                    resource: def.key.clone(),
                    id,
                    status: s.to_string(),
                });
            },
            _ => {},
        }

        let elapsed = start.elapsed();
        if elapsed > options.wait {
            return Err(Error::ResourceTimeout {
                resource: def.key.clone(),
                id,
                last_status: status,
                elapsed,
            });
        }

        tokio::time::sleep(options.interval).await;
    }
}

/// Wait until fetching `entity` reports it missing.
///
/// Only `NotFound` ends the wait successfully; any other fetch error is
/// returned immediately.
pub async fn wait_for_delete<F, Fut>(
    def: &ResourceDef,
    entity: &Entity,
    options: WaitOptions,
    mut refresh: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Entity>>,
{
    let id = entity.id().unwrap_or_default().to_string();
    let start = Instant::now();

    loop {
        let last_status = match refresh().await {
            Ok(current) => current.status().map(str::to_string),
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} {} deleted", def.key, id);
                return Ok(());
            },
            Err(e) => return Err(e),
        };

        let elapsed = start.elapsed();
        if elapsed > options.wait {
            return Err(Error::ResourceTimeout {
                resource: def.key.clone(),
                id,
                last_status,
                elapsed,
            });
        }

        tokio::time::sleep(options.interval).await;
    }
}
