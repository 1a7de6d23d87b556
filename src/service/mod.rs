//! Service proxies
//!
//! Named operations for each storage service, layered on the generic
//! collection, action and wait primitives in [`crate::resource`].
//!
//! - [`block_storage`] - Volumes
//! - [`shared_file_system`] - Shares and everything hanging off them

pub mod block_storage;
pub mod shared_file_system;

pub use block_storage::BlockStorage;
pub use shared_file_system::SharedFileSystem;

use crate::cloud::client::CloudClient;
use crate::error::{Error, Result};
use crate::resource::{self, get_resource, Entity, ResourceDef, WaitOptions};

impl CloudClient {
    /// Block storage (volumes) operations
    pub fn block_storage(&self) -> BlockStorage<'_> {
        BlockStorage::new(self)
    }

    /// Shared file system (shares) operations
    pub fn shared_file_system(&self) -> SharedFileSystem<'_> {
        SharedFileSystem::new(self)
    }
}

fn resolve(entity: &Entity) -> Result<&'static ResourceDef> {
    get_resource(entity.resource()).ok_or_else(|| {
        Error::Precondition(format!("unknown resource type {}", entity.resource()))
    })
}

/// Path placeholders of `def` filled from same-named entity attributes
fn path_params_of(def: &ResourceDef, entity: &Entity) -> Vec<(String, String)> {
    def.base_path
        .split('{')
        .skip(1)
        .filter_map(|part| part.split_once('}').map(|(name, _)| name))
        .filter_map(|name| {
            entity
                .get_str(name)
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect()
}

/// Re-fetch `entity` until its status is `target`
pub(crate) async fn wait_for_status(
    client: &CloudClient,
    entity: Entity,
    target: &str,
    failures: &[&str],
    options: WaitOptions,
) -> Result<Entity> {
    let def = resolve(&entity)?;
    let id = entity.id().unwrap_or_default().to_string();
    let owned = path_params_of(def, &entity);
    let params: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    resource::wait_for_status(def, entity, target, failures, options, || {
        resource::fetch_resource(client, def, &params, &id)
    })
    .await
}

/// Re-fetch `entity` until the backend reports it gone
pub(crate) async fn wait_for_delete(client: &CloudClient, entity: &Entity, options: WaitOptions) -> Result<()> {
    let def = resolve(entity)?;
    let id = entity.id().unwrap_or_default().to_string();
    let owned = path_params_of(def, entity);
    let params: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    resource::wait_for_delete(def, entity, options, || {
        resource::fetch_resource(client, def, &params, &id)
    })
    .await
}
