//! Block storage (volumes)

use crate::cloud::client::CloudClient;
use crate::error::Result;
use crate::resource::registry::builtin;
use crate::resource::{
    create_resource, delete_resource, fetch_resource, fetch_resources, invoke_action,
    update_resource, Attrs, DeleteOptions, Entity, Query, ResourceDef, WaitOptions,
};
use serde_json::json;

/// Volume operations against the block storage endpoint
#[derive(Clone, Copy)]
pub struct BlockStorage<'a> {
    client: &'a CloudClient,
}

impl<'a> BlockStorage<'a> {
    pub fn new(client: &'a CloudClient) -> Self {
        Self { client }
    }

    fn volume_def() -> &'static ResourceDef {
        builtin("volume")
    }

    /// List volumes; `details` uses `/volumes/detail`.
    /// `all_projects` in `query` is sent as `all_tenants`.
    pub async fn volumes(&self, details: bool, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::volume_def(), &[], details, query).await
    }

    pub async fn get_volume(&self, volume_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::volume_def(), &[], volume_id).await
    }

    pub async fn create_volume(&self, attrs: &Attrs) -> Result<Entity> {
        create_resource(self.client, Self::volume_def(), &[], attrs).await
    }

    pub async fn update_volume(&self, volume_id: &str, attrs: &Attrs) -> Result<Entity> {
        update_resource(self.client, Self::volume_def(), &[], volume_id, attrs).await
    }

    /// Delete a volume. By default a 404 is treated as success.
    pub async fn delete_volume(&self, volume_id: &str, options: DeleteOptions) -> Result<()> {
        delete_resource(self.client, Self::volume_def(), &[], volume_id, options).await
    }

    /// Extend a volume to `new_size` GiB
    pub async fn extend_volume(&self, volume_id: &str, new_size: i64) -> Result<()> {
        invoke_action(
            self.client,
            Self::volume_def(),
            &[],
            volume_id,
            "os-extend",
            json!({ "new_size": new_size }),
        )
        .await?;
        Ok(())
    }

    /// Set or clear the volume read-only flag
    pub async fn set_volume_readonly(&self, volume_id: &str, readonly: bool) -> Result<()> {
        invoke_action(
            self.client,
            Self::volume_def(),
            &[],
            volume_id,
            "os-update_readonly_flag",
            json!({ "readonly": readonly }),
        )
        .await?;
        Ok(())
    }

    /// Change the volume type; `migration_policy` is `never` or `on-demand`
    pub async fn retype_volume(&self, volume_id: &str, new_type: &str, migration_policy: &str) -> Result<()> {
        invoke_action(
            self.client,
            Self::volume_def(),
            &[],
            volume_id,
            "os-retype",
            json!({ "new_type": new_type, "migration_policy": migration_policy }),
        )
        .await?;
        Ok(())
    }

    pub async fn wait_for_status(
        &self,
        volume: Entity,
        status: &str,
        failures: &[&str],
        options: WaitOptions,
    ) -> Result<Entity> {
        super::wait_for_status(self.client, volume, status, failures, options).await
    }

    pub async fn wait_for_delete(&self, volume: &Entity, options: WaitOptions) -> Result<()> {
        super::wait_for_delete(self.client, volume, options).await
    }
}
