//! Shared file system (shares)
//!
//! Covers shares and the resources hanging off them: snapshots, networks and
//! their subnets, instances, export locations, access rules, plus the
//! read-only pools, messages, limits and availability zones.

use crate::cloud::client::CloudClient;
use crate::error::{Error, Result};
use crate::resource::registry::builtin;
use crate::resource::{
    create_resource, delete_resource, encode, fetch_resource, fetch_resources, invoke_action,
    resize_direction, update_resource, Attrs, DeleteOptions, Entity, Query, Resize, ResourceDef, WaitOptions,
};
use serde_json::{json, Map, Value};

/// Share operations against the shared file system endpoint
#[derive(Clone, Copy)]
pub struct SharedFileSystem<'a> {
    client: &'a CloudClient,
}

impl<'a> SharedFileSystem<'a> {
    pub fn new(client: &'a CloudClient) -> Self {
        Self { client }
    }

    fn def(key: &str) -> &'static ResourceDef {
        builtin(key)
    }

    // =========================================================================
    // Availability zones, pools, limits
    // =========================================================================

    pub async fn availability_zones(&self) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("availability_zone"), &[], false, &Query::new()).await
    }

    /// List back-end storage pools; `details` includes capabilities
    pub async fn storage_pools(&self, details: bool, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("storage_pool"), &[], details, query).await
    }

    pub async fn limits(&self, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("limit"), &[], false, query).await
    }

    // =========================================================================
    // Shares
    // =========================================================================

    /// List shares; `details` uses `/shares/detail`
    pub async fn shares(&self, details: bool, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("share"), &[], details, query).await
    }

    pub async fn get_share(&self, share_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::def("share"), &[], share_id).await
    }

    /// Create a share; `size` and `share_protocol` are required by the API
    pub async fn create_share(&self, attrs: &Attrs) -> Result<Entity> {
        create_resource(self.client, Self::def("share"), &[], attrs).await
    }

    pub async fn update_share(&self, share_id: &str, attrs: &Attrs) -> Result<Entity> {
        update_resource(self.client, Self::def("share"), &[], share_id, attrs).await
    }

    pub async fn delete_share(&self, share_id: &str, options: DeleteOptions) -> Result<()> {
        delete_resource(self.client, Self::def("share"), &[], share_id, options).await
    }

    /// Extend a share; `force` is only sent when set
    pub async fn extend_share(&self, share_id: &str, new_size: i64, force: bool) -> Result<()> {
        let mut body = json!({ "new_size": new_size });
        if force {
            body["force"] = Value::Bool(true);
        }
        invoke_action(self.client, Self::def("share"), &[], share_id, "extend", body).await?;
        Ok(())
    }

    pub async fn shrink_share(&self, share_id: &str, new_size: i64) -> Result<()> {
        invoke_action(
            self.client,
            Self::def("share"),
            &[],
            share_id,
            "shrink",
            json!({ "new_size": new_size }),
        )
        .await?;
        Ok(())
    }

    /// Revert a share to its most recent snapshot
    pub async fn revert_share_to_snapshot(&self, share_id: &str, snapshot_id: &str) -> Result<()> {
        invoke_action(
            self.client,
            Self::def("share"),
            &[],
            share_id,
            "revert",
            json!({ "snapshot_id": snapshot_id }),
        )
        .await?;
        Ok(())
    }

    /// Resize a share, extending or shrinking as needed.
    ///
    /// Returns the action taken. `None` means nothing was sent: the size
    /// already matched, or the needed direction was suppressed.
    pub async fn resize_share(
        &self,
        share_id: &str,
        new_size: i64,
        no_shrink: bool,
        no_extend: bool,
        force: bool,
    ) -> Result<Option<Resize>> {
        let share = self.get_share(share_id).await?;
        let current = share
            .get_i64("size")
            .ok_or_else(|| Error::Precondition(format!("share {} reports no size", share_id)))?;

        let decision = resize_direction(current, new_size, no_shrink, no_extend, force);
        match decision {
            Some(Resize::Extend { new_size, force }) => self.extend_share(share_id, new_size, force).await?,
            Some(Resize::Shrink { new_size }) => self.shrink_share(share_id, new_size).await?,
            None => tracing::debug!("resize of share {} to {} is a no-op (size {})", share_id, new_size, current),
        }

        Ok(decision)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub async fn share_snapshots(&self, details: bool, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("share_snapshot"), &[], details, query).await
    }

    pub async fn get_share_snapshot(&self, snapshot_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::def("share_snapshot"), &[], snapshot_id).await
    }

    pub async fn create_share_snapshot(&self, attrs: &Attrs) -> Result<Entity> {
        create_resource(self.client, Self::def("share_snapshot"), &[], attrs).await
    }

    pub async fn update_share_snapshot(&self, snapshot_id: &str, attrs: &Attrs) -> Result<Entity> {
        update_resource(self.client, Self::def("share_snapshot"), &[], snapshot_id, attrs).await
    }

    pub async fn delete_share_snapshot(&self, snapshot_id: &str, options: DeleteOptions) -> Result<()> {
        delete_resource(
            self.client,
            Self::def("share_snapshot"),
            &[],
            snapshot_id,
            options,
        )
        .await
    }

    pub async fn share_snapshot_instances(&self, details: bool, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(
            self.client,
            Self::def("share_snapshot_instance"),
            &[],
            details,
            query,
        )
        .await
    }

    pub async fn get_share_snapshot_instance(&self, snapshot_instance_id: &str) -> Result<Entity> {
        fetch_resource(
            self.client,
            Self::def("share_snapshot_instance"),
            &[],
            snapshot_instance_id,
        )
        .await
    }

    // =========================================================================
    // Share networks and subnets
    // =========================================================================

    pub async fn share_networks(&self, details: bool, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("share_network"), &[], details, query).await
    }

    pub async fn get_share_network(&self, share_network_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::def("share_network"), &[], share_network_id).await
    }

    pub async fn create_share_network(&self, attrs: &Attrs) -> Result<Entity> {
        create_resource(self.client, Self::def("share_network"), &[], attrs).await
    }

    pub async fn update_share_network(&self, share_network_id: &str, attrs: &Attrs) -> Result<Entity> {
        update_resource(
            self.client,
            Self::def("share_network"),
            &[],
            share_network_id,
            attrs,
        )
        .await
    }

    pub async fn delete_share_network(&self, share_network_id: &str, options: DeleteOptions) -> Result<()> {
        delete_resource(
            self.client,
            Self::def("share_network"),
            &[],
            share_network_id,
            options,
        )
        .await
    }

    pub async fn share_network_subnets(&self, share_network_id: &str) -> Result<Vec<Entity>> {
        fetch_resources(
            self.client,
            Self::def("share_network_subnet"),
            &[("share_network_id", share_network_id)],
            false,
            &Query::new(),
        )
        .await
    }

    pub async fn get_share_network_subnet(&self, share_network_id: &str, subnet_id: &str) -> Result<Entity> {
        fetch_resource(
            self.client,
            Self::def("share_network_subnet"),
            &[("share_network_id", share_network_id)],
            subnet_id,
        )
        .await
    }

    pub async fn create_share_network_subnet(&self, share_network_id: &str, attrs: &Attrs) -> Result<Entity> {
        create_resource(
            self.client,
            Self::def("share_network_subnet"),
            &[("share_network_id", share_network_id)],
            attrs,
        )
        .await
    }

    pub async fn delete_share_network_subnet(
        &self,
        share_network_id: &str,
        subnet_id: &str,
        options: DeleteOptions,
    ) -> Result<()> {
        delete_resource(
            self.client,
            Self::def("share_network_subnet"),
            &[("share_network_id", share_network_id)],
            subnet_id,
            options,
        )
        .await
    }

    // =========================================================================
    // Share instances (admin)
    // =========================================================================

    pub async fn share_instances(&self, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("share_instance"), &[], false, query).await
    }

    pub async fn get_share_instance(&self, share_instance_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::def("share_instance"), &[], share_instance_id).await
    }

    /// Explicitly set the state of a share instance
    pub async fn reset_share_instance_status(&self, share_instance_id: &str, status: &str) -> Result<()> {
        invoke_action(
            self.client,
            Self::def("share_instance"),
            &[],
            share_instance_id,
            "reset_status",
            json!({ "status": status }),
        )
        .await?;
        Ok(())
    }

    /// Force-delete a share instance
    pub async fn delete_share_instance(&self, share_instance_id: &str) -> Result<()> {
        invoke_action(
            self.client,
            Self::def("share_instance"),
            &[],
            share_instance_id,
            "force_delete",
            Value::Null,
        )
        .await?;
        Ok(())
    }

    // =========================================================================
    // Export locations
    // =========================================================================

    pub async fn export_locations(&self, share_id: &str) -> Result<Vec<Entity>> {
        fetch_resources(
            self.client,
            Self::def("share_export_location"),
            &[("share_id", share_id)],
            false,
            &Query::new(),
        )
        .await
    }

    pub async fn get_export_location(&self, export_location_id: &str, share_id: &str) -> Result<Entity> {
        fetch_resource(
            self.client,
            Self::def("share_export_location"),
            &[("share_id", share_id)],
            export_location_id,
        )
        .await
    }

    // =========================================================================
    // Access rules
    // =========================================================================

    /// List the access rules on a share
    pub async fn access_rules(&self, share_id: &str, query: &Query) -> Result<Vec<Entity>> {
        let mut query = query.clone();
        query.insert("share_id".to_string(), share_id.to_string());
        fetch_resources(self.client, Self::def("share_access_rule"), &[], false, &query).await
    }

    pub async fn get_access_rule(&self, access_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::def("share_access_rule"), &[], access_id).await
    }

    /// Grant access to a share (`allow_access` action)
    pub async fn create_access_rule(&self, share_id: &str, attrs: &Attrs) -> Result<Entity> {
        let rule_def = Self::def("share_access_rule");
        let body = Value::Object(encode(rule_def, attrs)?);

        let response = invoke_action(self.client, Self::def("share"), &[], share_id, "allow_access", body).await?;
        let access = match response {
            Value::Object(mut map) => map.remove("access").unwrap_or(Value::Object(map)),
            other => other,
        };

        Ok(Entity::from_wire(rule_def, access))
    }

    /// Revoke access to a share (`deny_access` action)
    pub async fn delete_access_rule(&self, access_id: &str, share_id: &str, options: DeleteOptions) -> Result<()> {
        let mut body = Map::new();
        body.insert("access_id".to_string(), Value::String(access_id.to_string()));

        match invoke_action(
            self.client,
            Self::def("share"),
            &[],
            share_id,
            "deny_access",
            Value::Object(body),
        )
        .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() && options.ignore_missing => {
                tracing::debug!("access rule {} on share {} already gone", access_id, share_id);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // User messages
    // =========================================================================

    pub async fn user_messages(&self, query: &Query) -> Result<Vec<Entity>> {
        fetch_resources(self.client, Self::def("user_message"), &[], false, query).await
    }

    pub async fn get_user_message(&self, message_id: &str) -> Result<Entity> {
        fetch_resource(self.client, Self::def("user_message"), &[], message_id).await
    }

    pub async fn delete_user_message(&self, message_id: &str, options: DeleteOptions) -> Result<()> {
        delete_resource(
            self.client,
            Self::def("user_message"),
            &[],
            message_id,
            options,
        )
        .await
    }

    // =========================================================================
    // Waiting
    // =========================================================================

    /// Wait for a share (or any status-bearing resource) to reach `status`
    pub async fn wait_for_status(
        &self,
        resource: Entity,
        status: &str,
        failures: &[&str],
        options: WaitOptions,
    ) -> Result<Entity> {
        super::wait_for_status(self.client, resource, status, failures, options).await
    }

    pub async fn wait_for_delete(&self, resource: &Entity, options: WaitOptions) -> Result<()> {
        super::wait_for_delete(self.client, resource, options).await
    }
}
