//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads all storage resource definitions from embedded JSON files
//! and provides lookup functions for the rest of the crate.

use super::schema::FieldKind;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/block_storage.json"),
    include_str!("../resources/shared_file_system.json"),
];

/// Service a resource lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    BlockStorage,
    SharedFileSystem,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::BlockStorage => f.write_str("block-storage"),
            Service::SharedFileSystem => f.write_str("shared-file-system"),
        }
    }
}

/// Operations gated by capability flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Create,
    Delete,
    List,
    Commit,
    Action(String),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Fetch => f.write_str("fetch"),
            Operation::Create => f.write_str("create"),
            Operation::Delete => f.write_str("delete"),
            Operation::List => f.write_str("list"),
            Operation::Commit => f.write_str("update"),
            Operation::Action(name) => write!(f, "action {}", name),
        }
    }
}

/// Capability flags from JSON
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub fetch: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub commit: bool,
}

/// Field definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    /// Logical attribute name callers use
    pub name: String,
    /// Key in the JSON request/response body
    pub wire_key: String,
    #[serde(default)]
    pub kind: FieldKind,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Registry key, filled in from the map key at load time
    #[serde(skip)]
    pub key: String,
    pub display_name: String,
    pub service: Service,
    /// Collection path; may contain `{param}` placeholders
    pub base_path: String,
    /// Alternate collection path for detailed listings
    #[serde(default)]
    pub detail_path: Option<String>,
    /// Envelope key around a single entity
    #[serde(default)]
    pub resource_key: Option<String>,
    /// Envelope key around a listing
    #[serde(default)]
    pub resources_key: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    pub fields: Vec<FieldDef>,
    /// Logical filter name -> wire query parameter
    #[serde(default)]
    pub query_aliases: BTreeMap<String, String>,
    /// Wire names of actions accepted by `<base_path>/<id>/action`
    #[serde(default)]
    pub actions: Vec<String>,
}

impl ResourceDef {
    /// Look up a declared field by logical name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a declared field by wire key
    pub fn field_by_wire_key(&self, wire_key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.wire_key == wire_key)
    }

    pub fn has_status(&self) -> bool {
        self.field("status").is_some()
    }

    pub fn allows(&self, operation: &Operation) -> bool {
        let caps = &self.capabilities;
        match operation {
            Operation::Fetch => caps.fetch,
            Operation::Create => caps.create,
            Operation::Delete => caps.delete,
            Operation::List => caps.list,
            Operation::Commit => caps.commit,
            Operation::Action(name) => self.actions.iter().any(|a| a == name),
        }
    }

    /// Check that the field list is usable: logical names and wire keys
    /// unique, and no logical name doubling as another field's wire key
    pub fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        let mut wire_keys = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(format!("{}: duplicate field name {}", self.key, field.name));
            }
            if !wire_keys.insert(field.wire_key.as_str()) {
                return Err(format!("{}: duplicate wire key {}", self.key, field.wire_key));
            }
        }
        for field in &self.fields {
            if let Some(other) = self.field_by_wire_key(&field.name) {
                if other.name != field.name {
                    return Err(format!(
                        "{}: field name {} is the wire key of {}",
                        self.key, field.name, other.name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        for (key, def) in final_config.resources.iter_mut() {
            def.key = key.clone();
            if let Err(e) = def.validate() {
                panic!("Invalid embedded resource definition: {}", e);
            }
        }

        final_config
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get all resource keys
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}

/// Get a resource definition that is known to be embedded
pub(crate) fn builtin(key: &str) -> &'static ResourceDef {
    get_resource(key).unwrap_or_else(|| panic!("Missing embedded resource definition: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_every_definition_has_unique_names_and_wire_keys() {
        for def in get_registry().resources.values() {
            assert!(def.validate().is_ok(), "{} failed validation", def.key);
        }
    }

    #[test]
    fn test_volume_resource_exists() {
        let resource = get_resource("volume").expect("volume should exist");
        assert_eq!(resource.display_name, "Volumes");
        assert_eq!(resource.service, Service::BlockStorage);
        assert_eq!(resource.base_path, "/volumes");
        assert_eq!(resource.detail_path.as_deref(), Some("/volumes/detail"));
        assert_eq!(
            resource.query_aliases.get("all_projects").map(String::as_str),
            Some("all_tenants")
        );
        assert_eq!(resource.field("is_bootable").unwrap().kind, FieldKind::BoolStr);
        assert_eq!(resource.field("host").unwrap().wire_key, "os-vol-host-attr:host");
    }

    #[test]
    fn test_get_all_resource_keys() {
        let keys = get_all_resource_keys();
        for key in [
            "volume",
            "share",
            "share_snapshot",
            "share_network",
            "share_network_subnet",
            "share_instance",
            "share_snapshot_instance",
            "share_export_location",
            "share_access_rule",
            "storage_pool",
            "user_message",
            "limit",
            "availability_zone",
        ] {
            assert!(keys.contains(&key), "Should contain {}", key);
        }
    }

    #[test]
    fn test_capabilities_gate_operations() {
        let pools = get_resource("storage_pool").unwrap();
        assert!(pools.allows(&Operation::List));
        assert!(!pools.allows(&Operation::Create));
        assert!(!pools.allows(&Operation::Action("extend".to_string())));

        let share = get_resource("share").unwrap();
        assert!(share.allows(&Operation::Commit));
        assert!(share.allows(&Operation::Action("shrink".to_string())));
        assert!(!share.allows(&Operation::Action("os-extend".to_string())));
    }

    #[test]
    fn test_status_field_presence() {
        assert!(get_resource("share").unwrap().has_status());
        assert!(!get_resource("availability_zone").unwrap().has_status());
    }

    #[test]
    fn test_duplicate_wire_key_is_rejected() {
        let mut def = get_resource("limit").unwrap().clone();
        def.fields.push(FieldDef {
            name: "other".to_string(),
            wire_key: def.fields[0].wire_key.clone(),
            kind: FieldKind::Any,
        });
        assert!(def.validate().unwrap_err().contains("duplicate wire key"));
    }

    #[test]
    fn test_name_shadowing_another_wire_key_is_rejected() {
        let mut def = get_resource("volume").unwrap().clone();
        def.fields.push(FieldDef {
            name: "imageRef".to_string(),
            wire_key: "image_ref".to_string(),
            kind: FieldKind::String,
        });
        let err = def.validate().unwrap_err();
        assert!(err.contains("imageRef is the wire key of image_id"), "{}", err);
    }
}
