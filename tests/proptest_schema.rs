//! Property-based tests using proptest
//!
//! These tests cover attribute encoding, path building and the resize
//! policy with randomized inputs.

use proptest::prelude::*;
use serde_json::{json, Value};
use tstack::resource::action::action_body;
use tstack::resource::collection::{expand_path, item_path};
use tstack::resource::{decode, encode, get_all_resource_keys, get_resource, resize_direction, Attrs, Resize};

/// Generate share attributes that use declared fields only
fn arb_share_attrs() -> impl Strategy<Value = Attrs> {
    (
        "[a-z][a-z0-9-]{0,30}", // name
        1i64..16384,            // size
        prop_oneof!["NFS", "CIFS", "CEPHFS", "GLUSTERFS"],
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, size, proto, is_public, snapshots)| {
            let mut attrs = Attrs::new();
            attrs.insert("name".to_string(), json!(name));
            attrs.insert("size".to_string(), json!(size));
            attrs.insert("share_protocol".to_string(), json!(proto));
            attrs.insert("is_public".to_string(), json!(is_public));
            attrs.insert("is_snapshot_supported".to_string(), json!(snapshots));
            attrs
        })
}

/// Keys that no resource declares, neither as a name nor as a wire key
fn arb_unknown_key() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|s| format!("x-extension:{}", s))
}

fn arb_json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,20}".prop_map(Value::String),
    ]
}

proptest! {
    #[test]
    fn share_attrs_survive_encode_then_decode(attrs in arb_share_attrs()) {
        let def = get_resource("share").unwrap();
        let wire = encode(def, &attrs).unwrap();

        prop_assert!(wire.contains_key("share_proto"));
        prop_assert!(wire.contains_key("snapshot_support"));
        prop_assert!(!wire.contains_key("share_protocol"));

        prop_assert_eq!(decode(def, wire), attrs);
    }

    #[test]
    fn volume_bool_str_fields_travel_as_strings(bootable in any::<bool>(), encrypted in any::<bool>()) {
        let def = get_resource("volume").unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("is_bootable".to_string(), json!(bootable));
        attrs.insert("is_encrypted".to_string(), json!(encrypted));

        let wire = encode(def, &attrs).unwrap();
        prop_assert_eq!(&wire["bootable"], &json!(bootable.to_string()));
        prop_assert_eq!(&wire["encrypted"], &json!(encrypted.to_string()));

        prop_assert_eq!(decode(def, wire), attrs);
    }

    #[test]
    fn unknown_keys_pass_through_both_ways(
        key_index in 0usize..64,
        unknown in arb_unknown_key(),
        value in arb_json_scalar(),
    ) {
        let keys = get_all_resource_keys();
        let def = get_resource(keys[key_index % keys.len()]).unwrap();

        let mut attrs = Attrs::new();
        attrs.insert(unknown.clone(), value.clone());

        let wire = encode(def, &attrs).unwrap();
        prop_assert_eq!(wire.get(&unknown), Some(&value));

        let decoded = decode(def, wire);
        prop_assert_eq!(decoded.get(&unknown), Some(&value));
    }

    #[test]
    fn integer_fields_reject_non_numeric_strings(s in "[a-zA-Z ]{1,10}") {
        let def = get_resource("share").unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("size".to_string(), json!(s));
        prop_assert!(encode(def, &attrs).is_err());
    }

    #[test]
    fn item_path_keeps_id_in_one_segment(id in "[ -~]{1,40}") {
        let def = get_resource("share").unwrap();
        let path = item_path(def, &[], &id).unwrap();

        prop_assert!(path.starts_with("/shares/"));
        let tail = &path["/shares/".len()..];
        prop_assert!(!tail.contains('/'));
        prop_assert!(!tail.contains('?'));
    }

    #[test]
    fn expand_path_fills_every_placeholder(network in "[a-z0-9-]{1,36}") {
        let path = expand_path("/share-networks/{share_network_id}/subnets", &[("share_network_id", network.as_str())]).unwrap();
        prop_assert_eq!(path, format!("/share-networks/{}/subnets", network));
    }

    #[test]
    fn resize_respects_suppression_flags(
        current in 1i64..10_000,
        new_size in 1i64..10_000,
        no_shrink in any::<bool>(),
        no_extend in any::<bool>(),
        force in any::<bool>(),
    ) {
        match resize_direction(current, new_size, no_shrink, no_extend, force) {
            Some(Resize::Extend { new_size: n, force: f }) => {
                prop_assert!(new_size > current && !no_extend);
                prop_assert_eq!(n, new_size);
                prop_assert_eq!(f, force);
            },
            Some(Resize::Shrink { new_size: n }) => {
                prop_assert!(new_size < current && !no_shrink);
                prop_assert_eq!(n, new_size);
            },
            None => {
                prop_assert!(
                    new_size == current
                        || (new_size > current && no_extend)
                        || (new_size < current && no_shrink)
                );
            },
        }
    }

    #[test]
    fn action_body_has_single_key(action in "[a-z_-]{1,24}", size in any::<i64>()) {
        let body = action_body(&action, json!({"new_size": size}));
        let map = body.as_object().unwrap();
        prop_assert_eq!(map.len(), 1);
        prop_assert_eq!(&map[&action]["new_size"], &json!(size));
    }
}
