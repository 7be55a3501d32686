//! Property tests for classification and substitution.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use flyerstudio_core::{
    normalize, resolve,
    placeholder::substitute,
    zones::is_fully_locked,
    Bindings, CanvasDocument, Zone,
};

fn flag() -> impl Strategy<Value = Option<bool>> {
    prop_oneof![Just(None), Just(Some(true)), Just(Some(false))]
}

fn zone() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("safe")), Just(Some("protected"))]
}

fn object() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just("rect"), Just("text"), Just("image"), Just("group")],
        zone(),
        flag(),
        flag(),
        flag(),
        "[a-z {}.]{0,12}",
    )
        .prop_map(|(kind, zone, locked, selectable, lock_rotation, text)| {
            let mut map = Map::new();
            map.insert("type".into(), json!(kind));
            map.insert("text".into(), json!(text));
            if let Some(zone) = zone {
                map.insert("_cp_zone".into(), json!(zone));
            }
            if let Some(locked) = locked {
                map.insert("_cp_locked".into(), json!(locked));
            }
            if let Some(selectable) = selectable {
                map.insert("selectable".into(), json!(selectable));
            }
            if let Some(lock_rotation) = lock_rotation {
                map.insert("lockRotation".into(), json!(lock_rotation));
            }
            Value::Object(map)
        })
}

fn document() -> impl Strategy<Value = CanvasDocument> {
    prop::collection::vec(object(), 0..8).prop_map(|objects| {
        CanvasDocument::from_value(json!({ "width": 800, "height": 1000, "objects": objects }))
            .expect("generated documents are well formed")
    })
}

fn key() -> impl Strategy<Value = String> {
    "[a-z]{1,5}(\\.[a-z_]{1,5}){0,2}"
}

proptest! {
    /// Property: normalizing twice equals normalizing once.
    #[test]
    fn prop_normalize_idempotent(doc in document()) {
        let once = normalize(&doc);
        prop_assert_eq!(normalize(&once), once);
    }

    /// Property: every object gets a zone; protected objects carry the full lock set.
    #[test]
    fn prop_protection_implies_full_lock(doc in document()) {
        let normalized = normalize(&doc);
        for (before, after) in doc.objects.iter().zip(&normalized.objects) {
            prop_assert!(after.governance.zone.is_some());
            if after.governance.zone == Some(Zone::Protected) {
                prop_assert!(is_fully_locked(after));
            } else {
                prop_assert_ne!(before.governance.locked, Some(true));
                if before.governance.zone.is_none() {
                    prop_assert_eq!(after.governance.locked, Some(false));
                }
            }
        }
    }

    /// Property: bound keys are replaced, unbound keys survive, structure is kept.
    #[test]
    fn prop_substitution_total(
        bound in prop::collection::btree_map(key(), "[A-Za-z0-9 ]{0,8}", 0..4),
        unbound in key(),
        texts in prop::collection::vec(0usize..4, 1..6),
    ) {
        prop_assume!(!bound.contains_key(&unbound));
        let bindings = Bindings::from_pairs(bound.clone()).unwrap();
        let keys: Vec<_> = bound.keys().cloned().collect();

        let objects: Vec<Value> = texts
            .iter()
            .map(|i| {
                let text = match keys.get(*i) {
                    Some(k) => format!("<{{{{{}}}}}|{{{{{}}}}}>", k, unbound),
                    None => format!("{{{{{}}}}}", unbound),
                };
                json!({"type": "text", "text": text})
            })
            .collect();
        let doc = CanvasDocument::from_value(json!({ "objects": objects })).unwrap();
        let resolved = resolve(&doc, &bindings);

        prop_assert_eq!(resolved.objects.len(), doc.objects.len());
        for ((i, before), after) in texts.iter().zip(&doc.objects).zip(&resolved.objects) {
            let expected = match keys.get(*i) {
                Some(k) => format!("<{}|{{{{{}}}}}>", bound[k], unbound),
                None => format!("{{{{{}}}}}", unbound),
            };
            prop_assert_eq!(after.text.clone(), Some(expected));
            prop_assert_eq!(&after.kind, &before.kind);
            prop_assert_eq!(&after.geometry, &before.geometry);
        }
    }

    /// Property: a value that looks like a placeholder is never expanded again.
    #[test]
    fn prop_single_pass(x in key(), y in key(), z in "[A-Za-z]{1,6}") {
        prop_assume!(x != y);
        let bindings = Bindings::from_pairs([
            (x.clone(), format!("{{{{{}}}}}", y)),
            (y.clone(), z),
        ]).unwrap();
        prop_assert_eq!(substitute(&format!("{{{{{}}}}}", x), &bindings), format!("{{{{{}}}}}", y));
    }
}
