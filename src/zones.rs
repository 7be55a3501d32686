//! Zone Classifier - Protection Is All Or Nothing
//!
//! Every object leaves normalization with an explicit zone. A protected
//! object always carries the complete lock set; partial locking is never
//! produced.

use crate::canvas::{CanvasDocument, GraphicObject, Governance, Zone};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static NORMALIZE_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_normalize_call_count() -> u32 {
    NORMALIZE_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_normalize_call_count() {
    NORMALIZE_CALL_COUNT.store(0, Ordering::SeqCst);
}

/// Normalizes the governance metadata of every object, preserving order.
pub fn normalize(document: &CanvasDocument) -> CanvasDocument {
    #[cfg(feature = "test-hooks")]
    NORMALIZE_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

    let mut normalized = document.clone();
    let mut protected = 0usize;
    for object in &mut normalized.objects {
        normalize_object(object);
        if object.governance.zone == Some(Zone::Protected) {
            protected += 1;
        }
    }
    log::debug!(
        "event=canvas_normalized objects={} protected={}",
        normalized.objects.len(),
        protected
    );
    normalized
}

/// Applies the zone policy to a single object in place.
///
/// An object without a zone becomes `safe` and unlocked. `locked = true`
/// forces protection whatever the stated zone. Safe objects keep any flags
/// an editor set on them.
pub fn normalize_object(object: &mut GraphicObject) {
    let governance = &mut object.governance;
    // Read before the default below clears it.
    let was_locked = governance.is_locked();

    if governance.zone.is_none() {
        governance.zone = Some(Zone::Safe);
        governance.locked = Some(false);
    }

    let is_protected = governance.zone == Some(Zone::Protected) || was_locked;
    if is_protected {
        apply_full_lock(governance);
    }
}

fn apply_full_lock(governance: &mut Governance) {
    governance.zone = Some(Zone::Protected);
    governance.locked = Some(true);
    governance.selectable = Some(false);
    governance.evented = Some(false);
    governance.has_controls = Some(false);
    governance.lock_movement_x = Some(true);
    governance.lock_movement_y = Some(true);
    governance.lock_scaling_x = Some(true);
    governance.lock_scaling_y = Some(true);
    governance.lock_rotation = Some(true);
}

/// True when all nine protecting flags hold.
pub fn is_fully_locked(object: &GraphicObject) -> bool {
    let g = &object.governance;
    g.locked == Some(true)
        && g.selectable == Some(false)
        && g.evented == Some(false)
        && g.has_controls == Some(false)
        && g.lock_movement_x == Some(true)
        && g.lock_movement_y == Some(true)
        && g.lock_scaling_x == Some(true)
        && g.lock_scaling_y == Some(true)
        && g.lock_rotation == Some(true)
}

/// Indices of protected objects whose lock set is incomplete.
///
/// Generated designs are not re-normalized on save; this lets a caller
/// detect that a protected region was unlocked through the editor.
pub fn audit_locks(document: &CanvasDocument) -> Vec<usize> {
    document
        .objects
        .iter()
        .enumerate()
        .filter(|(_, object)| {
            object.governance.zone == Some(Zone::Protected) && !is_fully_locked(object)
        })
        .map(|(index, _)| index)
        .collect()
}
