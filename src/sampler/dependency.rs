//! Which objects need animation export.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::scene::{ObjectId, ObjectKind, SceneContext};

/// An object is directly animated when its transform, its camera or light
/// data, one of its materials or its shape keys carry keyframes.
pub fn has_animations<S: SceneContext + ?Sized>(ctx: &S, object: ObjectId) -> bool {
    let keyed = |action: Option<&crate::scene::Action>| action.is_some_and(|a| !a.is_empty());

    if keyed(ctx.transform_action(object)) {
        return true;
    }
    if matches!(ctx.object_kind(object), ObjectKind::Camera | ObjectKind::Light) && keyed(ctx.data_action(object)) {
        return true;
    }
    if ctx
        .bound_materials(object)
        .iter()
        .any(|slot| keyed(ctx.material_action(slot.material)))
    {
        return true;
    }
    keyed(ctx.shape_key_action(object))
}

/// Whether any object of the set is directly animated.
pub fn has_any_animations<S: SceneContext + ?Sized>(ctx: &S, objects: &[ObjectId]) -> bool {
    objects.iter().any(|&o| has_animations(ctx, o))
}

/// Directly animated objects plus every object that follows one of them
/// through a chain of valid constraints.
pub fn classify_animated<S: SceneContext + ?Sized>(ctx: &S, objects: &[ObjectId]) -> BTreeSet<ObjectId> {
    let mut animated = BTreeSet::new();
    let mut candidates = BTreeSet::new();
    // target -> candidates constrained to it
    let mut dependents: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();

    for &object in objects {
        if has_animations(ctx, object) {
            animated.insert(object);
            continue;
        }
        let constraints = ctx.constraints(object);
        if constraints.is_empty() {
            continue;
        }
        candidates.insert(object);
        for constraint in constraints.iter().filter(|c| c.is_valid()) {
            for target in ctx.resolve_constraint_targets(constraint) {
                dependents.entry(target).or_default().push(object);
            }
        }
    }

    let direct = animated.len();
    let mut worklist: Vec<ObjectId> = animated.iter().copied().collect();
    while let Some(object) = worklist.pop() {
        let Some(followers) = dependents.get(&object) else {
            continue;
        };
        for &follower in followers {
            if candidates.remove(&follower) {
                animated.insert(follower);
                worklist.push(follower);
            }
        }
    }

    debug!(direct, by_constraint = animated.len() - direct, "classified animated objects");
    animated
}
