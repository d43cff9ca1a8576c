//! Scenes and the scene registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::patch::PatchRef;

/// A registered routing target: the main patch plus optional transition
/// patches. Init and exit patches are driven with a synthetic `Dummy`
/// event when the scene becomes active or inactive.
pub struct Scene {
    pub patch: PatchRef,
    pub init_patch: Option<PatchRef>,
    pub exit_patch: Option<PatchRef>,
}

impl Scene {
    pub fn new(patch: PatchRef, init_patch: Option<PatchRef>, exit_patch: Option<PatchRef>) -> Self {
        Self {
            patch,
            init_patch,
            exit_patch,
        }
    }
}

/// Scenes by id, each an ordered sequence of subscenes.
///
/// Ids are arbitrary non-negative integers; the lowest registered id is
/// the default. A subscene is addressed by `(scene_id, subscene_index)`.
#[derive(Default)]
pub struct SceneRegistry {
    scenes: BTreeMap<i32, Vec<Arc<Scene>>>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscene to scene `id`, creating the scene if absent.
    pub fn add(&mut self, id: i32, scene: Scene) {
        self.scenes.entry(id).or_default().push(Arc::new(scene));
    }

    pub fn has_scene(&self, id: i32) -> bool {
        self.scenes.contains_key(&id)
    }

    pub fn get(&self, id: i32, subscene: usize) -> Option<&Arc<Scene>> {
        self.scenes.get(&id).and_then(|subs| subs.get(subscene))
    }

    pub fn num_subscenes(&self, id: i32) -> usize {
        self.scenes.get(&id).map_or(0, Vec::len)
    }

    /// Lowest registered scene id, if any scene exists.
    pub fn default_scene_id(&self) -> Option<i32> {
        self.scenes.keys().next().copied()
    }

    /// Number of distinct scene ids.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
