use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::scene::{Scene, SceneId};

type SceneFactory = Box<dyn Fn() -> Box<dyn Scene>>;

struct Entry {
    name: String,
    factory: SceneFactory,
}

/// Maps scene ids to factories that build a fresh scene on every switch.
#[derive(Default)]
pub struct SceneRegistry {
    entries: BTreeMap<SceneId, Entry>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        id: impl Into<SceneId>,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Scene> + 'static,
    {
        let id = id.into();
        if id.is_reserved() {
            return Err(RegistryError::Reserved(id));
        }
        if self.entries.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        self.entries.insert(
            id,
            Entry {
                name: name.into(),
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Build a new scene, or `None` if nothing is registered under `id`.
    pub fn create(&self, id: SceneId) -> Option<Box<dyn Scene>> {
        self.entries.get(&id).map(|entry| (entry.factory)())
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn name(&self, id: SceneId) -> Option<&str> {
        self.entries.get(&id).map(|entry| entry.name.as_str())
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
