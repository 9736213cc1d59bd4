use std::panic::{self, AssertUnwindSafe};

use crate::error::panic_message;
use crate::scene::Scene;

type Hook = Box<dyn FnMut(&dyn Scene)>;

/// Application callbacks fired at fixed points of a scene switch.
///
/// ```ignore
/// let hooks = SwitchHooks::new()
///     .on_before_scene_load(|scene| tracing::info!("loading {}", scene.name()))
///     .on_after_scene_assembly(|scene| tracing::info!("{} is live", scene.name()));
/// ```
#[derive(Default)]
pub struct SwitchHooks {
    before_delete: Option<Hook>,
    before_load: Option<Hook>,
    before_assembly: Option<Hook>,
    after_assembly: Option<Hook>,
}

impl SwitchHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the published scene right before it is torn down.
    pub fn on_before_scene_delete<F: FnMut(&dyn Scene) + 'static>(mut self, hook: F) -> Self {
        self.before_delete = Some(Box::new(hook));
        self
    }

    /// Called once the first load round has been handed to the worker.
    pub fn on_before_scene_load<F: FnMut(&dyn Scene) + 'static>(mut self, hook: F) -> Self {
        self.before_load = Some(Box::new(hook));
        self
    }

    /// Called before every `assemble`.
    pub fn on_before_scene_assembly<F: FnMut(&dyn Scene) + 'static>(mut self, hook: F) -> Self {
        self.before_assembly = Some(Box::new(hook));
        self
    }

    /// Called once the scene is published.
    pub fn on_after_scene_assembly<F: FnMut(&dyn Scene) + 'static>(mut self, hook: F) -> Self {
        self.after_assembly = Some(Box::new(hook));
        self
    }

    pub(crate) fn before_delete(&mut self, scene: &dyn Scene) {
        fire("before_scene_delete", &mut self.before_delete, scene);
    }

    pub(crate) fn before_load(&mut self, scene: &dyn Scene) {
        fire("before_scene_load", &mut self.before_load, scene);
    }

    pub(crate) fn before_assembly(&mut self, scene: &dyn Scene) {
        fire("before_scene_assembly", &mut self.before_assembly, scene);
    }

    pub(crate) fn after_assembly(&mut self, scene: &dyn Scene) {
        fire("after_scene_assembly", &mut self.after_assembly, scene);
    }
}

/// A panicking hook is logged and otherwise ignored; the switch carries on.
fn fire(stage: &str, hook: &mut Option<Hook>, scene: &dyn Scene) {
    let Some(hook) = hook.as_mut() else {
        return;
    };
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(scene))) {
        tracing::error!(
            "[scene] {} hook panicked for '{}': {}",
            stage,
            scene.name(),
            panic_message(payload.as_ref())
        );
    }
}
