//! Scenes and the pipeline that switches between them.
//!
//! A [`Scene`] is built fresh on every switch by a factory in the
//! [`SceneRegistry`]. The [`SceneSwitchController`] tears the old scene
//! down, loads the new one's assets on the background worker, assembles it
//! on the main thread, and only then hands it to the views.
//!
//! # Example
//!
//! ```ignore
//! use stagehand::*;
//!
//! struct Lobby {
//!     floor: AssetSlot<ImageData>,
//!     content: Option<SceneContent>,
//! }
//!
//! impl Scene for Lobby {
//!     fn name(&self) -> &str {
//!         "Lobby"
//!     }
//!
//!     fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
//!         queue.add_texture(&self.floor, "floor.png");
//!         Ok(())
//!     }
//!
//!     fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
//!         let floor = ctx.assets().add_texture(self.floor.take_or_placeholder());
//!         let cube = ctx.assets().add_mesh("cube", RawGeometry::cube());
//!         let mut content = SceneContent::new("Lobby");
//!         content.spawn_mesh("floor", Transform::new(), RenderMesh::with_texture(cube, Color::WHITE, floor));
//!         self.content = Some(content);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = SceneRegistry::new();
//! registry.register(1u32, "Lobby", || {
//!     Box::new(Lobby { floor: AssetSlot::new(), content: None })
//! })?;
//!
//! let mut controller = SceneSwitchController::new(registry);
//! controller.switch_scene(&mut state, SceneId::new(1), &view);
//! // once per frame:
//! controller.update(&mut state)?;
//! ```

mod controller;
mod hooks;
mod registry;
mod scene;

#[cfg(test)]
mod tests;

pub use controller::{SceneSwitchController, SwitchState};
pub use hooks::SwitchHooks;
pub use registry::SceneRegistry;
pub use scene::{AssemblyContext, EmptyScene, Phase, Scene, SceneHandle, SceneId};
