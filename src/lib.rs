//! # Stagehand
//!
//! **Asynchronous scene switching for wgpu applications.**
//!
//! A switch tears the current scene down, builds the next one from a
//! registered factory, decodes its assets on a background thread and then
//! assembles it on the main thread, where GPU uploads happen. The window
//! keeps presenting frames the whole time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stagehand::*;
//!
//! struct Checkers {
//!     board: AssetSlot<ImageData>,
//! }
//!
//! impl Scene for Checkers {
//!     fn name(&self) -> &str {
//!         "Checkers"
//!     }
//!
//!     fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
//!         let board = self.board.clone();
//!         queue.add_task("board", move || {
//!             board.fill(ImageData::checker("board", 64, [0, 0, 0, 255], [255; 4]));
//!             Ok(())
//!         });
//!         Ok(())
//!     }
//!
//!     fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
//!         ctx.assets().add_texture(self.board.take_or_placeholder());
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = SceneRegistry::new();
//!     registry.register(1u32, "Checkers", || {
//!         Box::new(Checkers { board: AssetSlot::new() })
//!     })?;
//!     run(AppConfig::new().initial_scene(1u32), registry)
//! }
//! ```
//!
//! ## Threading
//!
//! - Load tasks run on one worker thread and only decode into CPU memory.
//! - [`AssetManager`] is not `Send`; only `assemble` can reach it.
//! - [`SceneSwitchController::update`] must be called once per frame from
//!   the main thread. It is what moves a switch forward.

mod app;
mod assets;
mod camera;
mod config;
mod ecs;
mod error;
mod font;
mod geometry;
mod gpu;
pub mod loader;
mod mesh;
pub mod scene;
mod sensor;
mod shader;
mod state;
mod texture;
mod view;

pub use app::{run, run_with_hooks};
pub use assets::{AssetManager, FontAsset, MeshAsset, Resource, ShaderAsset, TextureAsset};
pub use camera::Camera;
pub use config::{AppConfig, AssetPaths, FontSpec};
pub use ecs::{Color, FontId, Label, MeshId, Node, RenderMesh, SceneContent, ShaderId, TextureId};
pub use error::{
    ConfigError, LoadError, LoadQueueError, RegistryError, SwitchError, TaskFailure,
};
pub use font::{FontAtlas, FontAtlasData, GlyphInfo};
pub use geometry::{GeometryOptions, RawGeometry};
pub use gpu::{GpuContext, GpuError};
pub use loader::{AssetLoadQueue, AssetSlot, JobProgress, PhaseReport, Placeholder, SlotState};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use scene::{
    AssemblyContext, EmptyScene, Phase, Scene, SceneHandle, SceneId, SceneRegistry,
    SceneSwitchController, SwitchHooks, SwitchState,
};
pub use sensor::{DeviceSensor, SensorSet, SimulatedSensor};
pub use shader::ShaderSource;
pub use state::ProcessState;
pub use texture::{ImageData, Texture};
pub use view::{View, ViewHandle};

pub use glam::{Mat4, Quat, Vec2, Vec3};
pub use hecs::{Entity, World};
