//! The scene contract and its identifier.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assets::AssetManager;
use crate::camera::Camera;
use crate::ecs::{Color, SceneContent};
use crate::loader::AssetLoadQueue;
use crate::view::ViewHandle;

/// Identifier a scene is registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(u32);

impl SceneId {
    /// No scene. Switching to it tears down and shows an empty scene.
    pub const NONE: SceneId = SceneId(0);
    /// A scene built outside the registry, see `switch_to_scene`.
    pub const CUSTOM: SceneId = SceneId(u32::MAX);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// `NONE` and `CUSTOM` cannot be registered.
    pub const fn is_reserved(self) -> bool {
        self.0 == Self::NONE.0 || self.0 == Self::CUSTOM.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::NONE => write!(f, "none"),
            Self::CUSTOM => write!(f, "custom"),
            SceneId(id) => write!(f, "#{id}"),
        }
    }
}

impl From<u32> for SceneId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A load-then-assemble round. A scene has one or two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    First,
    Second,
}

impl Phase {
    pub fn number(self) -> u8 {
        match self {
            Phase::First => 1,
            Phase::Second => 2,
        }
    }
}

/// A unit of 3D/2D content with a background load step and a main-thread assembly step.
///
/// The controller calls the hooks in this order, all on the main thread:
/// [`init`](Scene::init), [`register_assets`](Scene::register_assets), then
/// [`assemble`](Scene::assemble) once the registered tasks have all finished.
/// If `assemble` adds tasks to [`AssemblyContext::deferred`], they are loaded
/// and `assemble` runs a second time with [`Phase::Second`].
///
/// `register_assets` has no access to the [`AssetManager`]; anything that
/// needs the GPU belongs in `assemble`.
pub trait Scene {
    fn name(&self) -> &str;

    fn info(&self) -> &str {
        ""
    }

    fn init(&mut self, _assets: &mut AssetManager) -> anyhow::Result<()> {
        Ok(())
    }

    fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()>;

    fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()>;

    fn content(&self) -> Option<&SceneContent> {
        None
    }

    /// Camera the views should use. `None` keeps each view's default.
    fn camera(&self) -> Option<Camera> {
        None
    }

    fn background(&self) -> Color {
        Color::SLATE
    }

    fn load_time(&self) -> Option<Duration> {
        None
    }

    fn set_load_time(&mut self, _elapsed: Duration) {}
}

/// The active scene as shared between the process state and views.
pub type SceneHandle = Rc<RefCell<Box<dyn Scene>>>;

pub(crate) fn into_handle(scene: Box<dyn Scene>) -> SceneHandle {
    Rc::new(RefCell::new(scene))
}

/// Everything `assemble` may touch.
pub struct AssemblyContext<'a> {
    assets: &'a mut AssetManager,
    view: Option<ViewHandle>,
    phase: Phase,
    deferred: AssetLoadQueue,
    sensors: Vec<String>,
}

impl<'a> AssemblyContext<'a> {
    pub(crate) fn new(
        assets: &'a mut AssetManager,
        view: Option<ViewHandle>,
        phase: Phase,
        deferred: AssetLoadQueue,
    ) -> Self {
        Self {
            assets,
            view,
            phase,
            deferred,
            sensors: Vec::new(),
        }
    }

    /// The asset manager. GPU uploads happen here.
    pub fn assets(&mut self) -> &mut AssetManager {
        &mut *self.assets
    }

    /// The view that requested the switch, if it is still alive.
    pub fn view(&self) -> Option<&ViewHandle> {
        self.view.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Tasks for a second load round. Ignored after the second assembly.
    pub fn deferred(&mut self) -> &mut AssetLoadQueue {
        &mut self.deferred
    }

    /// Ask for a device sensor to be enabled once the scene is live.
    pub fn request_sensor(&mut self, name: impl Into<String>) {
        self.sensors.push(name.into());
    }

    pub(crate) fn finish(self) -> (AssetLoadQueue, Vec<String>) {
        (self.deferred, self.sensors)
    }
}

/// The scene shown when there is nothing else to show.
///
/// Published for [`SceneId::NONE`] and after a failed switch, in which case
/// [`info`](Scene::info) carries the failure message.
pub struct EmptyScene {
    message: String,
    content: SceneContent,
    load_time: Option<Duration>,
}

impl Default for EmptyScene {
    fn default() -> Self {
        Self::with_message("")
    }
}

impl EmptyScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            content: SceneContent::new("Empty"),
            load_time: None,
        }
    }
}

impl Scene for EmptyScene {
    fn name(&self) -> &str {
        "Empty"
    }

    fn info(&self) -> &str {
        &self.message
    }

    fn register_assets(&mut self, _queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
        Ok(())
    }

    fn assemble(&mut self, _ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn content(&self) -> Option<&SceneContent> {
        Some(&self.content)
    }

    fn background(&self) -> Color {
        if self.message.is_empty() {
            Color::BLACK
        } else {
            Color::RED.dimmed(0.3)
        }
    }

    fn load_time(&self) -> Option<Duration> {
        self.load_time
    }

    fn set_load_time(&mut self, elapsed: Duration) {
        self.load_time = Some(elapsed);
    }
}
