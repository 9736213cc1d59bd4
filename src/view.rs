//! Views render whatever scene is attached to them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::camera::Camera;
use crate::scene::{Scene, SceneHandle};

/// Shared handle the application and the controller both hold.
pub type ViewHandle = Rc<RefCell<View>>;

/// A viewport onto the active scene.
///
/// The view never owns its scene. It holds a weak reference, so tearing the
/// scene down detaches every view at once.
pub struct View {
    name: String,
    scene: Weak<RefCell<Box<dyn Scene>>>,
    camera: Option<Camera>,
    default_camera: Camera,
    initialized: bool,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scene: Weak::new(),
            camera: None,
            default_camera: Camera::default(),
            initialized: false,
        }
    }

    pub fn with_default_camera(mut self, camera: Camera) -> Self {
        self.default_camera = camera;
        self
    }

    pub fn into_handle(self) -> ViewHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attach_scene(&mut self, scene: &SceneHandle) {
        self.scene = Rc::downgrade(scene);
    }

    /// The attached scene, if it is still alive.
    pub fn scene(&self) -> Option<SceneHandle> {
        self.scene.upgrade()
    }

    pub fn has_scene(&self) -> bool {
        self.scene.strong_count() > 0
    }

    /// The active camera, or the default one before a scene supplied it.
    pub fn camera(&self) -> Camera {
        self.camera.unwrap_or(self.default_camera)
    }

    pub fn default_camera(&self) -> Camera {
        self.default_camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Called once the new scene is attached and published.
    pub fn on_initialize(&mut self) {
        self.initialized = true;
        tracing::debug!("[view] '{}' initialized", self.name);
    }

    /// Called during tear-down. Drops the scene camera.
    pub fn un_initialize(&mut self) {
        self.initialized = false;
        self.camera = None;
        self.scene = Weak::new();
    }
}
