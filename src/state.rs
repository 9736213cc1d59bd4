//! The long-lived context the scene pipeline runs against.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use crate::assets::AssetManager;
use crate::config::{AssetPaths, FontSpec};
use crate::ecs::FontId;
use crate::error::{LoadError, SwitchError};
use crate::font::FontAtlasData;
use crate::loader::{AssetLoadQueue, AssetSlot, JobProgress, JobQueues};
use crate::scene::{SceneHandle, SceneId};
use crate::sensor::SensorSet;
use crate::view::{View, ViewHandle};

/// Active scene, asset manager, views, background jobs and progress.
///
/// One instance lives for the whole run. The active scene is only replaced
/// by the [`SceneSwitchController`](crate::SceneSwitchController), in a
/// single assignment once the new scene is fully assembled.
pub struct ProcessState {
    scene_id: SceneId,
    scene: Option<SceneHandle>,
    assets: AssetManager,
    views: Vec<Weak<RefCell<View>>>,
    jobs: JobQueues,
    sensors: SensorSet,
    paths: AssetPaths,
    last_error: Option<String>,
    last_load_time: Option<Duration>,
}

impl ProcessState {
    /// Spawns the loader thread.
    pub fn new(assets: AssetManager, paths: AssetPaths) -> std::io::Result<Self> {
        let jobs = JobQueues::new(Arc::new(JobProgress::new()))?;
        Ok(Self {
            scene_id: SceneId::NONE,
            scene: None,
            assets,
            views: Vec::new(),
            jobs,
            sensors: SensorSet::new(),
            paths,
            last_error: None,
            last_load_time: None,
        })
    }

    /// No GPU, default asset paths.
    pub fn headless() -> std::io::Result<Self> {
        Self::new(AssetManager::headless(), AssetPaths::default())
    }

    /// Id of the scene requested last, or of the published one.
    pub fn scene_id(&self) -> SceneId {
        self.scene_id
    }

    pub fn active_scene(&self) -> Option<SceneHandle> {
        self.scene.clone()
    }

    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetManager {
        &mut self.assets
    }

    pub fn asset_paths(&self) -> &AssetPaths {
        &self.paths
    }

    pub fn sensors(&self) -> &SensorSet {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut SensorSet {
        &mut self.sensors
    }

    /// Views are held weakly; dropped views fall out of the list.
    pub fn register_view(&mut self, view: &ViewHandle) {
        self.views.retain(|v| v.strong_count() > 0);
        if !self.views.iter().any(|v| v.ptr_eq(&Rc::downgrade(view))) {
            self.views.push(Rc::downgrade(view));
        }
    }

    pub fn views(&self) -> Vec<ViewHandle> {
        self.views.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn progress(&self) -> Arc<JobProgress> {
        self.jobs.progress()
    }

    pub fn job_progress_message(&self) -> String {
        self.jobs.progress().job_progress_message()
    }

    pub fn job_progress_num(&self) -> usize {
        self.jobs.progress().job_progress_num()
    }

    pub fn job_progress_max(&self) -> usize {
        self.jobs.progress().job_progress_max()
    }

    pub fn job_is_running(&self) -> bool {
        self.jobs.job_is_running()
    }

    /// Advance the background jobs. See [`JobQueues::handle_parallel_job`].
    pub fn handle_parallel_job(&mut self) -> usize {
        self.jobs.handle_parallel_job()
    }

    /// Message of the last failed switch, cleared by the next switch.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Wall-clock time of the last completed switch.
    pub fn last_load_time(&self) -> Option<Duration> {
        self.last_load_time
    }

    /// Load fonts shared by every scene, blocking the calling thread.
    ///
    /// Any failure is fatal: without its core fonts the process cannot show
    /// anything useful.
    pub fn load_core_fonts(&mut self, fonts: &[FontSpec]) -> Result<Vec<FontId>, SwitchError> {
        let mut queue = AssetLoadQueue::with_paths("core assets", self.paths.clone());
        let slots: Vec<AssetSlot<FontAtlasData>> = fonts.iter().map(|_| AssetSlot::new()).collect();

        for (spec, slot) in fonts.iter().zip(&slots) {
            let path = self.paths.font(&spec.path);
            let size = spec.size;
            let slot = slot.clone();
            queue.add_task(format!("core font {}", path.display()), move || {
                let atlas = FontAtlasData::from_file(&path, size)
                    .map_err(|e| LoadError::CoreData(e.to_string()))?;
                slot.fill(atlas);
                Ok(())
            });
        }

        let report = queue.load_sync(&self.jobs.progress())?;
        if let Some(fatal) = report.fatal {
            return Err(SwitchError::Fatal(fatal));
        }

        let ids = slots
            .iter()
            .filter_map(AssetSlot::take)
            .map(|atlas| self.assets.add_core_font(atlas))
            .collect();
        tracing::info!("[assets] {} core font(s) loaded", fonts.len());
        Ok(ids)
    }

    pub(crate) fn jobs_mut(&mut self) -> &mut JobQueues {
        &mut self.jobs
    }

    pub(crate) fn set_scene_id(&mut self, id: SceneId) {
        self.scene_id = id;
    }

    pub(crate) fn take_scene(&mut self) -> Option<SceneHandle> {
        self.scene.take()
    }

    /// Make `scene` the active scene.
    pub(crate) fn publish(&mut self, id: SceneId, scene: SceneHandle) {
        self.scene_id = id;
        self.scene = Some(scene);
    }

    pub(crate) fn set_last_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    pub(crate) fn set_last_load_time(&mut self, elapsed: Duration) {
        self.last_load_time = Some(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_views_are_pruned() {
        let mut state = ProcessState::headless().unwrap();
        let a = View::new("a").into_handle();
        let b = View::new("b").into_handle();
        state.register_view(&a);
        state.register_view(&a);
        state.register_view(&b);
        assert_eq!(state.views().len(), 2);

        drop(b);
        let c = View::new("c").into_handle();
        state.register_view(&c);
        assert_eq!(state.views().len(), 2);
    }

    #[test]
    fn missing_core_font_is_fatal() {
        let mut state = ProcessState::headless().unwrap();
        let err = state
            .load_core_fonts(&[FontSpec::new("/no/such/font.ttf", 16.0)])
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(state.assets().core_font_count(), 0);
    }
}
