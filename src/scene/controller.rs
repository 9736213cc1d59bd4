//! The asynchronous scene switch.
//!
//! A switch runs as a small state machine driven from the main thread:
//!
//! ```text
//! Idle -> TearingDown -> Constructing -> Loading(First) -> Assembling(First)
//!      -> [Loading(Second) -> Assembling(Second)] -> Finalizing -> Idle
//! ```
//!
//! [`SceneSwitchController::switch_scene`] runs everything up to handing the
//! first load batch to the worker and returns. From then on
//! [`SceneSwitchController::update`], called once per frame, pumps the job
//! queues and advances the machine whenever a phase completes.
//!
//! Every switch bumps a generation counter. Phase completions carry the
//! generation they were started under and are dropped if a newer switch has
//! happened since, so a request arriving mid-switch simply supersedes the
//! running one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crate::error::{panic_message, SwitchError};
use crate::loader::{AssetLoadQueue, PhaseReport};
use crate::scene::scene::into_handle;
use crate::scene::{AssemblyContext, EmptyScene, Phase, Scene, SceneHandle, SceneId, SceneRegistry, SwitchHooks};
use crate::state::ProcessState;
use crate::view::{View, ViewHandle};

/// Where the controller is in a switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    TearingDown,
    Constructing,
    Loading(Phase),
    Assembling(Phase),
    Finalizing,
}

/// A finished load batch, as seen by the main thread.
struct PhaseEvent {
    generation: u64,
    phase: Phase,
    report: PhaseReport,
}

/// The scene being built, until it is published.
struct InFlight {
    id: SceneId,
    name: String,
    scene: SceneHandle,
    view: Weak<RefCell<View>>,
    phase: Phase,
    started: Instant,
    phase_started: Instant,
    stall_reported: bool,
    sensors: Vec<String>,
}

#[derive(Clone, Copy)]
enum Stage {
    Init,
    Register,
    Assemble(Phase),
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Register => "register_assets",
            Stage::Assemble(_) => "assemble",
        }
    }
}

/// Runs a scene hook, turning both errors and panics into a [`SwitchError`].
fn call_hook(
    scene: &str,
    stage: Stage,
    hook: impl FnOnce() -> anyhow::Result<()>,
) -> Result<(), SwitchError> {
    let scene = scene.to_string();
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(cause)) => Err(match stage {
            Stage::Init => SwitchError::Init { scene, cause },
            Stage::Register => SwitchError::Register { scene, cause },
            Stage::Assemble(phase) => SwitchError::Assemble {
                scene,
                phase: phase.number(),
                cause,
            },
        }),
        Err(payload) => Err(SwitchError::Panicked {
            scene,
            stage: stage.label(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Orchestrates tearing down one scene and bringing up the next.
pub struct SceneSwitchController {
    registry: SceneRegistry,
    hooks: SwitchHooks,
    state: SwitchState,
    generation: u64,
    inbox: Rc<RefCell<VecDeque<PhaseEvent>>>,
    in_flight: Option<InFlight>,
    stall_warning: Option<Duration>,
}

impl SceneSwitchController {
    pub fn new(registry: SceneRegistry) -> Self {
        Self {
            registry,
            hooks: SwitchHooks::default(),
            state: SwitchState::Idle,
            generation: 0,
            inbox: Rc::default(),
            in_flight: None,
            stall_warning: None,
        }
    }

    pub fn with_hooks(mut self, hooks: SwitchHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Log a warning once when a load phase runs longer than `after`.
    pub fn with_stall_warning(mut self, after: Option<Duration>) -> Self {
        self.stall_warning = after;
        self
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SwitchState::Idle
    }

    /// Number of switches requested so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start switching to the scene registered under `id`.
    ///
    /// Returns once the first load batch is queued. Failures are not
    /// returned: they publish an [`EmptyScene`] carrying the message, which
    /// is also available from [`ProcessState::last_error`].
    pub fn switch_scene(&mut self, state: &mut ProcessState, id: SceneId, view: &ViewHandle) {
        self.begin(state, id);

        if id == SceneId::NONE {
            self.publish_empty(state, Some(view), EmptyScene::new());
            self.state = SwitchState::Idle;
            return;
        }

        self.state = SwitchState::Constructing;
        state.set_scene_id(id);
        match self.registry.create(id) {
            Some(scene) => self.start(state, id, scene, view),
            None => self.fail(state, Some(view), SwitchError::UnknownScene(id)),
        }
    }

    /// Run the same pipeline for a scene built by the caller.
    pub fn switch_to_scene(&mut self, state: &mut ProcessState, scene: Box<dyn Scene>, view: &ViewHandle) {
        self.begin(state, SceneId::CUSTOM);
        self.state = SwitchState::Constructing;
        state.set_scene_id(SceneId::CUSTOM);
        self.start(state, SceneId::CUSTOM, scene, view);
    }

    /// Pump background jobs and advance the switch. Call once per frame.
    ///
    /// Only [`SwitchError::Fatal`] is returned; the caller should stop the process.
    pub fn update(&mut self, state: &mut ProcessState) -> Result<(), SwitchError> {
        state.handle_parallel_job();
        self.check_stall();

        loop {
            let event = self.inbox.borrow_mut().pop_front();
            let Some(event) = event else {
                return Ok(());
            };

            if event.generation != self.generation {
                if let Some(fatal) = &event.report.fatal {
                    tracing::error!(
                        "[scene] superseded '{}' phase hit a fatal failure, ignoring: {}",
                        event.report.label,
                        fatal
                    );
                } else {
                    tracing::debug!(
                        "[scene] dropping stale '{}' phase (generation {}, now {})",
                        event.report.label,
                        event.generation,
                        self.generation
                    );
                }
                continue;
            }

            if let Some(fatal) = event.report.fatal {
                tracing::error!("[scene] fatal failure while loading '{}': {}", event.report.label, fatal);
                self.in_flight = None;
                self.state = SwitchState::Idle;
                state.set_last_error(Some(fatal.to_string()));
                return Err(SwitchError::Fatal(fatal));
            }

            self.on_phase_done(state, event.phase, event.report);
        }
    }

    fn begin(&mut self, state: &mut ProcessState, id: SceneId) {
        self.generation += 1;
        if !self.is_idle() {
            tracing::info!("[scene] switch to {} supersedes the running switch", id);
        }
        tracing::info!("[scene] switching to {} (generation {})", id, self.generation);
        self.teardown(state);
    }

    fn teardown(&mut self, state: &mut ProcessState) {
        self.state = SwitchState::TearingDown;

        if let Some(active) = state.active_scene() {
            self.hooks.before_delete(&**active.borrow());
        }
        if let Some(flight) = self.in_flight.take() {
            tracing::debug!("[scene] abandoning unfinished scene '{}'", flight.name);
        }
        if let Some(old) = state.take_scene() {
            tracing::debug!("[scene] deleting '{}'", old.borrow().name());
        }

        state.sensors_mut().disable_all();
        for view in state.views() {
            view.borrow_mut().un_initialize();
        }
        state.assets_mut().clear();
        state.set_last_error(None);
    }

    fn start(&mut self, state: &mut ProcessState, id: SceneId, scene: Box<dyn Scene>, view: &ViewHandle) {
        let scene = into_handle(scene);
        let name = scene.borrow().name().to_string();

        if let Err(err) = call_hook(&name, Stage::Init, || scene.borrow_mut().init(state.assets_mut())) {
            self.fail(state, Some(view), err);
            return;
        }

        self.state = SwitchState::Loading(Phase::First);

        let mut queue = AssetLoadQueue::with_paths(name.clone(), state.asset_paths().clone());
        if let Err(err) = call_hook(&name, Stage::Register, || scene.borrow_mut().register_assets(&mut queue)) {
            self.fail(state, Some(view), err);
            return;
        }

        let loading = Rc::clone(&scene);
        let now = Instant::now();
        self.in_flight = Some(InFlight {
            id,
            name,
            scene,
            view: Rc::downgrade(view),
            phase: Phase::First,
            started: now,
            phase_started: now,
            stall_reported: false,
            sensors: Vec::new(),
        });
        if self.submit(state, queue, Phase::First) {
            self.hooks.before_load(&**loading.borrow());
        }
    }

    /// Hand a queue to the worker; its completion lands in the inbox.
    /// Returns `false` if the switch failed instead.
    fn submit(&mut self, state: &mut ProcessState, mut queue: AssetLoadQueue, phase: Phase) -> bool {
        let inbox = Rc::clone(&self.inbox);
        let generation = self.generation;
        let tasks = queue.len();

        let submitted = queue.run_async(state.jobs_mut(), move |report| {
            inbox.borrow_mut().push_back(PhaseEvent {
                generation,
                phase,
                report,
            });
        });

        match submitted {
            Ok(()) => {
                tracing::debug!("[scene] phase {} submitted with {} task(s)", phase.number(), tasks);
                if let Some(flight) = self.in_flight.as_mut() {
                    flight.phase = phase;
                    flight.phase_started = Instant::now();
                    flight.stall_reported = false;
                }
                self.state = SwitchState::Loading(phase);
                true
            }
            Err(err) => {
                let view = self.requesting_view();
                self.fail(state, view.as_ref(), err.into());
                false
            }
        }
    }

    fn on_phase_done(&mut self, state: &mut ProcessState, phase: Phase, report: PhaseReport) {
        let Some(flight) = self.in_flight.as_ref() else {
            return;
        };
        if flight.phase != phase {
            tracing::warn!("[scene] unexpected phase {} completion ignored", phase.number());
            return;
        }

        let scene = Rc::clone(&flight.scene);
        let name = flight.name.clone();
        let view = flight.view.upgrade();

        if !report.failures.is_empty() {
            tracing::warn!(
                "[scene] '{}': {} asset(s) failed to load, using placeholders",
                name,
                report.failures.len()
            );
        }

        self.state = SwitchState::Assembling(phase);
        self.hooks.before_assembly(&**scene.borrow());

        let deferred = AssetLoadQueue::with_paths(format!("{name} (deferred)"), state.asset_paths().clone());
        let mut ctx = AssemblyContext::new(state.assets_mut(), view.clone(), phase, deferred);
        let assembled = call_hook(&name, Stage::Assemble(phase), || scene.borrow_mut().assemble(&mut ctx));
        let (deferred, sensors) = ctx.finish();

        if let Err(err) = assembled {
            self.fail(state, view.as_ref(), err);
            return;
        }

        if let Some(flight) = self.in_flight.as_mut() {
            flight.sensors.extend(sensors);
        }

        match phase {
            Phase::First if !deferred.is_empty() => {
                self.submit(state, deferred, Phase::Second);
            }
            Phase::Second if !deferred.is_empty() => {
                tracing::warn!(
                    "[scene] '{}' deferred {} task(s) in its second assembly, dropping them",
                    name,
                    deferred.len()
                );
                self.finalize(state);
            }
            _ => self.finalize(state),
        }
    }

    fn finalize(&mut self, state: &mut ProcessState) {
        self.state = SwitchState::Finalizing;
        let Some(flight) = self.in_flight.take() else {
            self.state = SwitchState::Idle;
            return;
        };

        let requester = flight.view.upgrade();
        let camera = flight.scene.borrow().camera();
        let targets = Self::target_views(state, requester.as_ref());
        for view in &targets {
            let mut view = view.borrow_mut();
            view.attach_scene(&flight.scene);
            let camera = camera.unwrap_or(view.default_camera());
            view.set_camera(camera);
        }

        state.sensors_mut().enable_requested(&flight.sensors);
        for view in &targets {
            view.borrow_mut().on_initialize();
        }

        state.publish(flight.id, Rc::clone(&flight.scene));
        self.hooks.after_assembly(&**flight.scene.borrow());

        let elapsed = flight.started.elapsed();
        flight.scene.borrow_mut().set_load_time(elapsed);
        state.set_last_load_time(elapsed);

        tracing::info!(
            "[scene] '{}' ready in {:.1}ms",
            flight.name,
            elapsed.as_secs_f64() * 1000.0
        );
        self.state = SwitchState::Idle;
    }

    fn fail(&mut self, state: &mut ProcessState, view: Option<&ViewHandle>, err: SwitchError) {
        tracing::error!("[scene] switch failed: {}", err);
        self.in_flight = None;
        let message = err.to_string();
        self.publish_empty(state, view, EmptyScene::with_message(message.clone()));
        state.set_last_error(Some(message));
        self.state = SwitchState::Idle;
    }

    /// Publish a sentinel without running it through the load pipeline.
    fn publish_empty(&mut self, state: &mut ProcessState, view: Option<&ViewHandle>, empty: EmptyScene) {
        let scene = into_handle(Box::new(empty));
        for target in Self::target_views(state, view) {
            let mut target = target.borrow_mut();
            target.attach_scene(&scene);
            let camera = target.default_camera();
            target.set_camera(camera);
            target.on_initialize();
        }
        state.publish(SceneId::NONE, scene);
    }

    /// The requesting view plus every registered view without a scene.
    fn target_views(state: &ProcessState, requester: Option<&ViewHandle>) -> Vec<ViewHandle> {
        let mut targets: Vec<ViewHandle> = requester.cloned().into_iter().collect();
        for view in state.views() {
            if targets.iter().any(|t| Rc::ptr_eq(t, &view)) {
                continue;
            }
            if !view.borrow().has_scene() {
                targets.push(view);
            }
        }
        targets
    }

    fn requesting_view(&self) -> Option<ViewHandle> {
        self.in_flight.as_ref().and_then(|f| f.view.upgrade())
    }

    fn check_stall(&mut self) {
        let Some(limit) = self.stall_warning else {
            return;
        };
        let Some(flight) = self.in_flight.as_mut() else {
            return;
        };
        let elapsed = flight.phase_started.elapsed();
        if !flight.stall_reported && elapsed > limit {
            flight.stall_reported = true;
            tracing::warn!(
                "[scene] '{}' phase {} still loading after {:.1}s",
                flight.name,
                flight.phase.number(),
                elapsed.as_secs_f64()
            );
        }
    }
}
