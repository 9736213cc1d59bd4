//! Headless pipeline tests: a real worker thread, no GPU.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use super::*;
use crate::camera::Camera;
use crate::config::AssetPaths;
use crate::error::{LoadError, SwitchError};
use crate::geometry::RawGeometry;
use crate::loader::{AssetLoadQueue, AssetSlot, Placeholder};
use crate::sensor::SimulatedSensor;
use crate::state::ProcessState;
use crate::texture::ImageData;
use crate::view::{View, ViewHandle};

#[derive(Default)]
struct Journal {
    events: Vec<String>,
    uploads_at_assemble: Vec<usize>,
    view_had_scene_at_assemble: Vec<bool>,
    /// (ready, missing) slot counts seen by each assemble.
    slots_at_assemble: Vec<(usize, usize)>,
}

impl Journal {
    fn saw(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

type Log = Rc<RefCell<Journal>>;

enum Task {
    Ok,
    Fail,
    Fatal,
    Gated(flume::Receiver<()>),
}

struct ScriptedScene {
    name: String,
    log: Log,
    tasks: Vec<Task>,
    deferred: usize,
    defer_in_second: bool,
    register_error: Option<&'static str>,
    assemble_error: Option<&'static str>,
    panic_in_assemble: bool,
    camera: Option<Camera>,
    sensors: Vec<&'static str>,
    slots: Vec<AssetSlot<usize>>,
    load_time: Option<Duration>,
}

impl ScriptedScene {
    fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            log: Rc::clone(log),
            tasks: Vec::new(),
            deferred: 0,
            defer_in_second: false,
            register_error: None,
            assemble_error: None,
            panic_in_assemble: false,
            camera: None,
            sensors: Vec::new(),
            slots: Vec::new(),
            load_time: None,
        }
    }

    fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    fn tasks(mut self, n: usize) -> Self {
        self.tasks.extend((0..n).map(|_| Task::Ok));
        self
    }

    fn deferred(mut self, n: usize) -> Self {
        self.deferred = n;
        self
    }

    fn boxed(self) -> Box<dyn Scene> {
        Box::new(self)
    }

    fn add_slot_task(&mut self, queue: &mut AssetLoadQueue, task: Task) {
        let slot = AssetSlot::new();
        let index = self.slots.len();
        let writer = slot.clone();
        self.slots.push(slot);
        queue.add_task(format!("{} task {index}", self.name), move || match task {
            Task::Ok => {
                thread::sleep(Duration::from_millis(2));
                writer.fill(index);
                Ok(())
            }
            Task::Fail => {
                writer.mark_missing("bad bytes");
                Err(LoadError::decode(format!("asset{index}.png"), "bad bytes"))
            }
            Task::Fatal => Err(LoadError::CoreData("font table corrupt".into())),
            Task::Gated(gate) => {
                let _ = gate.recv();
                writer.fill(index);
                Ok(())
            }
        });
    }
}

impl Drop for ScriptedScene {
    fn drop(&mut self) {
        if let Ok(mut journal) = self.log.try_borrow_mut() {
            journal.events.push(format!("{} dropped", self.name));
        }
    }
}

impl Scene for ScriptedScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
        self.log.borrow_mut().events.push(format!("{} register", self.name));
        if let Some(message) = self.register_error {
            anyhow::bail!(message);
        }
        for task in std::mem::take(&mut self.tasks) {
            self.add_slot_task(queue, task);
        }
        Ok(())
    }

    fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
        let phase = ctx.phase();
        {
            let mut journal = self.log.borrow_mut();
            journal.events.push(format!("{} assemble {}", self.name, phase.number()));
            journal.uploads_at_assemble.push(ctx.assets().upload_count());
            journal
                .view_had_scene_at_assemble
                .push(ctx.view().is_some_and(|v| v.borrow().has_scene()));
            let ready = self.slots.iter().filter(|s| s.is_ready()).count();
            let missing = self.slots.iter().filter(|s| s.is_missing()).count();
            journal.slots_at_assemble.push((ready, missing));
        }

        ctx.assets().add_mesh(format!("{} mesh", self.name), RawGeometry::cube());

        if phase == Phase::First {
            for _ in 0..self.deferred {
                self.add_slot_task(ctx.deferred(), Task::Ok);
            }
        } else if self.defer_in_second {
            ctx.deferred().add_task("too late", || Ok(()));
        }

        for sensor in &self.sensors {
            ctx.request_sensor(*sensor);
        }
        if let Some(message) = self.assemble_error {
            anyhow::bail!(message);
        }
        if self.panic_in_assemble {
            panic!("assembly exploded");
        }
        Ok(())
    }

    fn camera(&self) -> Option<Camera> {
        self.camera
    }

    fn load_time(&self) -> Option<Duration> {
        self.load_time
    }

    fn set_load_time(&mut self, elapsed: Duration) {
        self.load_time = Some(elapsed);
    }
}

fn setup() -> (ProcessState, ViewHandle) {
    let mut state = ProcessState::headless().unwrap();
    let view = View::new("main").into_handle();
    state.register_view(&view);
    (state, view)
}

type Factory = Box<dyn Fn() -> Box<dyn Scene>>;

fn factory(build: impl Fn() -> Box<dyn Scene> + 'static) -> Factory {
    Box::new(build)
}

fn controller_with(scenes: Vec<(u32, Factory)>) -> SceneSwitchController {
    let mut registry = SceneRegistry::new();
    for (id, build) in scenes {
        registry
            .register(id, format!("scene {id}"), move || build())
            .unwrap();
    }
    SceneSwitchController::new(registry)
}

fn pump(controller: &mut SceneSwitchController, state: &mut ProcessState) -> Result<(), SwitchError> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !controller.is_idle() {
        controller.update(state)?;
        assert!(Instant::now() < deadline, "switch did not finish");
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

fn active_name(state: &ProcessState) -> Option<String> {
    state
        .active_scene()
        .map(|scene| scene.borrow().name().to_string())
}

#[test]
fn zero_asset_scene_is_assembled_once_and_published() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(1, factory(move || ScriptedScene::new("Bare", &l).boxed()))]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    assert_eq!(controller.state(), SwitchState::Loading(Phase::First));
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(log.borrow().events, vec!["Bare register", "Bare assemble 1"]);
    assert_eq!(state.scene_id(), SceneId::new(1));
    assert_eq!(active_name(&state).as_deref(), Some("Bare"));
    assert!(view.borrow().has_scene());
    assert!(view.borrow().is_initialized());
    assert!(state.last_load_time().is_some());
    assert!(state.active_scene().unwrap().borrow().load_time().is_some());
    assert_eq!(state.progress().snapshot(), (0, 0));
    assert!(state.last_error().is_none());
}

#[test]
fn assemble_only_runs_after_every_task_finished() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(1, factory(move || ScriptedScene::new("Busy", &l).tasks(5).boxed()))]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(log.borrow().slots_at_assemble, vec![(5, 0)]);
}

#[test]
fn nothing_is_uploaded_while_tasks_run() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(1, factory(move || ScriptedScene::new("Quiet", &l).tasks(3).boxed()))]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    let uploads_after_register = state.assets().upload_count();
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(log.borrow().uploads_at_assemble, vec![uploads_after_register]);
    assert_eq!(state.assets().upload_count(), uploads_after_register + 1);
}

#[test]
fn failed_decode_leaves_a_placeholder_and_the_scene_still_loads() {
    struct Gallery {
        images: Vec<AssetSlot<ImageData>>,
        files: Vec<PathBuf>,
        textures_seen: Rc<RefCell<Vec<(u32, u32)>>>,
    }

    impl Scene for Gallery {
        fn name(&self) -> &str {
            "Gallery"
        }

        fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
            for (slot, file) in self.images.iter().zip(&self.files) {
                queue.add_texture(slot, file);
            }
            Ok(())
        }

        fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
            for slot in &self.images {
                let image = slot.take_or_placeholder();
                self.textures_seen.borrow_mut().push((image.width, image.height));
                ctx.assets().add_texture(image);
            }
            Ok(())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    for name in ["a.png", "c.png"] {
        image::RgbaImage::from_pixel(4, 4, image::Rgba([9, 9, 9, 255]))
            .save(dir.path().join(name))
            .unwrap();
    }
    std::fs::write(dir.path().join("b.png"), b"this is not a png").unwrap();

    let paths = AssetPaths {
        textures: dir.path().to_path_buf(),
        ..AssetPaths::default()
    };
    let mut state = ProcessState::new(crate::assets::AssetManager::headless(), paths).unwrap();
    let view = View::new("main").into_handle();
    state.register_view(&view);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let mut controller = controller_with(vec![(
        4,
        factory(move || {
            Box::new(Gallery {
                images: (0..3).map(|_| AssetSlot::new()).collect(),
                files: ["a.png", "b.png", "c.png"].map(PathBuf::from).to_vec(),
                textures_seen: Rc::clone(&s),
            })
        }),
    )]);

    controller.switch_scene(&mut state, SceneId::new(4), &view);
    pump(&mut controller, &mut state).unwrap();

    let placeholder = ImageData::placeholder();
    assert_eq!(
        *seen.borrow(),
        vec![(4, 4), (placeholder.width, placeholder.height), (4, 4)]
    );
    assert_eq!(active_name(&state).as_deref(), Some("Gallery"));
    assert!(state.last_error().is_none());
    assert_eq!(state.assets().len(), 3);
}

#[test]
fn deferred_tasks_run_a_second_round() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(
        2,
        factory(move || ScriptedScene::new("Twice", &l).tasks(1).deferred(2).boxed()),
    )]);

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    pump(&mut controller, &mut state).unwrap();

    let journal = log.borrow();
    assert_eq!(
        journal.events,
        vec!["Twice register", "Twice assemble 1", "Twice assemble 2"]
    );
    assert_eq!(journal.slots_at_assemble, vec![(1, 0), (3, 0)]);
    assert_eq!(active_name(&state).as_deref(), Some("Twice"));
}

#[test]
fn tasks_deferred_in_the_second_round_are_dropped() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(
        2,
        factory(move || {
            let mut scene = ScriptedScene::new("Greedy", &l).deferred(1);
            scene.defer_in_second = true;
            scene.boxed()
        }),
    )]);

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(log.borrow().slots_at_assemble.len(), 2);
    assert_eq!(active_name(&state).as_deref(), Some("Greedy"));
}

#[test]
fn views_only_see_the_new_scene_after_finalization() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(
        1,
        factory(move || {
            ScriptedScene::new("Slow", &l)
                .task(Task::Gated(gate_rx.clone()))
                .deferred(1)
                .boxed()
        }),
    )]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    controller.update(&mut state).unwrap();
    assert!(!view.borrow().has_scene());
    assert!(state.active_scene().is_none());

    gate_tx.send(()).unwrap();
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(log.borrow().view_had_scene_at_assemble, vec![false, false]);
    assert!(view.borrow().has_scene());
}

#[test]
fn teardown_empties_the_asset_manager() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (1, factory(move || ScriptedScene::new("A", &la).boxed())),
        (
            2,
            factory(move || ScriptedScene::new("B", &lb).task(Task::Gated(gate_rx.clone())).boxed()),
        ),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(state.assets().len(), 1);

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    assert!(state.assets().is_empty());
    assert!(log.borrow().saw("A dropped"));
    assert!(!view.borrow().is_initialized());

    gate_tx.send(()).unwrap();
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(state.assets().len(), 1);
}

#[test]
fn a_second_request_supersedes_the_running_switch() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (
            1,
            factory(move || ScriptedScene::new("A", &la).task(Task::Gated(gate_rx.clone())).boxed()),
        ),
        (2, factory(move || ScriptedScene::new("B", &lb).tasks(2).boxed())),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    // A's batch is now on the worker, blocked.
    controller.update(&mut state).unwrap();
    controller.switch_scene(&mut state, SceneId::new(2), &view);
    assert!(log.borrow().saw("A dropped"));

    gate_tx.send(()).unwrap();
    pump(&mut controller, &mut state).unwrap();
    // Let any stale continuation arrive.
    for _ in 0..20 {
        controller.update(&mut state).unwrap();
        thread::sleep(Duration::from_millis(1));
    }

    let journal = log.borrow();
    assert!(!journal.saw("A assemble 1"));
    assert!(journal.saw("B assemble 1"));
    assert_eq!(controller.generation(), 2);
    assert_eq!(state.scene_id(), SceneId::new(2));
    assert_eq!(active_name(&state).as_deref(), Some("B"));
    let attached = view.borrow().scene().map(|s| s.borrow().name().to_string());
    assert_eq!(attached.as_deref(), Some("B"));
}

#[test]
fn back_to_back_requests_without_a_frame_in_between() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (1, factory(move || ScriptedScene::new("A", &la).tasks(2).boxed())),
        (2, factory(move || ScriptedScene::new("B", &lb).tasks(1).boxed())),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    controller.switch_scene(&mut state, SceneId::new(2), &view);
    pump(&mut controller, &mut state).unwrap();

    assert!(!log.borrow().saw("A assemble 1"));
    assert_eq!(active_name(&state).as_deref(), Some("B"));
}

#[test]
fn unknown_scene_publishes_the_empty_sentinel() {
    let (mut state, view) = setup();
    let mut controller = controller_with(Vec::new());

    controller.switch_scene(&mut state, SceneId::new(9), &view);

    assert!(controller.is_idle());
    assert_eq!(active_name(&state).as_deref(), Some("Empty"));
    assert_eq!(state.last_error(), Some("no scene registered for id #9"));
    let scene = view.borrow().scene().unwrap();
    assert_eq!(scene.borrow().info(), "no scene registered for id #9");
}

#[test]
fn switching_to_none_is_not_an_error() {
    let (mut state, view) = setup();
    let mut controller = controller_with(Vec::new());

    controller.switch_scene(&mut state, SceneId::NONE, &view);

    assert!(controller.is_idle());
    assert_eq!(state.scene_id(), SceneId::NONE);
    assert_eq!(active_name(&state).as_deref(), Some("Empty"));
    assert!(state.last_error().is_none());
}

#[test]
fn assemble_errors_and_panics_fall_back_to_the_sentinel() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (
            1,
            factory(move || {
                let mut scene = ScriptedScene::new("Broken", &la);
                scene.assemble_error = Some("material table missing");
                scene.boxed()
            }),
        ),
        (
            2,
            factory(move || {
                let mut scene = ScriptedScene::new("Explosive", &lb);
                scene.panic_in_assemble = true;
                scene.boxed()
            }),
        ),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(active_name(&state).as_deref(), Some("Empty"));
    assert_eq!(
        state.last_error(),
        Some("failed to assemble scene 'Broken' (phase 1): material table missing")
    );
    assert!(log.borrow().saw("Broken dropped"));

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(active_name(&state).as_deref(), Some("Empty"));
    assert_eq!(
        state.last_error(),
        Some("scene 'Explosive' panicked during assemble: assembly exploded")
    );
    assert!(view.borrow().has_scene());
}

#[test]
fn corrupt_core_data_is_fatal() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(
        3,
        factory(move || ScriptedScene::new("Doomed", &l).task(Task::Fatal).tasks(1).boxed()),
    )]);

    controller.switch_scene(&mut state, SceneId::new(3), &view);
    let err = pump(&mut controller, &mut state).unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, SwitchError::Fatal(ref f) if f.message.contains("font table corrupt")));
    assert!(!log.borrow().saw("Doomed assemble 1"));
    assert!(controller.is_idle());
}

#[test]
fn recoverable_failures_do_not_abort_the_switch() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(
        3,
        factory(move || ScriptedScene::new("Patchy", &l).tasks(1).task(Task::Fail).tasks(1).boxed()),
    )]);

    controller.switch_scene(&mut state, SceneId::new(3), &view);
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(log.borrow().slots_at_assemble, vec![(2, 1)]);
    assert_eq!(active_name(&state).as_deref(), Some("Patchy"));
}

#[test]
fn hooks_fire_in_pipeline_order() {
    let (mut state, view) = setup();
    let log = Log::default();
    let calls = Rc::new(RefCell::new(Vec::<String>::new()));
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));

    let mut registry = SceneRegistry::new();
    registry
        .register(1u32, "A", move || ScriptedScene::new("A", &la).boxed())
        .unwrap();
    registry
        .register(2u32, "B", move || ScriptedScene::new("B", &lb).boxed())
        .unwrap();

    let (c1, c2, c3, c4) = (
        Rc::clone(&calls),
        Rc::clone(&calls),
        Rc::clone(&calls),
        Rc::clone(&calls),
    );
    let hooks = SwitchHooks::new()
        .on_before_scene_delete(move |s| c1.borrow_mut().push(format!("delete {}", s.name())))
        .on_before_scene_load(move |s| c2.borrow_mut().push(format!("load {}", s.name())))
        .on_before_scene_assembly(move |s| c3.borrow_mut().push(format!("assembly {}", s.name())))
        .on_after_scene_assembly(move |s| c4.borrow_mut().push(format!("ready {}", s.name())));
    let mut controller = SceneSwitchController::new(registry).with_hooks(hooks);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();
    controller.switch_scene(&mut state, SceneId::new(2), &view);
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![
            "load A",
            "assembly A",
            "ready A",
            "delete A",
            "load B",
            "assembly B",
            "ready B",
        ]
    );
}

#[test]
fn sensors_follow_the_active_scene() {
    let (mut state, view) = setup();
    state.sensors_mut().add(SimulatedSensor::new("rotation"));
    state.sensors_mut().add(SimulatedSensor::new("location"));
    let log = Log::default();
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (
            1,
            factory(move || {
                let mut scene = ScriptedScene::new("Compass", &la);
                scene.sensors = vec!["rotation"];
                scene.boxed()
            }),
        ),
        (2, factory(move || ScriptedScene::new("Plain", &lb).boxed())),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();
    assert!(state.sensors().is_enabled("rotation"));
    assert!(!state.sensors().is_enabled("location"));

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    assert!(!state.sensors().is_enabled("rotation"));
    pump(&mut controller, &mut state).unwrap();
    assert!(!state.sensors().is_enabled("rotation"));
}

#[test]
fn views_take_the_scene_camera_or_keep_their_default() {
    let (mut state, view) = setup();
    let default = Camera::new().at(Vec3::new(0.0, 1.0, 10.0));
    let side = View::new("side").with_default_camera(default).into_handle();
    state.register_view(&side);

    let scene_camera = Camera::new().at(Vec3::new(3.0, 3.0, 3.0)).looking_at(Vec3::ZERO);
    let log = Log::default();
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (
            1,
            factory(move || {
                let mut scene = ScriptedScene::new("Framed", &la);
                scene.camera = Some(scene_camera);
                scene.boxed()
            }),
        ),
        (2, factory(move || ScriptedScene::new("Free", &lb).boxed())),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(view.borrow().camera(), scene_camera);
    assert_eq!(side.borrow().camera(), scene_camera);
    assert!(side.borrow().has_scene());
    assert!(side.borrow().is_initialized());

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(side.borrow().camera(), default);
}

#[test]
fn externally_built_scenes_record_the_custom_id() {
    let (mut state, view) = setup();
    let log = Log::default();
    let mut controller = controller_with(Vec::new());

    controller.switch_to_scene(&mut state, ScriptedScene::new("Adhoc", &log).tasks(1).boxed(), &view);
    assert_eq!(state.scene_id(), SceneId::CUSTOM);
    pump(&mut controller, &mut state).unwrap();

    assert_eq!(state.scene_id(), SceneId::CUSTOM);
    assert_eq!(active_name(&state).as_deref(), Some("Adhoc"));
}

#[test]
fn stall_warning_does_not_cancel_the_switch() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let l = Rc::clone(&log);
    let mut controller = controller_with(vec![(
        1,
        factory(move || ScriptedScene::new("Sleepy", &l).task(Task::Gated(gate_rx.clone())).boxed()),
    )])
    .with_stall_warning(Some(Duration::from_millis(1)));

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    for _ in 0..5 {
        controller.update(&mut state).unwrap();
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(controller.state(), SwitchState::Loading(Phase::First));

    gate_tx.send(()).unwrap();
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(active_name(&state).as_deref(), Some("Sleepy"));
}

#[test]
fn fatal_report_from_a_superseded_switch_leaves_the_new_one_alone() {
    let (mut state, view) = setup();
    let log = Log::default();
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));
    let mut controller = controller_with(vec![
        (
            1,
            factory(move || {
                ScriptedScene::new("A", &la)
                    .task(Task::Gated(gate_rx.clone()))
                    .task(Task::Fatal)
                    .boxed()
            }),
        ),
        (2, factory(move || ScriptedScene::new("B", &lb).tasks(1).boxed())),
    ]);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    controller.update(&mut state).unwrap();
    controller.switch_scene(&mut state, SceneId::new(2), &view);
    gate_tx.send(()).unwrap();

    pump(&mut controller, &mut state).unwrap();
    for _ in 0..20 {
        controller.update(&mut state).unwrap();
        thread::sleep(Duration::from_millis(1));
    }

    assert!(!log.borrow().saw("A assemble 1"));
    assert!(log.borrow().saw("B assemble 1"));
    assert_eq!(state.scene_id(), SceneId::new(2));
    assert_eq!(active_name(&state).as_deref(), Some("B"));
    assert!(state.last_error().is_none());
    assert!(view.borrow().has_scene());
}

#[test]
fn before_load_hook_waits_for_a_successful_registration() {
    let (mut state, view) = setup();
    let log = Log::default();
    let loads = Rc::new(RefCell::new(Vec::<String>::new()));
    let (la, lb) = (Rc::clone(&log), Rc::clone(&log));

    let mut registry = SceneRegistry::new();
    registry
        .register(1u32, "Refuses", move || {
            let mut scene = ScriptedScene::new("Refuses", &la);
            scene.register_error = Some("manifest unreadable");
            scene.boxed()
        })
        .unwrap();
    registry
        .register(2u32, "Fine", move || ScriptedScene::new("Fine", &lb).boxed())
        .unwrap();

    let seen = Rc::clone(&loads);
    let hooks = SwitchHooks::new().on_before_scene_load(move |s| seen.borrow_mut().push(s.name().to_string()));
    let mut controller = SceneSwitchController::new(registry).with_hooks(hooks);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    assert!(controller.is_idle());
    assert_eq!(
        state.last_error(),
        Some("failed to register assets for scene 'Refuses': manifest unreadable")
    );
    assert!(loads.borrow().is_empty());

    controller.switch_scene(&mut state, SceneId::new(2), &view);
    assert_eq!(*loads.borrow(), vec!["Fine"]);
    pump(&mut controller, &mut state).unwrap();
    assert_eq!(active_name(&state).as_deref(), Some("Fine"));
}

#[test]
fn a_panicking_application_hook_does_not_stop_the_switch() {
    let (mut state, view) = setup();
    let log = Log::default();
    let l = Rc::clone(&log);

    let mut registry = SceneRegistry::new();
    registry
        .register(1u32, "Sturdy", move || ScriptedScene::new("Sturdy", &l).tasks(1).boxed())
        .unwrap();
    let hooks = SwitchHooks::new()
        .on_before_scene_load(|_| panic!("load hook failed"))
        .on_before_scene_assembly(|_| panic!("assembly hook failed"))
        .on_after_scene_assembly(|_| panic!("ready hook failed"));
    let mut controller = SceneSwitchController::new(registry).with_hooks(hooks);

    controller.switch_scene(&mut state, SceneId::new(1), &view);
    pump(&mut controller, &mut state).unwrap();

    assert!(log.borrow().saw("Sturdy assemble 1"));
    assert_eq!(active_name(&state).as_deref(), Some("Sturdy"));
    assert!(state.last_error().is_none());
}
