//! The windowed shell: event loop, GPU context and the per-frame pump.
//!
//! The shell draws nothing but a clear pass in the active scene's background
//! color. While a switch is running the window title shows the loader's
//! progress. Number keys switch scenes, `0` switches to the empty scene.

use std::rc::Rc;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::assets::AssetManager;
use crate::config::AppConfig;
use crate::ecs::Color;
use crate::gpu::GpuContext;
use crate::scene::{SceneId, SceneRegistry, SceneSwitchController, SwitchHooks};
use crate::state::ProcessState;
use crate::view::{View, ViewHandle};

/// Open a window and run the scene pipeline until it is closed.
///
/// # Example
/// ```ignore
/// let mut registry = SceneRegistry::new();
/// registry.register(1u32, "Lobby", || Box::new(Lobby::default()))?;
///
/// stagehand::run(AppConfig::new().title("Lobby").initial_scene(1u32), registry)?;
/// ```
pub fn run(config: AppConfig, registry: SceneRegistry) -> anyhow::Result<()> {
    run_with_hooks(config, registry, SwitchHooks::default())
}

/// [`run`] with callbacks around each switch.
pub fn run_with_hooks(config: AppConfig, registry: SceneRegistry, hooks: SwitchHooks) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = StagehandApp {
        phase: AppPhase::Pending {
            config,
            registry: Some(registry),
            hooks: Some(hooks),
        },
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct StagehandApp {
    phase: AppPhase,
    /// Set when the shell stops because of an error.
    error: Option<anyhow::Error>,
}

enum AppPhase {
    Pending {
        config: AppConfig,
        registry: Option<SceneRegistry>,
        hooks: Option<SwitchHooks>,
    },
    Running(Box<Running>),
}

struct Running {
    window: Arc<Window>,
    gpu: Rc<GpuContext>,
    state: ProcessState,
    controller: SceneSwitchController,
    view: ViewHandle,
    title: String,
    shown_title: String,
}

impl Running {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        registry: SceneRegistry,
        hooks: SwitchHooks,
    ) -> anyhow::Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = Rc::new(GpuContext::new(Arc::clone(&window))?);

        let mut state = ProcessState::new(AssetManager::new(Rc::clone(&gpu)), config.assets.clone())?;
        if !config.core_fonts.is_empty() {
            state.load_core_fonts(&config.core_fonts)?;
        }

        let view = View::new("main").into_handle();
        state.register_view(&view);

        let mut controller = SceneSwitchController::new(registry)
            .with_hooks(hooks)
            .with_stall_warning(config.stall_warning_after());
        tracing::info!(
            "[app] {} scene(s) registered, surface {}x{} {:?}",
            controller.registry().len(),
            gpu.width(),
            gpu.height(),
            gpu.format()
        );
        if let Some(id) = config.initial_scene {
            controller.switch_scene(&mut state, id, &view);
        }

        window.request_redraw();
        Ok(Self {
            window,
            gpu,
            state,
            controller,
            view,
            title: config.title.clone(),
            shown_title: config.title.clone(),
        })
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        if code == KeyCode::Escape {
            event_loop.exit();
            return;
        }
        if let Some(n) = digit(code) {
            let id = SceneId::new(n);
            if id != SceneId::NONE && !self.controller.registry().contains(id) {
                tracing::warn!("[app] no scene bound to key {}", n);
                return;
            }
            self.controller.switch_scene(&mut self.state, id, &self.view);
        }
    }

    fn update_title(&mut self) {
        let title = if self.state.job_is_running() {
            format!(
                "{} - {} ({}/{})",
                self.title,
                self.state.job_progress_message(),
                self.state.job_progress_num(),
                self.state.job_progress_max()
            )
        } else if let Some(scene) = self.state.active_scene() {
            format!("{} - {}", self.title, scene.borrow().name())
        } else {
            self.title.clone()
        };

        if title != self.shown_title {
            self.window.set_title(&title);
            self.shown_title = title;
        }
    }

    fn background(&self) -> Color {
        let color = self
            .view
            .borrow()
            .scene()
            .map(|scene| scene.borrow().background())
            .unwrap_or(Color::BLACK);
        if self.controller.is_idle() { color } else { color.dimmed(0.5) }
    }

    /// Returns `Err` only for surface errors the shell cannot recover from.
    fn render(&self) -> Result<(), wgpu::SurfaceError> {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("[gpu] surface timeout, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let target = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background().to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl ApplicationHandler for StagehandApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppPhase::Pending {
            config,
            registry,
            hooks,
        } = &mut self.phase
        else {
            return;
        };

        let registry = registry.take().unwrap_or_default();
        let hooks = hooks.take().unwrap_or_default();
        match Running::start(event_loop, config, registry, hooks) {
            Ok(running) => self.phase = AppPhase::Running(Box::new(running)),
            Err(err) => {
                tracing::error!("[app] startup failed: {err:#}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppPhase::Running(running) = &mut self.phase else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => running.gpu.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => running.on_key(event_loop, &event),
            WindowEvent::RedrawRequested => {
                if let Err(err) = running.controller.update(&mut running.state) {
                    tracing::error!("[app] stopping: {err}");
                    self.error = Some(err.into());
                    event_loop.exit();
                    return;
                }
                running.update_title();
                if let Err(err) = running.render() {
                    tracing::error!("[gpu] surface error: {err}");
                    self.error = Some(err.into());
                    event_loop.exit();
                    return;
                }
                running.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn digit(code: KeyCode) -> Option<u32> {
    let n = match code {
        KeyCode::Digit0 => 0,
        KeyCode::Digit1 => 1,
        KeyCode::Digit2 => 2,
        KeyCode::Digit3 => 3,
        KeyCode::Digit4 => 4,
        KeyCode::Digit5 => 5,
        KeyCode::Digit6 => 6,
        KeyCode::Digit7 => 7,
        KeyCode::Digit8 => 8,
        KeyCode::Digit9 => 9,
        _ => return None,
    };
    Some(n)
}
