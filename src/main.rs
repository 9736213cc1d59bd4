//! Demo binary: three scenes on keys 1 to 3, `0` for the empty scene.
//!
//! ```text
//! stagehand [config.toml]
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use stagehand::*;

/// Procedural tiles. No files, so it always loads.
struct NoiseGarden {
    tiles: Vec<AssetSlot<ImageData>>,
    content: SceneContent,
}

impl NoiseGarden {
    fn new() -> Self {
        Self {
            tiles: (0..12).map(|_| AssetSlot::new()).collect(),
            content: SceneContent::new("Noise Garden"),
        }
    }
}

impl Scene for NoiseGarden {
    fn name(&self) -> &str {
        "Noise Garden"
    }

    fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
        for (seed, slot) in self.tiles.iter().enumerate() {
            let slot = slot.clone();
            queue.add_task(format!("noise tile {seed}"), move || {
                slot.fill(ImageData::noise(128, seed as u32));
                Ok(())
            });
        }
        Ok(())
    }

    fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
        let cube = ctx.assets().add_mesh("tile", RawGeometry::cube());
        for (i, slot) in self.tiles.iter().enumerate() {
            let texture = ctx.assets().add_texture(slot.take_or_placeholder());
            let x = (i % 4) as f32 * 1.5 - 2.25;
            let z = (i / 4) as f32 * 1.5 - 1.5;
            self.content.spawn_mesh(
                format!("tile {i}"),
                Transform::from_position(Vec3::new(x, 0.0, z)).scale(Vec3::new(1.0, 0.2, 1.0)),
                RenderMesh::with_texture(cube, Color::WHITE, texture),
            );
        }
        Ok(())
    }

    fn content(&self) -> Option<&SceneContent> {
        Some(&self.content)
    }

    fn camera(&self) -> Option<Camera> {
        Some(Camera::new().at(Vec3::new(0.0, 6.0, 8.0)).looking_at(Vec3::ZERO))
    }

    fn background(&self) -> Color {
        Color::rgb(0.08, 0.12, 0.1)
    }
}

/// Everything from disk. Missing files show up as placeholders.
struct Gallery {
    wall: AssetSlot<ImageData>,
    statue: AssetSlot<RawGeometry>,
    shader: AssetSlot<ShaderSource>,
    font: AssetSlot<FontAtlasData>,
    content: SceneContent,
    info: String,
}

impl Gallery {
    fn new() -> Self {
        Self {
            wall: AssetSlot::new(),
            statue: AssetSlot::new(),
            shader: AssetSlot::new(),
            font: AssetSlot::new(),
            content: SceneContent::new("Gallery"),
            info: String::new(),
        }
    }

    fn missing(&self) -> usize {
        [
            self.wall.is_missing(),
            self.statue.is_missing(),
            self.shader.is_missing(),
            self.font.is_missing(),
        ]
        .into_iter()
        .filter(|m| *m)
        .count()
    }
}

impl Scene for Gallery {
    fn name(&self) -> &str {
        "Gallery"
    }

    fn info(&self) -> &str {
        &self.info
    }

    fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
        queue.add_texture(&self.wall, "brick.png");
        queue.add_geometry(
            &self.statue,
            "bunny.stl",
            GeometryOptions::new().upright().centered().normalized().smooth_normals(),
        );
        queue.add_shader(&self.shader, "lit.wgsl");
        queue.add_font(&self.font, "DejaVuSans.ttf", 24.0);
        Ok(())
    }

    fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
        let missing = self.missing();
        if missing > 0 {
            self.info = format!("{missing} asset(s) replaced by placeholders");
        }

        let assets = ctx.assets();
        let wall = assets.add_texture(self.wall.take_or_placeholder());
        let statue = assets.add_mesh("statue", self.statue.take_or_placeholder());
        let panel = assets.add_mesh("wall", RawGeometry::cube());
        assets.add_shader(self.shader.take_or_placeholder());
        let font = assets.add_font(self.font.take_or_placeholder());

        self.content.spawn_mesh(
            "wall",
            Transform::from_position(Vec3::new(0.0, 1.0, -2.0)).scale(Vec3::new(6.0, 3.0, 0.2)),
            RenderMesh::with_texture(panel, Color::WHITE, wall),
        );
        self.content.spawn_mesh(
            "statue",
            Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
            RenderMesh::new(statue, Color::rgb(0.85, 0.8, 0.7)),
        );
        self.content.spawn_label(Label {
            text: "Gallery".to_string(),
            font: Some(font),
            color: Color::WHITE,
        });
        Ok(())
    }

    fn content(&self) -> Option<&SceneContent> {
        Some(&self.content)
    }

    fn camera(&self) -> Option<Camera> {
        Some(Camera::new().at(Vec3::new(0.0, 1.5, 4.0)).looking_at(Vec3::new(0.0, 0.5, 0.0)))
    }
}

/// Reads a manifest first, then loads what it lists in a second round.
struct Archive {
    manifest: AssetSlot<Vec<u8>>,
    pages: Vec<AssetSlot<ImageData>>,
    content: SceneContent,
}

impl Archive {
    const FALLBACK_PAGES: [&'static str; 3] = ["page1.png", "page2.png", "page3.png"];

    fn new() -> Self {
        Self {
            manifest: AssetSlot::new(),
            pages: Vec::new(),
            content: SceneContent::new("Archive"),
        }
    }

    fn page_names(&self) -> Vec<String> {
        let listed: Vec<String> = self
            .manifest
            .take()
            .map(|bytes| {
                String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if listed.is_empty() {
            Self::FALLBACK_PAGES.iter().map(|s| s.to_string()).collect()
        } else {
            listed
        }
    }
}

impl Scene for Archive {
    fn name(&self) -> &str {
        "Archive"
    }

    fn register_assets(&mut self, queue: &mut AssetLoadQueue) -> anyhow::Result<()> {
        queue.add_raw_data(&self.manifest, "archive.txt");
        Ok(())
    }

    fn assemble(&mut self, ctx: &mut AssemblyContext<'_>) -> anyhow::Result<()> {
        match ctx.phase() {
            Phase::First => {
                for name in self.page_names() {
                    let slot = AssetSlot::new();
                    ctx.deferred().add_texture(&slot, &name);
                    self.pages.push(slot);
                }
            }
            Phase::Second => {
                let page = ctx.assets().add_mesh("page", RawGeometry::cube());
                for (i, slot) in self.pages.iter().enumerate() {
                    let texture = ctx.assets().add_texture(slot.take_or_placeholder());
                    self.content.spawn_mesh(
                        format!("page {i}"),
                        Transform::from_position(Vec3::new(i as f32 * 1.2, 0.0, 0.0))
                            .scale(Vec3::new(1.0, 1.4, 0.05)),
                        RenderMesh::with_texture(page, Color::WHITE, texture),
                    );
                }
            }
        }
        Ok(())
    }

    fn content(&self) -> Option<&SceneContent> {
        Some(&self.content)
    }

    fn background(&self) -> Color {
        Color::rgb(0.15, 0.12, 0.1)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STAGEHAND_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info,wgpu_hal=warn,wgpu_core=warn,naga=warn")),
        )
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            AppConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => AppConfig::new().title("Stagehand demo").initial_scene(1u32),
    };

    let mut registry = SceneRegistry::new();
    registry.register(1u32, "Noise Garden", || Box::new(NoiseGarden::new()))?;
    registry.register(2u32, "Gallery", || Box::new(Gallery::new()))?;
    registry.register(3u32, "Archive", || Box::new(Archive::new()))?;

    let hooks = SwitchHooks::new().on_after_scene_assembly(|scene| {
        if !scene.info().is_empty() {
            tracing::info!("[demo] {}: {}", scene.name(), scene.info());
        }
    });

    run_with_hooks(config, registry, hooks)
}
