//! The shared asset manager.
//!
//! [`AssetManager`] owns every GPU resource a scene creates during assembly
//! and survives scene switches: [`AssetManager::clear`] drops the scene's
//! resources but keeps core fonts. It holds its [`GpuContext`] through an
//! `Rc`, so it cannot be sent to the loader thread.
//!
//! Without a GPU context the manager runs headless and keeps only the CPU
//! data. Tests and tooling use that mode.

use std::rc::Rc;

use crate::ecs::{FontId, MeshId, ShaderId, TextureId};
use crate::font::{FontAtlas, FontAtlasData};
use crate::geometry::RawGeometry;
use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use crate::shader::ShaderSource;
use crate::texture::{ImageData, Texture};

/// Epoch stamped on core font ids. Never used by scene resources.
const CORE_EPOCH: u32 = u32::MAX;

/// A managed resource: its label, CPU data (headless or when kept), and GPU object.
pub struct Resource<D, G> {
    label: String,
    data: Option<D>,
    gpu: Option<G>,
}

impl<D, G> Resource<D, G> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    pub fn gpu(&self) -> Option<&G> {
        self.gpu.as_ref()
    }
}

pub type TextureAsset = Resource<ImageData, Texture>;
pub type MeshAsset = Resource<RawGeometry, Mesh>;
pub type FontAsset = Resource<FontAtlasData, FontAtlas>;
pub type ShaderAsset = Resource<ShaderSource, wgpu::ShaderModule>;

/// Resource cache shared by all scenes.
pub struct AssetManager {
    gpu: Option<Rc<GpuContext>>,
    epoch: u32,
    textures: Vec<TextureAsset>,
    meshes: Vec<MeshAsset>,
    fonts: Vec<FontAsset>,
    shaders: Vec<ShaderAsset>,
    core_fonts: Vec<FontAsset>,
    uploads: usize,
}

impl AssetManager {
    pub fn new(gpu: Rc<GpuContext>) -> Self {
        Self::with_gpu(Some(gpu))
    }

    /// A manager that never touches the GPU.
    pub fn headless() -> Self {
        Self::with_gpu(None)
    }

    fn with_gpu(gpu: Option<Rc<GpuContext>>) -> Self {
        Self {
            gpu,
            epoch: 0,
            textures: Vec::new(),
            meshes: Vec::new(),
            fonts: Vec::new(),
            shaders: Vec::new(),
            core_fonts: Vec::new(),
            uploads: 0,
        }
    }

    pub fn is_headless(&self) -> bool {
        self.gpu.is_none()
    }

    pub fn gpu(&self) -> Option<&GpuContext> {
        self.gpu.as_deref()
    }

    pub fn add_texture(&mut self, image: ImageData) -> TextureId {
        let index = self.textures.len() as u32;
        let gpu = self.gpu.as_deref().map(|gpu| Texture::upload(gpu, &image));
        let texture = self.resource(image.label.clone(), image, gpu);
        self.textures.push(texture);
        TextureId {
            index,
            epoch: self.epoch,
        }
    }

    pub fn add_mesh(&mut self, label: impl Into<String>, geometry: RawGeometry) -> MeshId {
        let label = label.into();
        let index = self.meshes.len() as u32;
        let gpu = self.gpu.as_deref().map(|gpu| Mesh::upload(gpu, &label, &geometry));
        let mesh = self.resource(label, geometry, gpu);
        self.meshes.push(mesh);
        MeshId {
            index,
            epoch: self.epoch,
        }
    }

    pub fn add_shader(&mut self, source: ShaderSource) -> ShaderId {
        let index = self.shaders.len() as u32;
        let gpu = self.gpu.as_deref().map(|gpu| source.compile(gpu));
        let shader = self.resource(source.label.clone(), source, gpu);
        self.shaders.push(shader);
        ShaderId {
            index,
            epoch: self.epoch,
        }
    }

    /// Scene font. Glyph metrics stay on the CPU side for text layout.
    pub fn add_font(&mut self, atlas: FontAtlasData) -> FontId {
        let index = self.fonts.len() as u32;
        let font = self.font_resource(atlas);
        self.fonts.push(font);
        FontId {
            index,
            epoch: self.epoch,
        }
    }

    /// Font that outlives scene switches.
    pub fn add_core_font(&mut self, atlas: FontAtlasData) -> FontId {
        let index = self.core_fonts.len() as u32;
        let font = self.font_resource(atlas);
        self.core_fonts.push(font);
        FontId {
            index,
            epoch: CORE_EPOCH,
        }
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureAsset> {
        self.current(id.epoch)
            .then(|| self.textures.get(id.index as usize))
            .flatten()
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshAsset> {
        self.current(id.epoch)
            .then(|| self.meshes.get(id.index as usize))
            .flatten()
    }

    pub fn shader(&self, id: ShaderId) -> Option<&ShaderAsset> {
        self.current(id.epoch)
            .then(|| self.shaders.get(id.index as usize))
            .flatten()
    }

    pub fn font(&self, id: FontId) -> Option<&FontAsset> {
        if id.epoch == CORE_EPOCH {
            self.core_fonts.get(id.index as usize)
        } else {
            self.current(id.epoch)
                .then(|| self.fonts.get(id.index as usize))
                .flatten()
        }
    }

    /// Number of scene resources (core fonts excluded).
    pub fn len(&self) -> usize {
        self.textures.len() + self.meshes.len() + self.fonts.len() + self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn core_font_count(&self) -> usize {
        self.core_fonts.len()
    }

    /// Resources created since startup, core fonts included.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Drop every scene resource. Ids issued before the call stop resolving.
    pub fn clear(&mut self) {
        let dropped = self.len();
        self.textures.clear();
        self.meshes.clear();
        self.fonts.clear();
        self.shaders.clear();
        self.epoch = match self.epoch.wrapping_add(1) {
            CORE_EPOCH => 0,
            next => next,
        };
        if dropped > 0 {
            tracing::debug!("[assets] cleared {} scene resource(s)", dropped);
        }
    }

    fn current(&self, epoch: u32) -> bool {
        epoch == self.epoch
    }

    fn font_resource(&mut self, atlas: FontAtlasData) -> FontAsset {
        let gpu = self.gpu.as_deref().map(|gpu| FontAtlas::upload(gpu, &atlas));
        self.uploads += 1;
        Resource {
            label: atlas.label.clone(),
            data: Some(atlas),
            gpu,
        }
    }

    // With a GPU object present, the CPU copy is dropped.
    fn resource<D, G>(&mut self, label: String, data: D, gpu: Option<G>) -> Resource<D, G> {
        self.uploads += 1;
        let data = if gpu.is_some() { None } else { Some(data) };
        Resource { label, data, gpu }
    }
}
