//! Font atlases: glyphs rasterized with fontdue on the worker, uploaded later.

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::LoadError;
use crate::gpu::GpuContext;
use crate::loader::Placeholder;

/// Where a glyph lives in its atlas and how to place it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphInfo {
    /// UV rectangle (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the glyph's bottom-left corner.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the pen after this glyph.
    pub advance: f32,
}

/// A rasterized glyph before packing.
#[derive(Clone, Debug)]
struct RasterGlyph {
    ch: char,
    width: u32,
    height: u32,
    offset_x: f32,
    offset_y: f32,
    advance: f32,
    coverage: Vec<u8>,
}

/// A single-channel glyph atlas, CPU side.
#[derive(Clone, Debug, PartialEq)]
pub struct FontAtlasData {
    pub label: String,
    pub size: f32,
    pub line_height: f32,
    pub width: u32,
    pub height: u32,
    /// R8 coverage, `width * height` bytes.
    pub pixels: Vec<u8>,
    pub glyphs: HashMap<char, GlyphInfo>,
}

impl FontAtlasData {
    /// Read a TTF/OTF file and rasterize printable ASCII at `size` pixels.
    pub fn from_file(path: impl AsRef<Path>, size: f32) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
        Self::rasterize(&bytes, size, path.display().to_string())
    }

    /// Rasterize printable ASCII from in-memory font data.
    pub fn rasterize(bytes: &[u8], size: f32, label: impl Into<String>) -> Result<Self, LoadError> {
        let label = label.into();
        let font =
            Font::from_bytes(bytes, FontSettings::default()).map_err(|e| LoadError::decode(&label, e))?;

        let glyphs: Vec<RasterGlyph> = (32u8..=126u8)
            .map(|c| {
                let ch = c as char;
                let (metrics, coverage) = font.rasterize(ch, size);
                RasterGlyph {
                    ch,
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                    coverage,
                }
            })
            .collect();

        let line_height = font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2);

        let (width, height, pixels, glyphs) = pack_glyphs(&glyphs);
        Ok(Self {
            label,
            size,
            line_height,
            width,
            height,
            pixels,
            glyphs,
        })
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Width of a string in pixels. Characters without a glyph count as zero.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|c| self.glyphs.get(&c))
            .map(|g| g.advance)
            .sum()
    }
}

impl Placeholder for FontAtlasData {
    /// An atlas without glyphs. Text drawn with it measures zero.
    fn placeholder() -> Self {
        Self {
            label: "missing font".to_string(),
            size: 16.0,
            line_height: 19.2,
            width: 1,
            height: 1,
            pixels: vec![0],
            glyphs: HashMap::new(),
        }
    }
}

/// Row-pack glyphs into the smallest power-of-two atlas of at least 512x512.
fn pack_glyphs(glyphs: &[RasterGlyph]) -> (u32, u32, Vec<u8>, HashMap<char, GlyphInfo>) {
    let padding = 1u32;
    let mut atlas_width = 512u32;
    let mut atlas_height = 512u32;

    // Grow the smaller side until every glyph fits.
    loop {
        let mut x = padding;
        let mut y = padding;
        let mut row_height = 0u32;
        let mut fits = true;

        for g in glyphs {
            if x + g.width + padding > atlas_width {
                x = padding;
                y += row_height + padding;
                row_height = 0;
            }
            if y + g.height + padding > atlas_height {
                fits = false;
                break;
            }
            x += g.width + padding;
            row_height = row_height.max(g.height);
        }

        if fits {
            break;
        }
        if atlas_width <= atlas_height {
            atlas_width *= 2;
        } else {
            atlas_height *= 2;
        }
    }

    let mut pixels = vec![0u8; (atlas_width * atlas_height) as usize];
    let mut infos = HashMap::with_capacity(glyphs.len());

    let mut x = padding;
    let mut y = padding;
    let mut row_height = 0u32;

    for g in glyphs {
        if x + g.width + padding > atlas_width {
            x = padding;
            y += row_height + padding;
            row_height = 0;
        }

        for gy in 0..g.height {
            let src = (gy * g.width) as usize;
            let dst = ((y + gy) * atlas_width + x) as usize;
            let row = &g.coverage[src..src + g.width as usize];
            pixels[dst..dst + g.width as usize].copy_from_slice(row);
        }

        infos.insert(
            g.ch,
            GlyphInfo {
                uv: [
                    x as f32 / atlas_width as f32,
                    y as f32 / atlas_height as f32,
                    g.width as f32 / atlas_width as f32,
                    g.height as f32 / atlas_height as f32,
                ],
                width: g.width,
                height: g.height,
                offset_x: g.offset_x,
                offset_y: g.offset_y,
                advance: g.advance,
            },
        );

        x += g.width + padding;
        row_height = row_height.max(g.height);
    }

    (atlas_width, atlas_height, pixels, infos)
}

/// A glyph atlas on the GPU.
pub struct FontAtlas {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl FontAtlas {
    /// Upload an atlas as an R8 texture. Main thread only.
    pub fn upload(gpu: &GpuContext, data: &FontAtlasData) -> Self {
        let extent = wgpu::Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&data.label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.width),
                rows_per_image: Some(data.height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}
