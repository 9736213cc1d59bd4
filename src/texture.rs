//! Texture data in two stages: decoded pixels and the GPU texture built from them.
//!
//! [`ImageData`] is what a load task produces on the worker thread. It owns
//! plain RGBA8 bytes and never touches wgpu. [`Texture`] is created from it
//! on the main thread during scene assembly.

use std::path::Path;

use crate::error::LoadError;
use crate::gpu::GpuContext;
use crate::loader::Placeholder;

/// Decoded RGBA8 pixels, ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Wrap raw RGBA bytes. `pixels` must hold `width * height * 4` bytes.
    pub fn from_rgba(
        label: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, LoadError> {
        let label = label.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(LoadError::decode(
                label,
                format!("expected {expected} bytes of RGBA, got {}", pixels.len()),
            ));
        }
        Ok(Self {
            label,
            width,
            height,
            pixels,
        })
    }

    /// Decode an image file. The format is picked from the file contents.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
        Self::from_bytes(&bytes, path.display().to_string())
    }

    /// Decode an in-memory image.
    pub fn from_bytes(bytes: &[u8], label: impl Into<String>) -> Result<Self, LoadError> {
        let label = label.into();
        let img = image::load_from_memory(bytes)
            .map_err(|e| LoadError::decode(label.clone(), e))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            label,
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    /// Two-color checkerboard with 1-pixel cells.
    pub fn checker(label: impl Into<String>, size: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                pixels.extend_from_slice(if (x + y) % 2 == 0 { &a } else { &b });
            }
        }
        Self {
            label: label.into(),
            width: size,
            height: size,
            pixels,
        }
    }

    /// Blocky earth-tone noise, generated on the CPU.
    pub fn noise(size: u32, seed: u32) -> Self {
        let colors: &[[u8; 3]] = &[
            [139, 90, 43],
            [128, 128, 128],
            [85, 85, 85],
            [160, 120, 60],
            [100, 70, 40],
            [90, 90, 90],
            [120, 100, 70],
            [70, 60, 50],
        ];

        let mut pixels = vec![0u8; (size * size * 4) as usize];
        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let base = colors[(hash(x, y, seed) % colors.len() as u32) as usize];
                let variation = ((hash(x + 1000, y + 1000, seed) % 30) as i32) - 15;

                for c in 0..3 {
                    pixels[idx + c] = (base[c] as i32 + variation).clamp(0, 255) as u8;
                }
                pixels[idx + 3] = 255;
            }
        }

        Self {
            label: format!("noise-{seed}"),
            width: size,
            height: size,
            pixels,
        }
    }
}

impl Placeholder for ImageData {
    fn placeholder() -> Self {
        Self::checker("missing texture", 8, [255, 0, 255, 255], [0, 0, 0, 255])
    }
}

fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Upload decoded pixels. Main thread only.
    pub fn upload(gpu: &GpuContext, image: &ImageData) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(&image.label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.pixels,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", image.label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width: image.width,
            height: image.height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_png_from_memory() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let data = ImageData::from_bytes(&png, "tiny.png").unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(&data.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = ImageData::from_bytes(b"definitely not an image", "junk").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ImageData::from_file("/no/such/dir/texture.png").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn from_rgba_checks_length() {
        assert!(ImageData::from_rgba("short", 2, 2, vec![0; 15]).is_err());
        assert!(ImageData::from_rgba("ok", 2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn placeholder_is_a_magenta_checker() {
        let data = ImageData::placeholder();
        assert_eq!((data.width, data.height), (8, 8));
        assert_eq!(&data.pixels[..4], &[255, 0, 255, 255]);
        assert_eq!(&data.pixels[4..8], &[0, 0, 0, 255]);
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        assert_eq!(ImageData::noise(4, 1), ImageData::noise(4, 1));
        assert_ne!(ImageData::noise(4, 1).pixels, ImageData::noise(4, 2).pixels);
    }
}
