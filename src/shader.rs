//! WGSL shader sources and their compilation on the main thread.

use std::path::Path;

use crate::error::LoadError;
use crate::gpu::GpuContext;
use crate::loader::Placeholder;

/// Solid magenta, used when a scene's shader failed to load or compile.
const FALLBACK_WGSL: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 1.0);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 1.0, 1.0);
}
"#;

/// WGSL text read by a load task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: String,
    pub source: String,
}

impl ShaderSource {
    pub fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
        }
    }

    /// Read a `.wgsl` file. Empty files and files without an entry point are rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;

        if !["@vertex", "@fragment", "@compute"]
            .iter()
            .any(|stage| source.contains(stage))
        {
            return Err(LoadError::decode(label, "no shader entry point found"));
        }

        Ok(Self { label, source })
    }

    /// Compile on the device. Falls back to the magenta shader if wgpu panics.
    pub fn compile(&self, gpu: &GpuContext) -> wgpu::ShaderModule {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            gpu.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&self.label),
                    source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
                })
        }));

        match result {
            Ok(module) => module,
            Err(_) => {
                tracing::error!("[assets] shader '{}' failed to compile, using fallback", self.label);
                gpu.device
                    .create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some("Fallback Shader"),
                        source: wgpu::ShaderSource::Wgsl(FALLBACK_WGSL.into()),
                    })
            }
        }
    }
}

impl Placeholder for ShaderSource {
    fn placeholder() -> Self {
        Self::new("fallback", FALLBACK_WGSL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_a_wgsl_file() {
        let mut file = tempfile::Builder::new().suffix(".wgsl").tempfile().unwrap();
        file.write_all(b"@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }")
            .unwrap();

        let shader = ShaderSource::from_file(file.path()).unwrap();
        assert!(shader.source.contains("fs_main"));
    }

    #[test]
    fn file_without_entry_point_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"// nothing here").unwrap();

        let err = ShaderSource::from_file(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn fallback_has_both_stages() {
        let fallback = ShaderSource::placeholder();
        assert!(fallback.source.contains("@vertex"));
        assert!(fallback.source.contains("@fragment"));
    }
}
