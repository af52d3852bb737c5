//! Shader program: bind group layouts + render pipeline for [`crate::model`].
//!
//! Vertex inputs: location 0 `position` (vec3), 1 `texcoord` (vec2), 2 `normal` (vec3),
//! each from its own buffer. Group 0 holds `model_view_projection`; group 1 holds
//! the material uniform, `base_texture` and its sampler.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, ColorTargetState, ColorWrites, DepthBiasState, DepthStencilState, Device,
    FragmentState, PipelineLayoutDescriptor, RenderPipeline, RenderPipelineDescriptor,
    SamplerBindingType, ShaderModuleDescriptor, ShaderSource, ShaderStages, TextureFormat,
    TextureSampleType, TextureViewDimension, VertexBufferLayout, VertexState, VertexStepMode,
};

pub const MODEL_SHADER: &str = include_str!("shaders/model.wgsl");

pub const ATTR_POSITION: u32 = 0;
pub const ATTR_TEXCOORD: u32 = 1;
pub const ATTR_NORMAL: u32 = 2;

pub const GROUP_CAMERA: u32 = 0;
pub const GROUP_MATERIAL: u32 = 1;

const POSITION_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![ATTR_POSITION => Float32x3],
};
const TEXCOORD_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![ATTR_TEXCOORD => Float32x2],
};
const NORMAL_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![ATTR_NORMAL => Float32x3],
};

/// `model_view_projection`, column-major.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub mvp: [[f32; 4]; 4],
}

/// Packed material; see the `Material` struct in the shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub diffuse: [f32; 4],
    pub ambient: [f32; 4],
    pub specular: [f32; 4],
    pub params: [f32; 4],
}

impl From<&asset::Material> for MaterialUniform {
    fn from(m: &asset::Material) -> Self {
        let [dr, dg, db] = m.diffuse;
        let [ar, ag, ab] = m.ambient;
        let [sr, sg, sb] = m.specular;
        Self {
            diffuse: [dr, dg, db, 1.0],
            ambient: [ar, ag, ab, 1.0],
            specular: [sr, sg, sb, m.shininess],
            params: [m.transparency, m.illumination_model as f32, 0.0, 0.0],
        }
    }
}

/// Attachment formats the pipeline renders into.
#[derive(Clone, Copy, Debug)]
pub struct RenderTargets {
    pub color: TextureFormat,
    pub depth: TextureFormat,
}

pub struct ModelProgram {
    pipeline: Option<RenderPipeline>,
    pub camera_layout: BindGroupLayout,
    pub material_layout: BindGroupLayout,
}

impl ModelProgram {
    pub fn new(device: &Device, targets: RenderTargets) -> Self {
        Self::with_source(device, targets, MODEL_SHADER)
    }

    /// Compile `source`. A compile or link failure is logged and leaves the
    /// program invalid instead of failing.
    pub fn with_source(device: &Device, targets: RenderTargets, source: &str) -> Self {
        let camera_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Camera BGL"),
            entries: &[uniform_entry::<CameraUniform>(0, ShaderStages::VERTEX)],
        });
        let material_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                uniform_entry::<MaterialUniform>(0, ShaderStages::FRAGMENT),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = build_pipeline(device, targets, source, &camera_layout, &material_layout);
        let pipeline = match pollster::block_on(device.pop_error_scope()) {
            None => Some(pipeline),
            Some(err) => {
                log::error!("Model shader program failed to build, drawing disabled: {err}");
                None
            }
        };

        Self {
            pipeline,
            camera_layout,
            material_layout,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline(&self) -> Option<&RenderPipeline> {
        self.pipeline.as_ref()
    }
}

fn uniform_entry<T>(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

fn build_pipeline(
    device: &Device,
    targets: RenderTargets,
    source: &str,
    camera_layout: &BindGroupLayout,
    material_layout: &BindGroupLayout,
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("Model WGSL"),
        source: ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Model PipelineLayout"),
        bind_group_layouts: &[camera_layout, material_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Model Pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[POSITION_LAYOUT, TEXCOORD_LAYOUT, NORMAL_LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: targets.color,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        // imported winding is not trusted, draw both sides
        primitive: wgpu::PrimitiveState {
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: targets.depth,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }

    #[test]
    fn material_uniform_packs_shininess_and_opacity() {
        let mut m = asset::Material::named("m");
        m.diffuse = [0.2, 0.4, 0.6];
        m.shininess = 8.0;
        m.transparency = 0.7;
        m.illumination_model = 1;
        let u = MaterialUniform::from(&m);
        assert_eq!(u.diffuse, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!(u.specular[3], 8.0);
        assert_eq!(u.params[0], 0.7);
        assert_eq!(u.params[1], 1.0);
    }
}
