//! GPU-side model: buffers, textures and the program to draw an [`ImportedModel`].

use std::{mem::size_of_val, ops::Range};

use asset::{ImportedModel, IndexedMesh, TextureData};
use corelib::{Mat4, Vec3, transform::fit_matrix};
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindingResource, Buffer,
    BufferUsages, Device, Extent3d, FilterMode, IndexFormat, Limits, Queue, RenderPass, Sampler,
    SamplerDescriptor, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureViewDescriptor, util::DeviceExt,
};

use crate::program::{
    CameraUniform, GROUP_CAMERA, GROUP_MATERIAL, MaterialUniform, ModelProgram, RenderTargets,
};

struct Geometry {
    positions: Buffer,
    texcoords: Buffer,
    normals: Buffer,
    indices: Buffer,
    index_count: u32,
    groups: Vec<GpuGroup>,
}

struct GpuGroup {
    range: Range<u32>,
    bind_group: BindGroup,
}

/// One drawable model. Must be created, drawn and dropped on the GPU thread.
pub struct RenderableModel {
    program: ModelProgram,
    camera_buf: Buffer,
    camera_bg: BindGroup,
    geometry: Option<Geometry>,
    fit: Mat4,
}

impl RenderableModel {
    pub fn new(device: &Device, queue: &Queue, model: &ImportedModel, targets: RenderTargets) -> Self {
        Self::with_program(device, queue, model, ModelProgram::new(device, targets))
    }

    pub fn with_program(
        device: &Device,
        queue: &Queue,
        model: &ImportedModel,
        program: ModelProgram,
    ) -> Self {
        let camera_init = CameraUniform {
            mvp: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let camera_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera UBO"),
            contents: bytemuck::bytes_of(&camera_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let camera_bg = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &program.camera_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        let geometry = if !model.mesh.is_valid() {
            log::warn!("{} has no triangles; nothing will be drawn", model.name);
            None
        } else if !geometry_fits(&device.limits(), &model.mesh) {
            log::warn!(
                "{} exceeds the device buffer size limit ({} bytes); nothing will be drawn",
                model.name,
                device.limits().max_buffer_size
            );
            None
        } else {
            Some(upload_geometry(device, queue, model, &program))
        };

        let fit = model
            .mesh
            .bounds()
            .map(|(lo, hi)| fit_matrix(Vec3::from(lo), Vec3::from(hi), 1.0))
            .unwrap_or(Mat4::IDENTITY);

        Self {
            program,
            camera_buf,
            camera_bg,
            geometry,
            fit,
        }
    }

    /// `false` when the shader program failed to build; [`Self::draw`] is then a no-op.
    pub fn is_valid(&self) -> bool {
        self.program.is_valid()
    }

    /// Recenter/rescale matrix that fits the mesh bounds into a unit sphere.
    pub fn fit_matrix(&self) -> Mat4 {
        self.fit
    }

    pub fn index_count(&self) -> u32 {
        self.geometry.as_ref().map_or(0, |g| g.index_count)
    }

    /// Record an indexed draw of the whole mesh with `mvp` (column-major).
    pub fn draw(&self, queue: &Queue, pass: &mut RenderPass<'_>, mvp: Mat4) {
        let (Some(pipeline), Some(geo)) = (self.program.pipeline(), self.geometry.as_ref()) else {
            return;
        };

        let cam = CameraUniform {
            mvp: mvp.to_cols_array_2d(),
        };
        queue.write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&cam));

        pass.set_pipeline(pipeline);
        pass.set_bind_group(GROUP_CAMERA, &self.camera_bg, &[]);
        pass.set_vertex_buffer(0, geo.positions.slice(..));
        pass.set_vertex_buffer(1, geo.texcoords.slice(..));
        pass.set_vertex_buffer(2, geo.normals.slice(..));
        pass.set_index_buffer(geo.indices.slice(..), IndexFormat::Uint32);
        for group in &geo.groups {
            pass.set_bind_group(GROUP_MATERIAL, &group.bind_group, &[]);
            pass.draw_indexed(group.range.clone(), 0, 0..1);
        }
    }
}

fn upload_geometry(
    device: &Device,
    queue: &Queue,
    model: &ImportedModel,
    program: &ModelProgram,
) -> Geometry {
    let mesh: &IndexedMesh = &model.mesh;
    let vertex_buf = |label: &str, contents: &[u8]| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: BufferUsages::VERTEX,
        })
    };
    let positions = vertex_buf("Model positions", bytemuck::cast_slice(&mesh.vertices));
    let texcoords = vertex_buf("Model texcoords", bytemuck::cast_slice(&mesh.texcoords));
    let normals = vertex_buf("Model normals", bytemuck::cast_slice(&mesh.normals));
    let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Model IB"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: BufferUsages::INDEX,
    });

    let sampler = device.create_sampler(&SamplerDescriptor {
        label: Some("Base sampler"),
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        ..Default::default()
    });

    let groups = mesh
        .groups
        .iter()
        .zip(&model.group_materials)
        .map(|(group, gm)| {
            let uniform = MaterialUniform::from(&gm.material);
            let material_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material UBO"),
                contents: bytemuck::bytes_of(&uniform),
                usage: BufferUsages::UNIFORM,
            });
            let texture_view = upload_texture(device, queue, &gm.texture);
            let bind_group = material_bind_group(device, program, &material_buf, &texture_view, &sampler);
            GpuGroup {
                range: group.indices.clone(),
                bind_group,
            }
        })
        .collect();

    Geometry {
        positions,
        texcoords,
        normals,
        indices,
        index_count: mesh.indices.len() as u32,
        groups,
    }
}

fn material_bind_group(
    device: &Device,
    program: &ModelProgram,
    material_buf: &Buffer,
    texture_view: &wgpu::TextureView,
    sampler: &Sampler,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("Material BG"),
        layout: &program.material_layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: material_buf.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::TextureView(texture_view),
            },
            BindGroupEntry {
                binding: 2,
                resource: BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Every attribute and index buffer stays within `max_buffer_size`.
fn geometry_fits(limits: &Limits, mesh: &IndexedMesh) -> bool {
    [
        size_of_val(mesh.vertices.as_slice()),
        size_of_val(mesh.texcoords.as_slice()),
        size_of_val(mesh.normals.as_slice()),
        size_of_val(mesh.indices.as_slice()),
    ]
    .into_iter()
    .all(|len| len as u64 <= limits.max_buffer_size)
}

fn texture_fits(limits: &Limits, data: &TextureData) -> bool {
    let max = limits.max_texture_dimension_2d;
    data.is_valid() && data.width <= max && data.height <= max
}

fn upload_texture(device: &Device, queue: &Queue, data: &TextureData) -> wgpu::TextureView {
    let fallback;
    let data = if texture_fits(&device.limits(), data) {
        data
    } else {
        log::warn!(
            "Texture {}x{} cannot be uploaded (max {}), using white",
            data.width,
            data.height,
            device.limits().max_texture_dimension_2d
        );
        fallback = TextureData::white();
        &fallback
    };

    let size = Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("Base texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(data.width * data.bytes_per_pixel()),
            rows_per_image: Some(data.height),
        },
        size,
    );
    texture.create_view(&TextureViewDescriptor::default())
}
