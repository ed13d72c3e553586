use crate::layout::UniformLayout;
use glam::Vec4;
use okki_common::{BufferHandle, ProgramHandle, VertexArrayHandle};
use okki_render::device::{
    AttributeKind, AttributeLocation, Device, DeviceError, DeviceState, DrawMode, FRAGMENT_ENTRY,
    ProgramSource, RenderState, VERTEX_ENTRY,
};
use okki_render::uniform::{UniformLocation, UniformValue};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

/// Bytes reserved per draw in the frame's uniform buffer. A multiple of the
/// default minimum dynamic-offset alignment.
pub const UNIFORM_SLOT_SIZE: u64 = 1024;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_UNIFORM_SLOTS: u64 = 64;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    kind: AttributeKind,
    vertices: usize,
}

struct GpuProgram {
    source: ProgramSource,
    layout: UniformLayout,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    /// Current uniform values, already laid out for the GPU.
    block: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VertexInput {
    location: u32,
    format: wgpu::VertexFormat,
    stride: u64,
}

/// Everything a pipeline is specialized on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramHandle,
    inputs: Vec<VertexInput>,
    topology: wgpu::PrimitiveTopology,
    cull_back_faces: bool,
    front_face_clockwise: bool,
    wireframe: bool,
    depth_test: bool,
    alpha_blending: bool,
}

/// A draw recorded during the frame and encoded by [`WgpuDevice::present`].
struct QueuedDraw {
    key: PipelineKey,
    /// One entry per pipeline input; `None` reads the zero buffer.
    buffers: Vec<Option<BufferHandle>>,
    count: u32,
    uniform_offset: u32,
    /// Drawn through the loop index buffer for `count`.
    closed: bool,
}

fn vertex_format(kind: AttributeKind) -> wgpu::VertexFormat {
    match kind {
        AttributeKind::Int => wgpu::VertexFormat::Sint32,
        AttributeKind::Float => wgpu::VertexFormat::Float32,
        AttributeKind::Vec2 => wgpu::VertexFormat::Float32x2,
        AttributeKind::Vec3 => wgpu::VertexFormat::Float32x3,
        AttributeKind::Vec4 => wgpu::VertexFormat::Float32x4,
    }
}

/// Indices that walk `count` vertices and return to the first, turning a
/// line strip into a loop.
fn loop_indices(count: u32) -> Vec<u32> {
    (0..count).chain(std::iter::once(0)).collect()
}

fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::LineStrip | DrawMode::LineLoop => wgpu::PrimitiveTopology::LineStrip,
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// [`Device`] implementation on top of wgpu.
///
/// wgpu has no global bind state, so the stateful calls are recorded: each
/// draw snapshots the current program's uniform block and the resolved
/// render state, and [`present`](Self::present) encodes the whole frame
/// into one render pass. Line loops are drawn as indexed line strips that
/// end on their first vertex. Point size and line width have no wgpu
/// equivalent and are ignored; wireframe needs
/// `Features::POLYGON_MODE_LINE` and falls back to filled polygons
/// without it.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    depth_texture: wgpu::TextureView,
    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    zero_buffer: wgpu::Buffer,
    next_handle: u32,
    buffers: BTreeMap<BufferHandle, GpuBuffer>,
    vertex_arrays: BTreeMap<VertexArrayHandle, BTreeMap<AttributeLocation, BufferHandle>>,
    programs: BTreeMap<ProgramHandle, GpuProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    loop_indices: HashMap<u32, wgpu::Buffer>,
    current_program: Option<ProgramHandle>,
    current_vertex_array: Option<VertexArrayHandle>,
    clear_color: Vec4,
    clear_requested: bool,
    state: DeviceState,
    frame: Vec<QueuedDraw>,
    frame_uniforms: Vec<u8>,
}

impl WgpuDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let uniform_capacity = INITIAL_UNIFORM_SLOTS * UNIFORM_SLOT_SIZE;
        let (uniform_buffer, uniform_bind_group) =
            Self::create_uniform_buffer(&device, &uniform_layout, uniform_capacity);

        let zero_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("zero_vertex_buffer"),
            contents: &[0u8; 16],
            usage: wgpu::BufferUsages::VERTEX,
        });

        let depth_texture = Self::create_depth_texture(&device, width, height);

        Self {
            device,
            queue,
            target_format,
            depth_texture,
            uniform_layout,
            pipeline_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            zero_buffer,
            next_handle: 0,
            buffers: BTreeMap::new(),
            vertex_arrays: BTreeMap::new(),
            programs: BTreeMap::new(),
            pipelines: HashMap::new(),
            loop_indices: HashMap::new(),
            current_program: None,
            current_vertex_array: None,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            clear_requested: false,
            state: DeviceState::default(),
            frame: Vec::new(),
            frame_uniforms: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Draws recorded since the last [`present`](Self::present).
    pub fn pending_draws(&self) -> usize {
        self.frame.len()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(&self.device, width, height);
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Encode and submit every draw recorded since the last call, into
    /// `target`. The color and depth attachments are cleared first if
    /// [`Device::clear`] was called.
    pub fn present(&mut self, target: &wgpu::TextureView) {
        let draws = std::mem::take(&mut self.frame);
        let uniforms = std::mem::take(&mut self.frame_uniforms);
        let clear = std::mem::replace(&mut self.clear_requested, false);

        self.ensure_uniform_capacity(uniforms.len() as u64);
        if !uniforms.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &uniforms);
        }

        let (color_load, depth_load) = if clear {
            let c = self.clear_color.as_dvec4();
            (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.x,
                    g: c.y,
                    b: c.z,
                    a: c.w,
                }),
                wgpu::LoadOp::Clear(1.0),
            )
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        let mut encoded = 0usize;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &draws {
                let Some(pipeline) = self.pipelines.get(&draw.key) else {
                    tracing::warn!("pipeline for {} was dropped; draw skipped", draw.key.program);
                    continue;
                };
                let inputs: Option<Vec<&wgpu::Buffer>> = draw
                    .buffers
                    .iter()
                    .map(|slot| match slot {
                        Some(handle) => self.buffers.get(handle).map(|b| &b.buffer),
                        None => Some(&self.zero_buffer),
                    })
                    .collect();
                let Some(inputs) = inputs else {
                    tracing::warn!("vertex buffer deleted before present; draw skipped");
                    continue;
                };

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                for (slot, buffer) in inputs.into_iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                if draw.closed {
                    let Some(indices) = self.loop_indices.get(&draw.count) else {
                        tracing::warn!(
                            "loop indices for {} vertices missing; draw skipped",
                            draw.count
                        );
                        continue;
                    };
                    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..draw.count + 1, 0, 0..1);
                } else {
                    pass.draw(0..draw.count, 0..1);
                }
                encoded += 1;
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!("presented {encoded} of {} draws", draws.len());
    }

    fn ensure_loop_indices(&mut self, count: u32) {
        if self.loop_indices.contains_key(&count) {
            return;
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("loop_index_buffer"),
                contents: bytemuck::cast_slice(&loop_indices(count)),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.loop_indices.insert(count, buffer);
    }

    fn ensure_uniform_capacity(&mut self, needed: u64) {
        if needed <= self.uniform_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        let (buffer, bind_group) =
            Self::create_uniform_buffer(&self.device, &self.uniform_layout, capacity);
        self.uniform_buffer.destroy();
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        self.uniform_capacity = capacity;
        tracing::debug!("grew uniform buffer to {capacity} bytes");
    }

    fn create_uniform_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        size: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SLOT_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    /// Build the pipeline for `key` unless it is cached. Validation errors
    /// (for example a buffer format the shader input cannot read) surface
    /// as link errors.
    fn ensure_pipeline(&mut self, key: &PipelineKey) -> Result<(), DeviceError> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }
        let program = self
            .programs
            .get(&key.program)
            .ok_or_else(|| DeviceError::UnknownHandle(key.program.to_string()))?;

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .inputs
            .iter()
            .map(|input| {
                [wgpu::VertexAttribute {
                    format: input.format,
                    offset: 0,
                    shader_location: input.location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout> = key
            .inputs
            .iter()
            .zip(&attributes)
            .map(|(input, attributes)| wgpu::VertexBufferLayout {
                array_stride: input.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let polygon_mode = if key.wireframe
            && self
                .device
                .features()
                .contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            wgpu::PolygonMode::Line
        } else {
            if key.wireframe {
                tracing::debug!("wireframe unsupported by this device; drawing filled");
            }
            wgpu::PolygonMode::Fill
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.source.label.as_str()),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: Some(if key.alpha_blending {
                            wgpu::BlendState::ALPHA_BLENDING
                        } else {
                            wgpu::BlendState::REPLACE
                        }),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: key.topology,
                    front_face: if key.front_face_clockwise {
                        wgpu::FrontFace::Cw
                    } else {
                        wgpu::FrontFace::Ccw
                    },
                    cull_mode: key.cull_back_faces.then_some(wgpu::Face::Back),
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: key.depth_test,
                    depth_compare: if key.depth_test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Link {
                label: program.source.label.clone(),
                message: error.to_string(),
            });
        }

        tracing::debug!(
            "built pipeline for {} ({:?}, {} inputs)",
            program.source.label,
            key.topology,
            key.inputs.len()
        );
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }
}

impl Device for WgpuDevice {
    fn create_buffer(&mut self, kind: AttributeKind, data: &[f32]) -> BufferHandle {
        let handle = BufferHandle(self.next());
        let label = handle.to_string();
        let buffer = match kind {
            AttributeKind::Int => {
                let ints: Vec<i32> = data.iter().map(|v| *v as i32).collect();
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(label.as_str()),
                        contents: bytemuck::cast_slice(&ints),
                        usage: wgpu::BufferUsages::VERTEX,
                    })
            }
            _ => self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label.as_str()),
                    contents: bytemuck::cast_slice(data),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
        };
        self.buffers.insert(
            handle,
            GpuBuffer {
                buffer,
                kind,
                vertices: data.len() / kind.components(),
            },
        );
        handle
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(gpu) = self.buffers.remove(&buffer) {
            gpu.buffer.destroy();
        }
    }

    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        let handle = VertexArrayHandle(self.next());
        self.vertex_arrays.insert(handle, BTreeMap::new());
        handle
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array);
        if self.current_vertex_array == Some(vertex_array) {
            self.current_vertex_array = None;
        }
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle, DeviceError> {
        source.validate()?;
        let layout = UniformLayout::new(&source.uniforms);
        if u64::from(layout.size()) > UNIFORM_SLOT_SIZE {
            return Err(DeviceError::Link {
                label: source.label.clone(),
                message: format!(
                    "uniform block of {} bytes exceeds {UNIFORM_SLOT_SIZE}",
                    layout.size()
                ),
            });
        }

        let vertex_label = format!("{} vertex", source.label);
        let fragment_label = format!("{} fragment", source.label);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(vertex_label.as_str()),
                source: wgpu::ShaderSource::Wgsl(source.vertex.as_str().into()),
            });
        let fragment = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(fragment_label.as_str()),
                source: wgpu::ShaderSource::Wgsl(source.fragment.as_str().into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Compile {
                label: source.label.clone(),
                message: error.to_string(),
            });
        }

        let handle = ProgramHandle(self.next());
        let block = vec![0u8; layout.size() as usize];
        self.programs.insert(
            handle,
            GpuProgram {
                source: source.clone(),
                layout,
                vertex,
                fragment,
                block,
            },
        );
        tracing::debug!("compiled {handle} ({})", source.label);
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.pipelines.retain(|key, _| key.program != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<AttributeLocation> {
        self.programs
            .get(&program)?
            .source
            .attribute(name)
            .map(|a| a.location)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.source.uniform_location(name)
    }

    fn bind_attribute(
        &mut self,
        vertex_array: VertexArrayHandle,
        location: AttributeLocation,
        buffer: BufferHandle,
    ) -> Result<(), DeviceError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(DeviceError::UnknownHandle(buffer.to_string()));
        }
        self.vertex_arrays
            .get_mut(&vertex_array)
            .ok_or_else(|| DeviceError::UnknownHandle(vertex_array.to_string()))?
            .insert(location, buffer);
        Ok(())
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn enable_depth_test(&mut self) {
        self.state.depth_test = true;
    }

    fn enable_alpha_blending(&mut self) {
        self.state.alpha_blending = true;
    }

    fn clear(&mut self) {
        if !self.frame.is_empty() {
            tracing::debug!("clear drops {} unpresented draws", self.frame.len());
            self.frame.clear();
            self.frame_uniforms.clear();
        }
        self.clear_requested = true;
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError> {
        if !self.programs.contains_key(&program) {
            return Err(DeviceError::UnknownHandle(program.to_string()));
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> Result<(), DeviceError> {
        if !self.vertex_arrays.contains_key(&vertex_array) {
            return Err(DeviceError::UnknownHandle(vertex_array.to_string()));
        }
        self.current_vertex_array = Some(vertex_array);
        Ok(())
    }

    fn upload_uniform(
        &mut self,
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), DeviceError> {
        let program = self.current_program.ok_or(DeviceError::NotBound("program"))?;
        let gpu = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| DeviceError::UnknownHandle(program.to_string()))?;
        gpu.layout.write(&mut gpu.block, location, value)
    }

    fn apply_render_state(&mut self, state: &RenderState) {
        self.state.apply(state);
    }

    fn draw_arrays(&mut self, mode: DrawMode, count: u32) -> Result<(), DeviceError> {
        let program = self.current_program.ok_or(DeviceError::NotBound("program"))?;
        let vertex_array = self
            .current_vertex_array
            .ok_or(DeviceError::NotBound("vertex array"))?;
        let gpu = self
            .programs
            .get(&program)
            .ok_or_else(|| DeviceError::UnknownHandle(program.to_string()))?;
        let bindings = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or_else(|| DeviceError::UnknownHandle(vertex_array.to_string()))?;

        let mut inputs = Vec::with_capacity(gpu.source.attributes.len());
        let mut buffers = Vec::with_capacity(gpu.source.attributes.len());
        for decl in &gpu.source.attributes {
            match bindings.get(&decl.location) {
                Some(handle) => {
                    let buffer = self
                        .buffers
                        .get(handle)
                        .ok_or_else(|| DeviceError::UnknownHandle(handle.to_string()))?;
                    if buffer.vertices < count as usize {
                        return Err(DeviceError::ShortBuffer {
                            buffer: *handle,
                            count,
                            available: buffer.vertices,
                        });
                    }
                    inputs.push(VertexInput {
                        location: decl.location.0,
                        format: vertex_format(buffer.kind),
                        stride: (buffer.kind.components() * 4) as u64,
                    });
                    buffers.push(Some(*handle));
                }
                None => {
                    inputs.push(VertexInput {
                        location: decl.location.0,
                        format: vertex_format(decl.kind),
                        stride: 0,
                    });
                    buffers.push(None);
                }
            }
        }
        if count == 0 {
            tracing::trace!("empty draw with {program} skipped");
            return Ok(());
        }

        let block = gpu.block.clone();
        let key = PipelineKey {
            program,
            inputs,
            topology: topology(mode),
            cull_back_faces: self.state.cull_back_faces,
            front_face_clockwise: self.state.front_face_clockwise,
            wireframe: self.state.wireframe,
            depth_test: self.state.depth_test,
            alpha_blending: self.state.alpha_blending,
        };
        self.ensure_pipeline(&key)?;
        let closed = mode == DrawMode::LineLoop;
        if closed {
            self.ensure_loop_indices(count);
        }

        let offset = self.frame_uniforms.len();
        self.frame_uniforms.extend_from_slice(&block);
        self.frame_uniforms
            .resize(offset + UNIFORM_SLOT_SIZE as usize, 0);
        self.frame.push(QueuedDraw {
            key,
            buffers,
            count,
            uniform_offset: offset as u32,
            closed,
        });
        Ok(())
    }
}
