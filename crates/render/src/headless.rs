use crate::device::{
    AttributeKind, AttributeLocation, Device, DeviceError, DeviceState, DrawMode, ProgramSource,
    RenderState,
};
use crate::uniform::{UniformLocation, UniformValue};
use glam::Vec4;
use okki_common::{BufferHandle, ProgramHandle, VertexArrayHandle};
use std::collections::BTreeMap;

/// One call made against a [`RecordingDevice`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetClearColor(Vec4),
    EnableDepthTest,
    EnableAlphaBlending,
    Clear,
    UseProgram(ProgramHandle),
    BindVertexArray(VertexArrayHandle),
    UploadUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    ApplyRenderState(RenderState),
    /// Index into [`RecordingDevice::draws`].
    Draw(usize),
}

/// Everything a draw call saw when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub vertex_array: VertexArrayHandle,
    pub mode: DrawMode,
    pub count: u32,
    /// Uniform values of the program at draw time, by name.
    pub uniforms: BTreeMap<String, UniformValue>,
    /// Attribute slots bound in the vertex array.
    pub attributes: BTreeMap<AttributeLocation, BufferHandle>,
    pub state: DeviceState,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

#[derive(Debug, Clone)]
struct ProgramRecord {
    source: ProgramSource,
    values: BTreeMap<UniformLocation, UniformValue>,
}

/// Headless device that validates calls and records them.
///
/// Handles come from one counter and are never reused, so a handle from a
/// deleted resource is always reported as unknown.
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    next_handle: u32,
    buffers: BTreeMap<BufferHandle, (AttributeKind, usize)>,
    vertex_arrays: BTreeMap<VertexArrayHandle, BTreeMap<AttributeLocation, BufferHandle>>,
    programs: BTreeMap<ProgramHandle, ProgramRecord>,
    current_program: Option<ProgramHandle>,
    current_vertex_array: Option<VertexArrayHandle>,
    clear_color: Vec4,
    state: DeviceState,
    commands: Vec<Command>,
    draws: Vec<DrawCall>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Forget recorded commands and draws. Device state and resources stay.
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Vertex count a buffer holds.
    pub fn buffer_len(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers
            .get(&buffer)
            .map(|(kind, len)| len / kind.components())
    }

    pub fn bindings(
        &self,
        vertex_array: VertexArrayHandle,
    ) -> Option<&BTreeMap<AttributeLocation, BufferHandle>> {
        self.vertex_arrays.get(&vertex_array)
    }
}

impl Device for RecordingDevice {
    fn create_buffer(&mut self, kind: AttributeKind, data: &[f32]) -> BufferHandle {
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle, (kind, data.len()));
        handle
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
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
        let handle = ProgramHandle(self.next());
        self.programs.insert(
            handle,
            ProgramRecord {
                source: source.clone(),
                values: BTreeMap::new(),
            },
        );
        tracing::debug!("compiled {handle} ({})", source.label);
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
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
        self.commands.push(Command::SetClearColor(color));
    }

    fn enable_depth_test(&mut self) {
        self.state.depth_test = true;
        self.commands.push(Command::EnableDepthTest);
    }

    fn enable_alpha_blending(&mut self) {
        self.state.alpha_blending = true;
        self.commands.push(Command::EnableAlphaBlending);
    }

    fn clear(&mut self) {
        self.commands.push(Command::Clear);
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError> {
        if !self.programs.contains_key(&program) {
            return Err(DeviceError::UnknownHandle(program.to_string()));
        }
        self.current_program = Some(program);
        self.commands.push(Command::UseProgram(program));
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> Result<(), DeviceError> {
        if !self.vertex_arrays.contains_key(&vertex_array) {
            return Err(DeviceError::UnknownHandle(vertex_array.to_string()));
        }
        self.current_vertex_array = Some(vertex_array);
        self.commands.push(Command::BindVertexArray(vertex_array));
        Ok(())
    }

    fn upload_uniform(
        &mut self,
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), DeviceError> {
        let program = self.current_program.ok_or(DeviceError::NotBound("program"))?;
        let record = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| DeviceError::UnknownHandle(program.to_string()))?;
        let decl = record
            .source
            .uniforms
            .get(location.0 as usize)
            .ok_or_else(|| DeviceError::UnknownHandle(format!("uniform {location:?}")))?;
        if decl.kind != value.kind() {
            return Err(DeviceError::UniformType {
                location,
                expected: decl.kind,
                found: value.kind(),
            });
        }
        record.values.insert(location, *value);
        self.commands.push(Command::UploadUniform {
            location,
            value: *value,
        });
        Ok(())
    }

    fn apply_render_state(&mut self, state: &RenderState) {
        self.state.apply(state);
        self.commands.push(Command::ApplyRenderState(*state));
    }

    fn draw_arrays(&mut self, mode: DrawMode, count: u32) -> Result<(), DeviceError> {
        let program = self.current_program.ok_or(DeviceError::NotBound("program"))?;
        let vertex_array = self
            .current_vertex_array
            .ok_or(DeviceError::NotBound("vertex array"))?;
        let record = self
            .programs
            .get(&program)
            .ok_or_else(|| DeviceError::UnknownHandle(program.to_string()))?;
        let uniforms = record
            .values
            .iter()
            .filter_map(|(location, value)| {
                record
                    .source
                    .uniforms
                    .get(location.0 as usize)
                    .map(|decl| (decl.name.clone(), *value))
            })
            .collect();
        let attributes = self
            .vertex_arrays
            .get(&vertex_array)
            .cloned()
            .unwrap_or_default();
        for buffer in attributes.values() {
            let available = self.buffer_len(*buffer).unwrap_or(0);
            if available < count as usize {
                return Err(DeviceError::ShortBuffer {
                    buffer: *buffer,
                    count,
                    available,
                });
            }
        }

        tracing::trace!("draw {mode:?} x{count} with {program} / {vertex_array}");
        self.draws.push(DrawCall {
            program,
            vertex_array,
            mode,
            count,
            uniforms,
            attributes,
            state: self.state,
        });
        self.commands.push(Command::Draw(self.draws.len() - 1));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AttributeDecl, UniformDecl};
    use crate::uniform::UniformKind;

    fn program(device: &mut RecordingDevice) -> ProgramHandle {
        device
            .compile_program(&ProgramSource {
                label: "flat".into(),
                vertex: "fn vs_main(vertexPosition) { gain }".into(),
                fragment: "fn fs_main() {}".into(),
                attributes: vec![AttributeDecl {
                    name: "vertexPosition".into(),
                    location: AttributeLocation(0),
                    kind: AttributeKind::Vec3,
                }],
                uniforms: vec![UniformDecl {
                    name: "gain".into(),
                    kind: UniformKind::Float,
                }],
            })
            .unwrap()
    }

    #[test]
    fn handles_are_never_reused() {
        let mut d = RecordingDevice::new();
        let a = d.create_buffer(AttributeKind::Float, &[1.0]);
        d.delete_buffer(a);
        let b = d.create_buffer(AttributeKind::Float, &[1.0]);
        assert_ne!(a, b);
        assert_eq!(d.live_buffers(), 1);
    }

    #[test]
    fn draw_requires_program_and_vertex_array() {
        let mut d = RecordingDevice::new();
        assert_eq!(
            d.draw_arrays(DrawMode::Triangles, 3),
            Err(DeviceError::NotBound("program"))
        );
        let p = program(&mut d);
        d.use_program(p).unwrap();
        assert_eq!(
            d.draw_arrays(DrawMode::Triangles, 3),
            Err(DeviceError::NotBound("vertex array"))
        );
    }

    #[test]
    fn uniforms_persist_per_program() {
        let mut d = RecordingDevice::new();
        let p = program(&mut d);
        let vao = d.create_vertex_array();
        d.use_program(p).unwrap();
        d.bind_vertex_array(vao).unwrap();
        let gain = d.uniform_location(p, "gain").unwrap();
        d.upload_uniform(gain, &UniformValue::Float(0.5)).unwrap();
        d.draw_arrays(DrawMode::Points, 1).unwrap();
        d.draw_arrays(DrawMode::Points, 1).unwrap();

        assert_eq!(d.draws().len(), 2);
        assert_eq!(d.draws()[1].uniform("gain"), Some(UniformValue::Float(0.5)));
    }

    #[test]
    fn uniform_type_is_checked() {
        let mut d = RecordingDevice::new();
        let p = program(&mut d);
        d.use_program(p).unwrap();
        let err = d
            .upload_uniform(UniformLocation(0), &UniformValue::Int(1))
            .unwrap_err();
        assert!(matches!(err, DeviceError::UniformType { .. }));
    }

    #[test]
    fn bind_attribute_checks_handles() {
        let mut d = RecordingDevice::new();
        let vao = d.create_vertex_array();
        let err = d
            .bind_attribute(vao, AttributeLocation(0), BufferHandle(99))
            .unwrap_err();
        assert_eq!(err, DeviceError::UnknownHandle("buffer#99".into()));

        let buf = d.create_buffer(AttributeKind::Vec3, &[0.0; 9]);
        d.bind_attribute(vao, AttributeLocation(0), buf).unwrap();
        assert_eq!(d.bindings(vao).unwrap()[&AttributeLocation(0)], buf);
        assert_eq!(d.buffer_len(buf), Some(3));
    }

    #[test]
    fn draw_past_buffer_end_is_rejected() {
        let mut d = RecordingDevice::new();
        let p = program(&mut d);
        let vao = d.create_vertex_array();
        let buf = d.create_buffer(AttributeKind::Vec3, &[0.0; 9]);
        d.bind_attribute(vao, AttributeLocation(0), buf).unwrap();
        d.use_program(p).unwrap();
        d.bind_vertex_array(vao).unwrap();

        d.draw_arrays(DrawMode::Triangles, 3).unwrap();
        assert_eq!(
            d.draw_arrays(DrawMode::Triangles, 6),
            Err(DeviceError::ShortBuffer {
                buffer: buf,
                count: 6,
                available: 3,
            })
        );
        assert_eq!(d.draws().len(), 1);
    }

    #[test]
    fn compile_rejects_invalid_source() {
        let mut d = RecordingDevice::new();
        let err = d
            .compile_program(&ProgramSource {
                label: "broken".into(),
                vertex: String::new(),
                fragment: "fn fs_main() {}".into(),
                attributes: vec![],
                uniforms: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, DeviceError::Compile { .. }));
        assert_eq!(d.live_programs(), 0);
    }
}
