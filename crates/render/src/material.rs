//! Materials: a compiled program, its uniform values and the
//! fixed-function settings applied before each draw.
//!
//! Properties are addressed by name. Uniform names are the shader's own
//! (`baseColor`, `useVertexColors`); render settings use snake case
//! (`point_size`, `line_type`, `double_sided`, ...). A material only accepts
//! the settings its kind defines.

use crate::device::{Device, DrawMode, ProgramSource, RenderState};
use crate::error::RenderError;
use crate::shaders;
use crate::uniform::{Uniform, UniformLocation, UniformValue};
use glam::{Mat4, Vec2, Vec3, Vec4};
use okki_common::ProgramHandle;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const MODEL_MATRIX: &str = "modelMatrix";
pub const VIEW_MATRIX: &str = "viewMatrix";
pub const PROJECTION_MATRIX: &str = "projectionMatrix";

/// How a line material joins its vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// One polyline through every vertex.
    Connected,
    /// A polyline closed back to the first vertex.
    Loop,
    /// Independent segments from consecutive vertex pairs.
    Segmented,
}

impl LineType {
    pub fn draw_mode(self) -> DrawMode {
        match self {
            LineType::Connected => DrawMode::LineStrip,
            LineType::Loop => DrawMode::LineLoop,
            LineType::Segmented => DrawMode::Lines,
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineType::Connected => f.write_str("connected"),
            LineType::Loop => f.write_str("loop"),
            LineType::Segmented => f.write_str("segmented"),
        }
    }
}

impl FromStr for LineType {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(LineType::Connected),
            "loop" => Ok(LineType::Loop),
            "segmented" => Ok(LineType::Segmented),
            other => Err(RenderError::InvalidConfiguration(format!(
                "unknown line type {other:?}"
            ))),
        }
    }
}

/// Fixed-function settings. `None` means the material does not have the
/// setting and leaves the device's value alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub draw_mode: DrawMode,
    pub point_size: Option<f32>,
    pub rounded_points: Option<bool>,
    /// When set, decides the draw mode.
    pub line_type: Option<LineType>,
    pub line_width: Option<f32>,
    pub double_sided: Option<bool>,
    pub wireframe: Option<bool>,
    pub inside_out: Option<bool>,
}

impl RenderSettings {
    pub fn new(draw_mode: DrawMode) -> Self {
        Self {
            draw_mode,
            point_size: None,
            rounded_points: None,
            line_type: None,
            line_width: None,
            double_sided: None,
            wireframe: None,
            inside_out: None,
        }
    }

    pub fn points() -> Self {
        Self {
            point_size: Some(4.0),
            rounded_points: Some(true),
            ..Self::new(DrawMode::Points)
        }
    }

    pub fn lines() -> Self {
        Self {
            line_type: Some(LineType::Connected),
            line_width: Some(2.0),
            ..Self::new(DrawMode::LineStrip)
        }
    }

    pub fn surface() -> Self {
        Self {
            double_sided: Some(false),
            wireframe: Some(false),
            line_width: Some(2.0),
            inside_out: Some(false),
            ..Self::new(DrawMode::Triangles)
        }
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.line_type
            .map(LineType::draw_mode)
            .unwrap_or(self.draw_mode)
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            point_size: self.point_size,
            rounded_points: self.rounded_points,
            line_width: self.line_width,
            cull_back_faces: self.double_sided.map(|d| !d),
            wireframe: self.wireframe,
            front_face_clockwise: self.inside_out,
        }
    }
}

/// Value for [`Material::set_property`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Uniform(UniformValue),
    DrawMode(DrawMode),
    LineType(LineType),
}

impl PropertyValue {
    fn describe(&self) -> String {
        match self {
            PropertyValue::Uniform(v) => v.kind().to_string(),
            PropertyValue::DrawMode(_) => "draw mode".to_owned(),
            PropertyValue::LineType(_) => "line type".to_owned(),
        }
    }
}

macro_rules! uniform_property {
    ($($t:ty),*) => {
        $(impl From<$t> for PropertyValue {
            fn from(v: $t) -> Self {
                PropertyValue::Uniform(v.into())
            }
        })*
    };
}

uniform_property!(i32, bool, f32, Vec2, Vec3, Vec4, Mat4, UniformValue);

impl From<DrawMode> for PropertyValue {
    fn from(v: DrawMode) -> Self {
        PropertyValue::DrawMode(v)
    }
}

impl From<LineType> for PropertyValue {
    fn from(v: LineType) -> Self {
        PropertyValue::LineType(v)
    }
}

/// Locations of the three matrices the renderer sets for every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixLocations {
    pub model: UniformLocation,
    pub view: UniformLocation,
    pub projection: UniformLocation,
}

fn locate_matrices(
    device: &dyn Device,
    program: ProgramHandle,
    label: &str,
) -> Result<MatrixLocations, RenderError> {
    let locate = |name: &str| {
        device
            .uniform_location(program, name)
            .ok_or_else(|| RenderError::ResourceLookup {
                kind: "uniform",
                name: name.to_owned(),
                program: label.to_owned(),
            })
    };
    Ok(MatrixLocations {
        model: locate(MODEL_MATRIX)?,
        view: locate(VIEW_MATRIX)?,
        projection: locate(PROJECTION_MATRIX)?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    label: String,
    program: ProgramHandle,
    matrices: MatrixLocations,
    uniforms: BTreeMap<String, Uniform>,
    settings: RenderSettings,
}

impl Material {
    /// Compile `source` and locate the standard matrices.
    ///
    /// On failure nothing is left allocated on the device.
    pub fn new(
        device: &mut dyn Device,
        source: &ProgramSource,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        let program = device.compile_program(source)?;
        let matrices = match locate_matrices(&*device, program, &source.label) {
            Ok(m) => m,
            Err(e) => {
                device.delete_program(program);
                return Err(e);
            }
        };
        tracing::debug!("created material {:?} with {program}", source.label);
        Ok(Self {
            label: source.label.clone(),
            program,
            matrices,
            uniforms: BTreeMap::new(),
            settings,
        })
    }

    fn basic(
        device: &mut dyn Device,
        label: &str,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        let mut material = Self::new(device, &shaders::basic_program(label), settings)?;
        material.add_uniform(device, "baseColor", Vec3::ONE)?;
        material.add_uniform(device, "useVertexColors", false)?;
        Ok(material)
    }

    /// Round or square points, 4 px by default.
    pub fn point(device: &mut dyn Device) -> Result<Self, RenderError> {
        Self::basic(device, "point_basic", RenderSettings::points())
    }

    /// Connected polyline, 2 px wide by default.
    pub fn line(device: &mut dyn Device) -> Result<Self, RenderError> {
        Self::basic(device, "line_basic", RenderSettings::lines())
    }

    /// Single-sided filled triangles by default.
    pub fn surface(device: &mut dyn Device) -> Result<Self, RenderError> {
        Self::basic(device, "surface_basic", RenderSettings::surface())
    }

    /// Register a uniform the program declares, with its initial value.
    pub fn add_uniform(
        &mut self,
        device: &dyn Device,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), RenderError> {
        let location =
            device
                .uniform_location(self.program, name)
                .ok_or_else(|| RenderError::ResourceLookup {
                    kind: "uniform",
                    name: name.to_owned(),
                    program: self.label.clone(),
                })?;
        self.uniforms.insert(
            name.to_owned(),
            Uniform {
                value: value.into(),
                location,
            },
        );
        Ok(())
    }

    /// Set a uniform value or render setting by name.
    ///
    /// Unknown names, settings this material does not have, and values of
    /// the wrong type are rejected without changing anything.
    pub fn set_property(
        &mut self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), RenderError> {
        let value = value.into();

        if let Some(uniform) = self.uniforms.get_mut(name) {
            return match value {
                PropertyValue::Uniform(v) if v.kind() == uniform.value.kind() => {
                    uniform.value = v;
                    Ok(())
                }
                _ => Err(RenderError::InvalidConfiguration(format!(
                    "{} property {name:?} expects {}, got {}",
                    self.label,
                    uniform.value.kind(),
                    value.describe()
                ))),
            };
        }

        let Some(expected) = self.setting_type(name) else {
            return Err(RenderError::InvalidConfiguration(format!(
                "{} has no property {name:?}",
                self.label
            )));
        };
        let s = &mut self.settings;
        match (name, value) {
            ("draw_mode", PropertyValue::DrawMode(mode)) => s.draw_mode = mode,
            ("line_type", PropertyValue::LineType(t)) => s.line_type = Some(t),
            ("point_size", PropertyValue::Uniform(UniformValue::Float(v))) => {
                s.point_size = Some(v)
            }
            ("line_width", PropertyValue::Uniform(UniformValue::Float(v))) => {
                s.line_width = Some(v)
            }
            ("rounded_points", PropertyValue::Uniform(UniformValue::Bool(v))) => {
                s.rounded_points = Some(v)
            }
            ("double_sided", PropertyValue::Uniform(UniformValue::Bool(v))) => {
                s.double_sided = Some(v)
            }
            ("wireframe", PropertyValue::Uniform(UniformValue::Bool(v))) => s.wireframe = Some(v),
            ("inside_out", PropertyValue::Uniform(UniformValue::Bool(v))) => {
                s.inside_out = Some(v)
            }
            _ => {
                return Err(RenderError::InvalidConfiguration(format!(
                    "{} property {name:?} expects {expected}, got {}",
                    self.label,
                    value.describe()
                )));
            }
        }
        Ok(())
    }

    /// Value type of a render setting this material has. The draw mode of a
    /// line material follows its line type and cannot be set directly.
    fn setting_type(&self, name: &str) -> Option<&'static str> {
        let s = &self.settings;
        let (present, ty) = match name {
            "draw_mode" => (s.line_type.is_none(), "draw mode"),
            "line_type" => (s.line_type.is_some(), "line type"),
            "point_size" => (s.point_size.is_some(), "float"),
            "line_width" => (s.line_width.is_some(), "float"),
            "rounded_points" => (s.rounded_points.is_some(), "bool"),
            "double_sided" => (s.double_sided.is_some(), "bool"),
            "wireframe" => (s.wireframe.is_some(), "bool"),
            "inside_out" => (s.inside_out.is_some(), "bool"),
            _ => (false, ""),
        };
        present.then_some(ty)
    }

    /// Apply several properties; stops at the first error.
    pub fn set_properties<'a>(
        &mut self,
        properties: impl IntoIterator<Item = (&'a str, PropertyValue)>,
    ) -> Result<(), RenderError> {
        for (name, value) in properties {
            self.set_property(name, value)?;
        }
        Ok(())
    }

    /// Upload every material uniform to the current program. The standard
    /// matrices are not part of this set.
    pub fn upload_uniforms(&self, device: &mut dyn Device) -> Result<(), RenderError> {
        for uniform in self.uniforms.values() {
            device.upload_uniform(uniform.location, &uniform.value)?;
        }
        Ok(())
    }

    pub fn render_state(&self) -> RenderState {
        self.settings.render_state()
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.settings.draw_mode()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn matrices(&self) -> MatrixLocations {
        self.matrices
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.get(name)
    }

    /// Uniforms ordered by name.
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.uniforms.iter().map(|(n, u)| (n.as_str(), u))
    }

    /// Delete the program.
    pub fn release(self, device: &mut dyn Device) {
        device.delete_program(self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    #[test]
    fn point_defaults() {
        let mut d = RecordingDevice::new();
        let m = Material::point(&mut d).unwrap();
        assert_eq!(m.draw_mode(), DrawMode::Points);
        let state = m.render_state();
        assert_eq!(state.point_size, Some(4.0));
        assert_eq!(state.rounded_points, Some(true));
        assert_eq!(state.cull_back_faces, None);
        assert_eq!(
            m.uniform("baseColor").unwrap().value,
            UniformValue::Vec3(Vec3::ONE)
        );
    }

    #[test]
    fn line_type_selects_draw_mode() {
        let mut d = RecordingDevice::new();
        let mut m = Material::line(&mut d).unwrap();
        assert_eq!(m.draw_mode(), DrawMode::LineStrip);
        m.set_property("line_type", LineType::Segmented).unwrap();
        assert_eq!(m.draw_mode(), DrawMode::Lines);
        assert!(m.set_property("draw_mode", DrawMode::Points).is_err());
    }

    #[test]
    fn surface_settings_map_to_render_state() {
        let mut d = RecordingDevice::new();
        let mut m = Material::surface(&mut d).unwrap();
        assert_eq!(m.render_state().cull_back_faces, Some(true));
        m.set_properties([
            ("double_sided", true.into()),
            ("wireframe", true.into()),
            ("inside_out", true.into()),
        ])
        .unwrap();
        let state = m.render_state();
        assert_eq!(state.cull_back_faces, Some(false));
        assert_eq!(state.wireframe, Some(true));
        assert_eq!(state.front_face_clockwise, Some(true));
        assert_eq!(state.point_size, None);
    }

    #[test]
    fn uniform_property_updates_value() {
        let mut d = RecordingDevice::new();
        let mut m = Material::surface(&mut d).unwrap();
        m.set_property("baseColor", Vec3::new(1.0, 0.0, 0.0)).unwrap();
        m.set_property("useVertexColors", true).unwrap();
        assert_eq!(
            m.uniform("baseColor").unwrap().value,
            UniformValue::Vec3(Vec3::X)
        );
        assert_eq!(
            m.uniform("useVertexColors").unwrap().value,
            UniformValue::Bool(true)
        );
    }

    #[test]
    fn unknown_property_is_rejected() {
        let mut d = RecordingDevice::new();
        let mut m = Material::surface(&mut d).unwrap();
        let before = m.clone();
        let err = m.set_property("shininess", 1.0).unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("no property"), "{err}");
        // A point setting on a surface is just as unknown.
        assert!(m.set_property("point_size", 3.0).is_err());
        assert_eq!(m, before);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut d = RecordingDevice::new();
        let mut m = Material::point(&mut d).unwrap();
        let err = m.set_property("point_size", true).unwrap_err();
        assert!(err.to_string().contains("expects float"), "{err}");
        let err = m.set_property("baseColor", 1.0).unwrap_err();
        assert!(err.to_string().contains("expects vec3"), "{err}");
    }

    #[test]
    fn matrices_are_not_properties() {
        let mut d = RecordingDevice::new();
        let mut m = Material::point(&mut d).unwrap();
        assert!(m.set_property(MODEL_MATRIX, Mat4::IDENTITY).is_err());
        assert_eq!(m.uniforms().count(), 2);
    }

    #[test]
    fn add_uniform_requires_declaration() {
        let mut d = RecordingDevice::new();
        let mut m = Material::point(&mut d).unwrap();
        let err = m.add_uniform(&d, "time", 0.0).unwrap_err();
        assert!(matches!(err, RenderError::ResourceLookup { kind: "uniform", .. }));
    }

    #[test]
    fn upload_sends_material_uniforms_only() {
        let mut d = RecordingDevice::new();
        let m = Material::surface(&mut d).unwrap();
        d.use_program(m.program()).unwrap();
        m.upload_uniforms(&mut d).unwrap();
        let uploads = d
            .commands()
            .iter()
            .filter(|c| matches!(c, crate::headless::Command::UploadUniform { .. }))
            .count();
        assert_eq!(uploads, 2);
    }

    #[test]
    fn program_without_matrices_is_released() {
        let mut d = RecordingDevice::new();
        let mut source = shaders::basic_program("no_matrices");
        source.uniforms.retain(|u| u.name != VIEW_MATRIX);
        let err = Material::new(&mut d, &source, RenderSettings::surface()).unwrap_err();
        assert!(matches!(err, RenderError::ResourceLookup { .. }));
        assert_eq!(d.live_programs(), 0);
    }

    #[test]
    fn line_type_parses() {
        assert_eq!("segmented".parse::<LineType>().unwrap(), LineType::Segmented);
        let closed = "loop".parse::<LineType>().unwrap();
        assert_eq!(closed, LineType::Loop);
        assert_eq!(closed.draw_mode(), DrawMode::LineLoop);
        assert_eq!(closed.to_string(), "loop");
        assert!("dotted".parse::<LineType>().is_err());
    }
}
