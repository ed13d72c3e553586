//! Vertex data: ordered, named attributes with a shared vertex count.

mod shapes;

pub use shapes::{
    cone, cuboid, cylinder, cylindrical, ellipsoid, parametric, plane, polygon, prism, pyramid,
    rectangle, sphere,
};

use crate::device::{AttributeKind, Device};
use okki_common::BufferHandle;

/// Name of the position attribute every built-in geometry provides.
pub const POSITION: &str = "vertexPosition";
/// Per-vertex color. Optional: programs may ignore it.
pub const COLOR: &str = "vertexColor";
/// Texture coordinates. Optional: programs may ignore it.
pub const UV: &str = "vertexUV";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("geometry has no sized attribute")]
    Unsized,
    #[error("attribute {name:?} has {len} values, not a multiple of {components}")]
    Partial {
        name: String,
        len: usize,
        components: usize,
    },
    #[error("attribute {name:?} has {found} vertices, expected {expected}")]
    Ragged {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("attribute {0:?} already exists")]
    Duplicate(String),
    #[error("invalid resolution: {0}")]
    Resolution(String),
    #[error("{0} vertices exceed a single draw")]
    TooManyVertices(usize),
}

/// One vertex attribute: its type, flat payload and device buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub data: Vec<f32>,
    /// Programs that do not declare this attribute may skip it when binding.
    pub optional: bool,
    pub buffer: Option<BufferHandle>,
}

impl Attribute {
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.kind.components()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    attributes: Vec<(String, Attribute)>,
    vertex_count: Option<usize>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required attribute.
    pub fn add_attribute(
        &mut self,
        name: &str,
        kind: AttributeKind,
        data: Vec<f32>,
    ) -> Result<(), GeometryError> {
        self.push(name, kind, data, false)
    }

    /// Add an attribute that programs without a matching input may skip.
    pub fn add_optional_attribute(
        &mut self,
        name: &str,
        kind: AttributeKind,
        data: Vec<f32>,
    ) -> Result<(), GeometryError> {
        self.push(name, kind, data, true)
    }

    fn push(
        &mut self,
        name: &str,
        kind: AttributeKind,
        data: Vec<f32>,
        optional: bool,
    ) -> Result<(), GeometryError> {
        if self.attribute(name).is_some() {
            return Err(GeometryError::Duplicate(name.to_owned()));
        }
        let components = kind.components();
        if data.len() % components != 0 {
            return Err(GeometryError::Partial {
                name: name.to_owned(),
                len: data.len(),
                components,
            });
        }
        self.attributes.push((
            name.to_owned(),
            Attribute {
                kind,
                data,
                optional,
                buffer: None,
            },
        ));
        self.vertex_count = None;
        Ok(())
    }

    /// Derive the vertex count from the first attribute and check that
    /// every other attribute agrees.
    pub fn count_vertices(&mut self) -> Result<usize, GeometryError> {
        let (_, first) = self.attributes.first().ok_or(GeometryError::Unsized)?;
        let expected = first.vertex_count();
        for (name, attribute) in &self.attributes[1..] {
            let found = attribute.vertex_count();
            if found != expected {
                return Err(GeometryError::Ragged {
                    name: name.clone(),
                    expected,
                    found,
                });
            }
        }
        self.vertex_count = Some(expected);
        Ok(expected)
    }

    /// Vertex count as of the last [`Geometry::count_vertices`].
    pub fn vertex_count(&self) -> Option<usize> {
        self.vertex_count
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn is_uploaded(&self) -> bool {
        !self.attributes.is_empty() && self.attributes.iter().all(|(_, a)| a.buffer.is_some())
    }

    /// Create a device buffer for every attribute that lacks one.
    pub fn upload(&mut self, device: &mut dyn Device) {
        for (name, attribute) in &mut self.attributes {
            if attribute.buffer.is_none() {
                let buffer = device.create_buffer(attribute.kind, &attribute.data);
                tracing::trace!("uploaded {name} into {buffer}");
                attribute.buffer = Some(buffer);
            }
        }
    }

    /// Delete every device buffer.
    pub fn release(&mut self, device: &mut dyn Device) {
        for (_, attribute) in &mut self.attributes {
            if let Some(buffer) = attribute.buffer.take() {
                device.delete_buffer(buffer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    #[test]
    fn empty_geometry_is_unsized() {
        assert_eq!(Geometry::new().count_vertices(), Err(GeometryError::Unsized));
    }

    #[test]
    fn count_comes_from_first_attribute() {
        let mut g = Geometry::new();
        g.add_attribute(POSITION, AttributeKind::Vec3, vec![0.0; 12])
            .unwrap();
        g.add_optional_attribute(UV, AttributeKind::Vec2, vec![0.0; 8])
            .unwrap();
        assert_eq!(g.count_vertices(), Ok(4));
        assert_eq!(g.vertex_count(), Some(4));
    }

    #[test]
    fn ragged_attributes_are_rejected() {
        let mut g = Geometry::new();
        g.add_attribute(POSITION, AttributeKind::Vec3, vec![0.0; 9])
            .unwrap();
        g.add_attribute(COLOR, AttributeKind::Vec3, vec![0.0; 6])
            .unwrap();
        assert_eq!(
            g.count_vertices(),
            Err(GeometryError::Ragged {
                name: COLOR.into(),
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn partial_vertex_is_rejected() {
        let mut g = Geometry::new();
        let err = g
            .add_attribute(POSITION, AttributeKind::Vec3, vec![0.0; 4])
            .unwrap_err();
        assert!(matches!(err, GeometryError::Partial { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut g = Geometry::new();
        g.add_attribute(POSITION, AttributeKind::Vec3, vec![]).unwrap();
        assert_eq!(
            g.add_attribute(POSITION, AttributeKind::Vec3, vec![]),
            Err(GeometryError::Duplicate(POSITION.into()))
        );
    }

    #[test]
    fn adding_attribute_invalidates_count() {
        let mut g = Geometry::new();
        g.add_attribute(POSITION, AttributeKind::Vec3, vec![0.0; 3])
            .unwrap();
        g.count_vertices().unwrap();
        g.add_attribute(COLOR, AttributeKind::Vec3, vec![0.0; 3])
            .unwrap();
        assert_eq!(g.vertex_count(), None);
    }

    #[test]
    fn upload_and_release_buffers() {
        let mut device = RecordingDevice::new();
        let mut g = rectangle(2.0, 1.0);
        g.upload(&mut device);
        assert!(g.is_uploaded());
        assert_eq!(device.live_buffers(), 3);

        g.upload(&mut device);
        assert_eq!(device.live_buffers(), 3);

        g.release(&mut device);
        assert!(!g.is_uploaded());
        assert_eq!(device.live_buffers(), 0);
    }
}
