use crate::device::Device;
use crate::error::RenderError;
use crate::geometry::Geometry;
use crate::material::Material;
use crate::resources::Resources;
use okki_common::{GeometryId, MaterialId, VertexArrayHandle};
use okki_scene::Renderable;

/// What to do with a geometry attribute the program has no slot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindPolicy {
    /// Fail unless the attribute is marked optional.
    #[default]
    Strict,
    /// Skip any unmatched attribute with a warning.
    Lenient,
}

fn bind_attributes(
    device: &mut dyn Device,
    geometry: &Geometry,
    material: &Material,
    vertex_array: VertexArrayHandle,
    policy: BindPolicy,
) -> Result<(), RenderError> {
    for (name, attribute) in geometry.attributes() {
        let buffer = attribute.buffer.ok_or_else(|| {
            RenderError::MissingResource(format!("attribute {name:?} is not uploaded"))
        })?;
        match device.attribute_location(material.program(), name) {
            Some(location) => device.bind_attribute(vertex_array, location, buffer)?,
            None if policy == BindPolicy::Lenient => {
                tracing::warn!(
                    "{} has no input {name:?}; attribute skipped",
                    material.label()
                );
            }
            None if attribute.optional => {
                tracing::debug!("{} ignores optional attribute {name:?}", material.label());
            }
            None => {
                return Err(RenderError::ResourceLookup {
                    kind: "attribute",
                    name: name.to_owned(),
                    program: material.label().to_owned(),
                });
            }
        }
    }
    Ok(())
}

/// Binds a geometry to a material's program, producing the renderable
/// capability of a scene node.
pub struct Mesh;

impl Mesh {
    /// Bind with [`BindPolicy::Strict`].
    pub fn new(
        device: &mut dyn Device,
        resources: &Resources,
        geometry: GeometryId,
        material: MaterialId,
    ) -> Result<Renderable, RenderError> {
        Self::with_policy(device, resources, geometry, material, BindPolicy::Strict)
    }

    /// Allocate a vertex array and point every geometry attribute at its
    /// slot in the material's program. The bindings are made once; they stay
    /// valid for as long as the material keeps this program.
    pub fn with_policy(
        device: &mut dyn Device,
        resources: &Resources,
        geometry_id: GeometryId,
        material_id: MaterialId,
        policy: BindPolicy,
    ) -> Result<Renderable, RenderError> {
        let geometry = resources.geometry(geometry_id)?;
        let material = resources.material(material_id)?;
        let program = material.program();

        let vertex_array = device.create_vertex_array();
        let bound = bind_attributes(device, geometry, material, vertex_array, policy);
        if let Err(e) = bound {
            device.delete_vertex_array(vertex_array);
            return Err(e);
        }
        Ok(Renderable {
            geometry: geometry_id,
            material: material_id,
            vertex_array,
            bound_program: program,
            visible: true,
        })
    }

    /// Delete the renderable's vertex array. Geometry and material are
    /// shared and stay registered.
    pub fn release(device: &mut dyn Device, renderable: &Renderable) {
        device.delete_vertex_array(renderable.vertex_array);
    }
}
