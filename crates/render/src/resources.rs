use crate::device::Device;
use crate::error::RenderError;
use crate::geometry::Geometry;
use crate::material::Material;
use okki_common::{GeometryId, MaterialId};
use std::collections::BTreeMap;

/// Registry of uploaded geometries and compiled materials.
///
/// Meshes refer to entries by id, so one geometry or material can back any
/// number of meshes.
#[derive(Debug, Default)]
pub struct Resources {
    geometries: BTreeMap<GeometryId, Geometry>,
    materials: BTreeMap<MaterialId, Material>,
    next_geometry: u32,
    next_material: u32,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the vertex count, upload every attribute and register.
    pub fn add_geometry(
        &mut self,
        device: &mut dyn Device,
        mut geometry: Geometry,
    ) -> Result<GeometryId, RenderError> {
        let count = geometry.count_vertices()?;
        geometry.upload(device);
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        tracing::debug!("registered {id} with {count} vertices");
        self.geometries.insert(id, geometry);
        Ok(id)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        tracing::debug!("registered {id} ({})", material.label());
        self.materials.insert(id, material);
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Result<&Geometry, RenderError> {
        self.geometries
            .get(&id)
            .ok_or_else(|| RenderError::MissingResource(id.to_string()))
    }

    pub fn material(&self, id: MaterialId) -> Result<&Material, RenderError> {
        self.materials
            .get(&id)
            .ok_or_else(|| RenderError::MissingResource(id.to_string()))
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Result<&mut Material, RenderError> {
        self.materials
            .get_mut(&id)
            .ok_or_else(|| RenderError::MissingResource(id.to_string()))
    }

    /// Swap in a new material under an existing id and delete the old
    /// program. Meshes bound against the old program are skipped by the
    /// renderer until rebound.
    pub fn replace_material(
        &mut self,
        device: &mut dyn Device,
        id: MaterialId,
        material: Material,
    ) -> Result<(), RenderError> {
        let slot = self
            .materials
            .get_mut(&id)
            .ok_or_else(|| RenderError::MissingResource(id.to_string()))?;
        let old = std::mem::replace(slot, material);
        tracing::debug!("replaced {id}: {} -> {}", old.program(), slot.program());
        old.release(device);
        Ok(())
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Delete every buffer and program and empty the registry.
    pub fn release(&mut self, device: &mut dyn Device) {
        for (_, mut geometry) in std::mem::take(&mut self.geometries) {
            geometry.release(device);
        }
        for (_, material) in std::mem::take(&mut self.materials) {
            material.release(device);
        }
    }
}
