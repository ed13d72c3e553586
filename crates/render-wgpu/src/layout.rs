//! WGSL uniform-buffer layout for a program's declared uniforms.
//!
//! A program's uniforms live in one `var<uniform>` struct whose members
//! appear in declaration order, so a uniform location is also the member
//! index. Offsets follow the WGSL alignment rules for the uniform address
//! space.

use okki_render::device::{DeviceError, UniformDecl};
use okki_render::uniform::{UniformKind, UniformLocation, UniformValue};

/// `(size, alignment)` in bytes of a uniform member.
fn size_align(kind: UniformKind) -> (u32, u32) {
    match kind {
        UniformKind::Int | UniformKind::Bool | UniformKind::Float => (4, 4),
        UniformKind::Vec2 => (8, 8),
        UniformKind::Vec3 => (12, 16),
        UniformKind::Vec4 => (16, 16),
        UniformKind::Mat4 => (64, 16),
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Member {
    offset: u32,
    kind: UniformKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    members: Vec<Member>,
    size: u32,
}

impl UniformLayout {
    pub fn new(uniforms: &[UniformDecl]) -> Self {
        let mut offset = 0;
        let mut struct_align = 16;
        let mut members = Vec::with_capacity(uniforms.len());
        for decl in uniforms {
            let (size, align) = size_align(decl.kind);
            offset = align_to(offset, align);
            members.push(Member {
                offset,
                kind: decl.kind,
            });
            offset += size;
            struct_align = struct_align.max(align);
        }
        Self {
            members,
            size: align_to(offset, struct_align),
        }
    }

    /// Struct size in bytes, rounded up to the struct alignment.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self, location: UniformLocation) -> Option<u32> {
        self.members.get(location.0 as usize).map(|m| m.offset)
    }

    /// Write `value` into its member's bytes within `block`.
    pub fn write(
        &self,
        block: &mut [u8],
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), DeviceError> {
        let member = self
            .members
            .get(location.0 as usize)
            .ok_or_else(|| DeviceError::UnknownHandle(format!("uniform {location:?}")))?;
        if member.kind != value.kind() {
            return Err(DeviceError::UniformType {
                location,
                expected: member.kind,
                found: value.kind(),
            });
        }
        let bytes = encode(value);
        let start = member.offset as usize;
        let end = start + bytes.len();
        let dst = block
            .get_mut(start..end)
            .ok_or_else(|| DeviceError::UnknownHandle(format!("uniform {location:?}")))?;
        dst.copy_from_slice(&bytes);
        Ok(())
    }
}

/// Byte image of a uniform value. Booleans are 32-bit integers on the GPU
/// and matrices are column-major.
pub fn encode(value: &UniformValue) -> Vec<u8> {
    match value {
        UniformValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
        UniformValue::Bool(v) => bytemuck::bytes_of(&i32::from(*v)).to_vec(),
        UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
        UniformValue::Vec2(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
        UniformValue::Vec3(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
        UniformValue::Vec4(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
        UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use okki_render::shaders;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn decls(kinds: &[UniformKind]) -> Vec<UniformDecl> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| UniformDecl {
                name: format!("u{i}"),
                kind: *kind,
            })
            .collect()
    }

    #[test]
    fn basic_program_layout() {
        let layout = UniformLayout::new(&shaders::basic_program("basic").uniforms);
        let offsets: Vec<_> = (0..5)
            .map(|i| layout.offset(UniformLocation(i)).unwrap())
            .collect();
        assert_eq!(offsets, vec![0, 64, 128, 192, 204]);
        assert_eq!(layout.size(), 208);
    }

    #[test]
    fn vec3_alignment_pads_after_scalar() {
        let layout = UniformLayout::new(&decls(&[UniformKind::Float, UniformKind::Vec3]));
        assert_eq!(layout.offset(UniformLocation(1)), Some(16));
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn scalars_pack_tightly() {
        let layout = UniformLayout::new(&decls(&[
            UniformKind::Float,
            UniformKind::Int,
            UniformKind::Vec2,
        ]));
        assert_eq!(layout.offset(UniformLocation(1)), Some(4));
        assert_eq!(layout.offset(UniformLocation(2)), Some(8));
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn empty_layout_has_no_size() {
        assert_eq!(UniformLayout::new(&[]).size(), 0);
    }

    #[test]
    fn write_places_bytes_at_offset() {
        let layout = UniformLayout::new(&decls(&[UniformKind::Bool, UniformKind::Vec3]));
        let mut block = vec![0u8; layout.size() as usize];
        layout
            .write(&mut block, UniformLocation(0), &UniformValue::Bool(true))
            .unwrap();
        layout
            .write(
                &mut block,
                UniformLocation(1),
                &UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
            )
            .unwrap();
        assert_eq!(&block[0..4], &1i32.to_ne_bytes());
        assert_eq!(floats(&block[16..28]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn write_checks_kind() {
        let layout = UniformLayout::new(&decls(&[UniformKind::Mat4]));
        let mut block = vec![0u8; layout.size() as usize];
        let err = layout
            .write(&mut block, UniformLocation(0), &UniformValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, DeviceError::UniformType { .. }));
        assert!(layout
            .write(&mut block, UniformLocation(3), &UniformValue::Float(1.0))
            .is_err());
    }

    #[test]
    fn matrices_are_column_major() {
        let m = Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0));
        let bytes = encode(&UniformValue::Mat4(m));
        assert_eq!(&floats(&bytes)[12..15], &[7.0, 8.0, 9.0]);
    }
}
