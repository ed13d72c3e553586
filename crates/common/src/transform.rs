//! Affine transform library.
//!
//! Every constructor returns a 4x4 homogeneous matrix. Matrices are written
//! here row by row, the way they appear on paper; `glam` stores them by
//! column, so [`from_rows`] does the transpose once.
//!
//! # Example
//!
//! ```
//! use okki_common::transform;
//! use glam::Vec3;
//!
//! let m = transform::translation(1.0, 2.0, 3.0) * transform::uniform_scale(2.0);
//! assert_eq!(m.transform_point3(Vec3::ONE), Vec3::new(3.0, 4.0, 5.0));
//! ```

use glam::{Mat4, Vec3};

/// Errors from transform construction.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Only one of the y/z scale factors was given.
    #[error("scale needs both y and z, or neither (got y={y:?}, z={z:?})")]
    PartialScale { y: Option<f32>, z: Option<f32> },
}

/// Build a matrix from rows in `(row, column)` notation.
pub fn from_rows(rows: [[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(&rows).transpose()
}

pub fn identity() -> Mat4 {
    Mat4::IDENTITY
}

pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    from_rows([
        [1.0, 0.0, 0.0, x],
        [0.0, 1.0, 0.0, y],
        [0.0, 0.0, 1.0, z],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Right-handed rotation about the X axis, `theta` in radians.
pub fn x_rotation(theta: f32) -> Mat4 {
    let (s, c) = theta.sin_cos();
    from_rows([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, c, -s, 0.0],
        [0.0, s, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Right-handed rotation about the Y axis, `theta` in radians.
pub fn y_rotation(theta: f32) -> Mat4 {
    let (s, c) = theta.sin_cos();
    from_rows([
        [c, 0.0, s, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [-s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Right-handed rotation about the Z axis, `theta` in radians.
pub fn z_rotation(theta: f32) -> Mat4 {
    let (s, c) = theta.sin_cos();
    from_rows([
        [c, -s, 0.0, 0.0],
        [s, c, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

pub fn scale(x: f32, y: f32, z: f32) -> Mat4 {
    from_rows([
        [x, 0.0, 0.0, 0.0],
        [0.0, y, 0.0, 0.0],
        [0.0, 0.0, z, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

pub fn uniform_scale(s: f32) -> Mat4 {
    scale(s, s, s)
}

/// Scale from optional parts: `y` and `z` default to `x` only when both
/// are absent. Giving exactly one of them is a usage error.
pub fn scale_parts(x: f32, y: Option<f32>, z: Option<f32>) -> Result<Mat4, TransformError> {
    match (y, z) {
        (None, None) => Ok(uniform_scale(x)),
        (Some(y), Some(z)) => Ok(scale(x, y, z)),
        _ => Err(TransformError::PartialScale { y, z }),
    }
}

/// OpenGL-style perspective projection into the `[-1, 1]` clip cube.
///
/// `fov` is the vertical field of view in radians.
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let d = 1.0 / (fov / 2.0).tan();
    let b = (far + near) / (near - far);
    let c = 2.0 * far * near / (near - far);
    from_rows([
        [d / aspect, 0.0, 0.0, 0.0],
        [0.0, d, 0.0, 0.0],
        [0.0, 0.0, b, c],
        [0.0, 0.0, -1.0, 0.0],
    ])
}

/// Translation column of `m`: elements `(0,3)`, `(1,3)`, `(2,3)`.
pub fn position_of(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// Overwrite only the translation column of `m`, leaving rotation and
/// scale untouched. Assumes an affine matrix.
pub fn set_position_of(m: &mut Mat4, position: Vec3) {
    m.w_axis.x = position.x;
    m.w_axis.y = position.y;
    m.w_axis.z = position.z;
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

    const EPSILON: f32 = 1e-5;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn rows_are_rows() {
        let m = translation(1.0, 2.0, 3.0);
        // (row, column) = (0, 3) lives in the fourth column.
        assert_eq!(m.col(3), Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(m.row(3), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn identity_is_glam_identity() {
        assert_eq!(identity(), Mat4::IDENTITY);
    }

    #[test]
    fn translation_moves_points() {
        let p = translation(1.0, -2.0, 3.0).transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn rotations_are_right_handed() {
        let y_to_z = x_rotation(FRAC_PI_2).transform_vector3(Vec3::Y);
        assert!(approx_eq_vec3(y_to_z, Vec3::Z), "got {y_to_z:?}");

        let z_to_x = y_rotation(FRAC_PI_2).transform_vector3(Vec3::Z);
        assert!(approx_eq_vec3(z_to_x, Vec3::X), "got {z_to_x:?}");

        let x_to_y = z_rotation(FRAC_PI_2).transform_vector3(Vec3::X);
        assert!(approx_eq_vec3(x_to_y, Vec3::Y), "got {x_to_y:?}");
    }

    #[test]
    fn zero_rotation_is_identity() {
        assert_eq!(x_rotation(0.0), Mat4::IDENTITY);
        assert_eq!(y_rotation(0.0), Mat4::IDENTITY);
        assert_eq!(z_rotation(0.0), Mat4::IDENTITY);
    }

    #[test]
    fn scale_defaults_to_uniform() {
        assert_eq!(scale_parts(2.0, None, None).unwrap(), uniform_scale(2.0));
        assert_eq!(
            scale_parts(1.0, Some(2.0), Some(3.0)).unwrap(),
            scale(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn partial_scale_is_rejected() {
        assert_eq!(
            scale_parts(1.0, Some(2.0), None),
            Err(TransformError::PartialScale {
                y: Some(2.0),
                z: None
            })
        );
        assert!(scale_parts(1.0, None, Some(2.0)).is_err());
    }

    #[test]
    fn perspective_layout() {
        let p = perspective(FRAC_PI_3, 2.0, 0.1, 100.0);
        let d = 1.0 / (FRAC_PI_3 / 2.0).tan();
        assert!((p.row(0).x - d / 2.0).abs() < EPSILON);
        assert!((p.row(1).y - d).abs() < EPSILON);
        assert_eq!(p.row(3), Vec4::new(0.0, 0.0, -1.0, 0.0));
        assert!((p.row(2).z - 100.1 / -99.9).abs() < EPSILON);
        assert!((p.row(2).w - 20.0 / -99.9).abs() < EPSILON);
    }

    #[test]
    fn perspective_near_plane_maps_to_minus_one() {
        let p = perspective(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
        let clip = p * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert!((clip.z / clip.w + 1.0).abs() < EPSILON, "z/w = {}", clip.z / clip.w);
    }

    #[test]
    fn perspective_far_plane_maps_to_plus_one() {
        let p = perspective(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
        let clip = p * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((clip.z / clip.w - 1.0).abs() < 1e-4, "z/w = {}", clip.z / clip.w);
    }

    #[test]
    fn set_position_keeps_rotation_and_scale() {
        let mut m = y_rotation(0.7) * uniform_scale(3.0);
        let before = m;
        set_position_of(&mut m, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(position_of(&m), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(m.x_axis, before.x_axis);
        assert_eq!(m.y_axis, before.y_axis);
        assert_eq!(m.z_axis, before.z_axis);
    }
}
