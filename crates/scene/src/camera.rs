use crate::graph::{SceneError, SceneGraph};
use crate::node::NodeId;
use glam::Mat4;
use okki_common::transform;
use std::f32::consts::FRAC_PI_3;

/// Determinants below this are treated as singular.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Perspective frustum parameters. `fov` is vertical, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective {
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov: FRAC_PI_3,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Camera capability: a fixed projection and a view derived from the
/// camera node's global transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    perspective: Perspective,
    projection: Mat4,
    view: Mat4,
}

impl Camera {
    pub fn new(perspective: Perspective) -> Self {
        let Perspective {
            fov,
            aspect,
            near,
            far,
        } = perspective;
        Self {
            perspective,
            projection: transform::perspective(fov, aspect, near, far),
            view: Mat4::IDENTITY,
        }
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    /// Rebuild the projection for a new viewport aspect ratio. The view is
    /// kept.
    pub fn set_aspect(&mut self, aspect: f32) {
        let p = Perspective {
            aspect,
            ..self.perspective
        };
        self.perspective = p;
        self.projection = transform::perspective(p.fov, p.aspect, p.near, p.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// View matrix as of the last refresh.
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Set `view` to the inverse of `global`. On a singular transform the
    /// previous view is kept and the refresh fails.
    pub(crate) fn refresh(&mut self, global: Mat4) -> Result<(), SceneError> {
        let det = global.determinant();
        if !det.is_finite() || det.abs() < DEGENERATE_EPSILON {
            return Err(SceneError::DegenerateTransform { determinant: det });
        }
        self.view = global.inverse();
        Ok(())
    }
}

impl SceneGraph {
    /// Recompute the view of the camera at `id` from its current global
    /// transform.
    pub fn update_view(&mut self, id: NodeId) -> Result<(), SceneError> {
        let global = self.global_transform(id)?;
        let node = self.get_mut(id)?;
        let camera = node.camera.as_mut().ok_or(SceneError::NotACamera(id))?;
        camera.refresh(global)
    }

    /// Match the projection of the camera at `id` to a `width` x `height`
    /// viewport. Empty viewports are ignored.
    pub fn set_viewport(
        &mut self,
        id: NodeId,
        width: u32,
        height: u32,
    ) -> Result<(), SceneError> {
        let camera = self
            .get_mut(id)?
            .camera
            .as_mut()
            .ok_or(SceneError::NotACamera(id))?;
        if width > 0 && height > 0 {
            camera.set_aspect(width as f32 / height as f32);
            tracing::debug!("camera {id} viewport {width}x{height}");
        }
        Ok(())
    }

    /// The camera capability of `id`.
    pub fn camera(&self, id: NodeId) -> Result<&Camera, SceneError> {
        self.get(id)?
            .camera
            .as_ref()
            .ok_or(SceneError::NotACamera(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use glam::Vec3;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn default_projection_matches_transform_library() {
        let cam = Camera::new(Perspective::default());
        assert_eq!(
            cam.projection(),
            transform::perspective(FRAC_PI_3, 1.0, 0.1, 100.0)
        );
        assert_eq!(cam.view(), Mat4::IDENTITY);
    }

    #[test]
    fn viewport_changes_aspect_and_keeps_view() {
        let mut g = SceneGraph::new();
        let cam = g.insert(Node::camera(Camera::new(Perspective::default())));
        g.translate(cam, 0.0, 0.0, 3.0, true).unwrap();
        g.update_view(cam).unwrap();
        let view = g.camera(cam).unwrap().view();

        g.set_viewport(cam, 1600, 900).unwrap();
        let c = g.camera(cam).unwrap();
        assert!((c.perspective().aspect - 16.0 / 9.0).abs() < EPSILON);
        assert_eq!(
            c.projection(),
            transform::perspective(FRAC_PI_3, 1600.0 / 900.0, 0.1, 100.0)
        );
        assert_eq!(c.view(), view);

        g.set_viewport(cam, 0, 900).unwrap();
        assert!((g.camera(cam).unwrap().perspective().aspect - 16.0 / 9.0).abs() < EPSILON);

        let group = g.insert(Node::group());
        assert!(matches!(
            g.set_viewport(group, 10, 10),
            Err(SceneError::NotACamera(_))
        ));
    }

    #[test]
    fn identity_camera_has_identity_view() {
        let mut g = SceneGraph::new();
        let cam = g.insert(Node::camera(Camera::new(Perspective::default())));
        g.update_view(cam).unwrap();
        assert_eq!(g.camera(cam).unwrap().view(), Mat4::IDENTITY);
    }

    #[test]
    fn view_is_inverse_of_global() {
        let mut g = SceneGraph::new();
        let rig = g.insert(Node::group());
        let cam = g.insert(Node::camera(Camera::new(Perspective::default())));
        g.add(rig, cam).unwrap();
        g.translate(rig, 0.0, 2.0, 5.0, true).unwrap();
        g.y_rotation(cam, 0.3, true).unwrap();

        g.update_view(cam).unwrap();
        let view = g.camera(cam).unwrap().view();
        let global = g.global_transform(cam).unwrap();
        let product = view * global;
        for (a, b) in product
            .to_cols_array()
            .iter()
            .zip(Mat4::IDENTITY.to_cols_array().iter())
        {
            assert!((a - b).abs() < EPSILON, "{product:?}");
        }

        // The camera's own position maps to the view-space origin.
        let origin = view.transform_point3(Vec3::new(0.0, 2.0, 5.0));
        assert!(origin.length() < EPSILON, "{origin:?}");
    }

    #[test]
    fn view_goes_stale_until_refreshed() {
        let mut g = SceneGraph::new();
        let cam = g.insert(Node::camera(Camera::new(Perspective::default())));
        g.update_view(cam).unwrap();
        g.translate(cam, 1.0, 0.0, 0.0, true).unwrap();
        assert_eq!(g.camera(cam).unwrap().view(), Mat4::IDENTITY);

        g.update_view(cam).unwrap();
        let first = g.camera(cam).unwrap().view();
        g.update_view(cam).unwrap();
        assert_eq!(g.camera(cam).unwrap().view(), first);
        assert_eq!(first, transform::translation(-1.0, 0.0, 0.0));
    }

    #[test]
    fn degenerate_scale_fails_and_keeps_old_view() {
        let mut g = SceneGraph::new();
        let cam = g.insert(Node::camera(Camera::new(Perspective::default())));
        g.translate(cam, 0.0, 0.0, 3.0, true).unwrap();
        g.update_view(cam).unwrap();
        let before = g.camera(cam).unwrap().view();

        g.scale(cam, 0.0, None, None, true).unwrap();
        let err = g.update_view(cam).unwrap_err();
        assert!(matches!(err, SceneError::DegenerateTransform { .. }));
        assert_eq!(g.camera(cam).unwrap().view(), before);
    }

    #[test]
    fn update_view_requires_camera() {
        let mut g = SceneGraph::new();
        let plain = g.insert(Node::group());
        assert!(matches!(
            g.update_view(plain),
            Err(SceneError::NotACamera(_))
        ));
    }
}
