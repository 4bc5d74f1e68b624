use glam::{Mat4, Vec4};

use super::{Rect, Transform};

/// Remaps clip-space depth from the OpenGL range [-1, 1] to the [0, 1] range wgpu expects.
/// Applied on the left of a projection matrix.
const GL_TO_DEVICE_DEPTH: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

/// Converts an OpenGL convention projection matrix into the one used by the GPU device
pub fn gpu_projection(projection: Mat4) -> Mat4 {
    GL_TO_DEVICE_DEPTH * projection
}

/// Projection type of a [LightCamera]
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Perspective(PerspectiveProjection),
    Orthographic(OrthographicProjection),
}

/// Used in Projection enum for camera
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveProjection {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
}

/// Used in Projection enum for camera
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicProjection {
    pub area: Rect,
    pub scale: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveProjection {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            aspect_ratio: 1.0,
        }
    }
}

impl Default for OrthographicProjection {
    fn default() -> Self {
        Self {
            area: Rect::new_min_max(-10., -10., 10., 10.),
            scale: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    pub fn perspective() -> Self {
        Self::Perspective(PerspectiveProjection::default())
    }

    pub fn orthographic() -> Self {
        Self::Orthographic(OrthographicProjection::default())
    }

    /// Projection matrix in the OpenGL clip-space convention (depth in [-1, 1])
    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective(p) => {
                Mat4::perspective_rh_gl(p.fov.to_radians(), p.aspect_ratio, p.near, p.far)
            }
            Projection::Orthographic(o) => {
                let center = o.area.center();
                let half = o.area.size() * 0.5 * o.scale;
                Mat4::orthographic_rh_gl(
                    center.x - half.x,
                    center.x + half.x,
                    center.y - half.y,
                    center.y + half.y,
                    o.near,
                    o.far,
                )
            }
        }
    }

    /// Forces a width to height ratio of 1. For orthographic projections the area is squared
    /// around its center using the larger side.
    pub fn make_square(&mut self) {
        match self {
            Projection::Perspective(p) => p.aspect_ratio = 1.0,
            Projection::Orthographic(o) => {
                let center = o.area.center();
                let size = o.area.size();
                let half = size.x.max(size.y) * 0.5;
                o.area = Rect::new_min_max(center.x - half, center.y - half, center.x + half, center.y + half);
            }
        }
    }
}

/// Camera rendering the scene from the point of view of a light.
/// Owned by the scene, the shadow map camera only borrows it for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCamera {
    pub projection: Projection,
    pub transform: Transform,
}

impl LightCamera {
    pub fn new(projection: Projection, transform: Transform) -> Self {
        Self { projection, transform }
    }

    /// OpenGL convention projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// World to camera matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.inverse_matrix()
    }

    /// Device projection * view, the matrix shaders use to go from world to light clip space
    pub fn view_projection_matrix(&self) -> Mat4 {
        gpu_projection(self.projection_matrix()) * self.view_matrix()
    }
}
