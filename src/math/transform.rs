use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Places the transform at `eye`, rotated so its forward axis (-Z) points at `target`
    pub fn looking_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();

        Self {
            scale: Vec3::ONE,
            rotation,
            translation: eye,
        }
    }

    /// Local to world matrix
    pub fn as_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// World to local matrix, the view matrix when the transform belongs to a camera
    pub fn inverse_matrix(&self) -> Mat4 {
        self.as_matrix().inverse()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_at_points_forward_axis_at_target() {
        let transform = Transform::looking_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Z);
        let forward = transform.rotation * Vec3::NEG_Z;

        assert!(forward.abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert_eq!(transform.translation, Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn inverse_matrix_matches_look_at() {
        let eye = Vec3::new(3.0, 4.0, 5.0);
        let transform = Transform::looking_at(eye, Vec3::ZERO, Vec3::Y);
        let expected = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);

        assert!(transform.inverse_matrix().abs_diff_eq(expected, 1e-4));
    }
}
