//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the handful of matrix constructors the scene
//! graph and camera need. Projection matrices follow the OpenGL clip-space
//! convention (right-handed view space, depth mapped to [-1, 1]).

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// Smallest magnitude a scale component may take
    pub const SCALE_EPSILON: f32 = 0.000_001;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Replace zero scale components with a tiny value so scale matrices stay invertible
    pub fn clamp_scale(scale: Vec3) -> Vec3 {
        scale.map(|s| if s.abs() < constants::SCALE_EPSILON { constants::SCALE_EPSILON } else { s })
    }

    /// Build a rotation from Euler angles in degrees (applied X, then Y, then Z)
    pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
        Quat::from_euler_angles(deg_to_rad(euler.x), deg_to_rad(euler.y), deg_to_rad(euler.z))
    }

    /// Decompose a rotation into Euler angles in degrees
    pub fn quat_to_euler_degrees(rotation: &Quat) -> Vec3 {
        let (x, y, z) = rotation.euler_angles();
        Vec3::new(rad_to_deg(x), rad_to_deg(y), rad_to_deg(z))
    }

    /// Round each component to the nearest integer
    pub fn round_vec3(v: Vec3) -> Vec3 {
        v.map(f32::round)
    }
}

/// Extension trait for Mat4 with the constructors used by transforms and cameras
pub trait Mat4Ext {
    /// Compose translate * rotate * scale
    fn from_trs(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4;

    /// Inverse of [`Mat4Ext::from_trs`] without a general matrix inversion
    fn from_trs_inverse(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4;

    /// OpenGL-style perspective projection (`fov_y` in degrees)
    fn perspective_gl(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// OpenGL-style orthographic projection
    fn orthographic_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Maps clip space [-1, 1] to texture space [0, 1] on all three axes
    fn clip_to_texture_offset() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn from_trs(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
        Mat4::new_translation(position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(scale)
    }

    fn from_trs_inverse(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
        let inv_scale = Vec3::new(1.0 / scale.x, 1.0 / scale.y, 1.0 / scale.z);
        Mat4::new_nonuniform_scaling(&inv_scale)
            * rotation.inverse().to_homogeneous()
            * Mat4::new_translation(&-position)
    }

    fn perspective_gl(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (utils::deg_to_rad(fov_y_degrees) * 0.5).tan();
        let depth = near - far;

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) / depth;
        result[(2, 3)] = 2.0 * far * near / depth;
        result[(3, 2)] = -1.0;
        result
    }

    fn orthographic_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / width;
        result[(1, 1)] = 2.0 / height;
        result[(2, 2)] = -2.0 / depth;
        result[(0, 3)] = -(right + left) / width;
        result[(1, 3)] = -(top + bottom) / height;
        result[(2, 3)] = -(far + near) / depth;
        result
    }

    fn clip_to_texture_offset() -> Mat4 {
        Mat4::new(
            0.5, 0.0, 0.0, 0.5,
            0.0, 0.5, 0.0, 0.5,
            0.0, 0.0, 0.5, 0.5,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trs_inverse_matches_general_inverse() {
        let position = Vec3::new(1.0, -2.0, 3.0);
        let rotation = utils::quat_from_euler_degrees(Vec3::new(30.0, 45.0, 10.0));
        let scale = Vec3::new(2.0, 0.5, 1.5);

        let trs = Mat4::from_trs(&position, &rotation, &scale);
        let inverse = Mat4::from_trs_inverse(&position, &rotation, &scale);

        assert_relative_eq!(trs * inverse, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_clamp_scale_replaces_zero() {
        let scale = utils::clamp_scale(Vec3::new(0.0, 2.0, -1.0));
        assert!(scale.x > 0.0);
        assert_relative_eq!(scale.y, 2.0);
        assert_relative_eq!(scale.z, -1.0);
    }

    #[test]
    fn test_perspective_maps_near_and_far_planes() {
        let proj = Mat4::perspective_gl(90.0, 1.0, 1.0, 10.0);

        let near = proj * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -10.0, 1.0);

        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_maps_box_to_unit_cube() {
        let proj = Mat4::orthographic_gl(-2.0, 2.0, -1.0, 1.0, 0.5, 4.5);
        let corner = proj.transform_point(&Point3::new(2.0, 1.0, -4.5));

        assert_relative_eq!(corner, Point3::new(1.0, 1.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_euler_round_trip() {
        let euler = Vec3::new(10.0, 20.0, 30.0);
        let rotation = utils::quat_from_euler_degrees(euler);
        assert_relative_eq!(utils::quat_to_euler_degrees(&rotation), euler, epsilon = 1e-3);
    }
}
