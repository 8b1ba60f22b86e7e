//! Math utilities and types
//!
//! Provides the fundamental math types for the probe's single uniform upload:
//! a fixed model-view-projection matrix with the clip-space correction Vulkan
//! requires (top-left origin, half-depth range).

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Build a right-handed perspective projection
pub fn perspective(fovy_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_perspective(aspect, fovy_degrees.to_radians(), near, far)
}

/// Build a right-handed view matrix looking from `eye` toward `target`
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
}

/// Clip-space correction for Vulkan
///
/// Flips Y for the top-left framebuffer origin and compresses the GL-style
/// [-1, 1] depth range into Vulkan's [0, 1].
pub fn clip_correction() -> Mat4 {
    Mat4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 0.5, 0.5, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// The fixed transform written into the probe's uniform buffer
///
/// Composition is clip × projection × view × model with a 45 degree vertical
/// field of view, unit aspect, and a camera at (-5, 3, -10) looking at the
/// origin with an inverted up axis.
pub fn probe_transform() -> Mat4 {
    let projection = perspective(45.0, 1.0, 0.1, 100.0);
    let view = look_at(
        Vec3::new(-5.0, 3.0, -10.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
    );
    let model = Mat4::identity();

    clip_correction() * projection * view * model
}
