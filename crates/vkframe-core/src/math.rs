//! Math utilities and helpers.

use glam::Mat4;

use crate::constants::FRAMES_IN_FLIGHT;

/// Frame slot used by the `frame_number`-th submitted frame.
#[inline]
pub const fn slot_for_frame(frame_number: u64) -> usize {
    (frame_number % FRAMES_IN_FLIGHT as u64) as usize
}

/// Orthographic projection that keeps the unit square undistorted for a
/// `width` x `height` target.
///
/// The shorter axis spans `[-1, 1]`; the longer axis is widened to match the
/// aspect ratio. Y is flipped so that +Y points up on screen in Vulkan clip
/// space.
pub fn aspect_projection(width: u32, height: u32) -> Mat4 {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    let aspect = width / height;

    let (half_w, half_h) = if aspect >= 1.0 {
        (aspect, 1.0)
    } else {
        (1.0, 1.0 / aspect)
    };

    Mat4::orthographic_rh(-half_w, half_w, half_h, -half_h, -1.0, 1.0)
}
