// Orbit camera looking at the shoal.
//
// Camera model:
//   - A focus point the camera always looks at
//   - Yaw (around +Y) and pitch (elevation) place the eye on a sphere
//   - Distance is the sphere radius, changed with the mouse wheel
//   - A/D and left/right arrows yaw, W/S and up/down arrows pitch
//   - Dragging with the left mouse button orbits freely

use glam::{Mat4, Vec3};
use winit::keyboard::KeyCode;

use super::input::InputState;

pub struct OrbitCamera {
    pub focus: Vec3,

    /// Private: clamped to [min_distance, max_distance] in update().
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Radians around +Y. 0 puts the eye on the +Z side of the focus.
    pub yaw: f32,
    /// Private: clamped short of straight up/down so look_at stays defined.
    pitch: f32,

    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Keyboard orbit speed in radians per second.
    pub orbit_speed: f32,
    /// Radians per pixel of mouse drag.
    pub drag_sensitivity: f32,
    /// Fraction of the current distance per scroll line.
    pub zoom_step: f32,
    /// Slow automatic yaw in radians per second; 0 disables it.
    pub auto_rotate: f32,
}

const PITCH_LIMIT: f32 = 1.5;

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            focus: Vec3::ZERO,
            distance: 28.0,
            min_distance: 2.0,
            max_distance: 120.0,
            yaw: 0.0,
            pitch: 0.35,
            fov: 45.0_f32.to_radians(),
            near: 0.05,
            far: 400.0,
            orbit_speed: 1.2,
            drag_sensitivity: 0.005,
            zoom_step: 0.1,
            auto_rotate: 0.05,
        }
    }

    /// Apply this frame's input. Call once per frame before rendering.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        let mut yaw = self.auto_rotate * dt;
        let mut pitch = 0.0;

        if input.is_key_held(KeyCode::KeyA) || input.is_key_held(KeyCode::ArrowLeft) {
            yaw -= self.orbit_speed * dt;
        }
        if input.is_key_held(KeyCode::KeyD) || input.is_key_held(KeyCode::ArrowRight) {
            yaw += self.orbit_speed * dt;
        }
        if input.is_key_held(KeyCode::KeyW) || input.is_key_held(KeyCode::ArrowUp) {
            pitch += self.orbit_speed * dt;
        }
        if input.is_key_held(KeyCode::KeyS) || input.is_key_held(KeyCode::ArrowDown) {
            pitch -= self.orbit_speed * dt;
        }

        if input.dragging {
            yaw -= input.mouse_delta.0 * self.drag_sensitivity;
            pitch += input.mouse_delta.1 * self.drag_sensitivity;
        }

        self.yaw = (self.yaw + yaw).rem_euclid(std::f32::consts::TAU);
        self.set_pitch(self.pitch + pitch);

        // Scroll up zooms in, proportionally to how far out we are.
        self.set_distance(self.distance * (1.0 - input.scroll_delta * self.zoom_step));
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        self.focus
            + Vec3::new(
                self.yaw.sin() * self.pitch.cos(),
                self.pitch.sin(),
                self.yaw.cos() * self.pitch.cos(),
            ) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.focus, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}
