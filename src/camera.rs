//! Camera, projection and the orbit controls that move them.
//!
//! The [`ViewportRig`] frames a freshly loaded model once (camera on the
//! `(1, 1, 1)` diagonal, looking at the origin) and from then on only reacts to
//! user input through the [`OrbitController`].

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Rad, Vector3, Zero, perspective};

use crate::config::ViewerConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Polar angle margin that keeps the camera off the poles. Large enough that
/// the look-at basis stays well conditioned in `f32`.
const POLAR_EPSILON: f32 = 1e-3;

/// Bounding radius used for framing when the model is a single point.
pub const MIN_FRAMING_RADIUS: f32 = 0.5;

/// Closest zoom, as a fraction of the framing distance.
const MIN_DISTANCE_FRACTION: f32 = 1e-4;

/// A look-at camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(eye: P, target: P) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn distance(&self) -> f32 {
        (self.eye - self.target).magnitude()
    }

    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.eye).normalize()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn view_proj(&self) -> cgmath::Matrix4<f32> {
        self.view_proj.into()
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.eye.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbit/pan/zoom around a target point with optional inertia.
///
/// Input only accumulates deltas; [`OrbitController::update`] applies them once
/// per frame. With a damping factor `d > 0` each frame applies the fraction `d`
/// of what is pending and keeps the rest, so motion eases out.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitController {
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub screen_space_panning: bool,
    /// The camera never gets closer to the target than this.
    pub min_distance: f32,
    theta_delta: f32,
    phi_delta: f32,
    pan_offset: Vector3<f32>,
    scale: f32,
}

impl OrbitController {
    pub fn new(damping_factor: f32, screen_space_panning: bool) -> Self {
        Self {
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            screen_space_panning,
            min_distance: MIN_DISTANCE_FRACTION,
            theta_delta: 0.0,
            phi_delta: 0.0,
            pan_offset: Vector3::zero(),
            scale: 1.0,
        }
    }

    /// Pointer drag by `(dx, dy)` pixels on a viewport `height` pixels tall.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        let height = height.max(1.0);
        self.theta_delta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.phi_delta -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Moves the target so that the model follows the pointer.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &Camera, fovy: Rad<f32>, height: f32) {
        let height = height.max(1.0);
        let target_distance = camera.distance() * (fovy.0 / 2.0).tan();
        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize();
        let up = if self.screen_space_panning {
            right.cross(forward).normalize()
        } else {
            camera.up.cross(right).normalize()
        };
        let left = -right * (2.0 * dx * target_distance / height) * self.pan_speed;
        let upward = up * (2.0 * dy * target_distance / height) * self.pan_speed;
        if left.x.is_finite() && upward.x.is_finite() {
            self.pan_offset += left + upward;
        }
    }

    /// Positive `steps` move closer, negative move away.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= 0.95f32.powf(self.zoom_speed * steps);
    }

    pub fn is_idle(&self) -> bool {
        self.theta_delta.abs() < f32::EPSILON
            && self.phi_delta.abs() < f32::EPSILON
            && self.pan_offset.magnitude2() < f32::EPSILON * f32::EPSILON
            && (self.scale - 1.0).abs() < f32::EPSILON
    }

    /// Drops all pending motion.
    pub fn reset(&mut self) {
        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.pan_offset = Vector3::zero();
        self.scale = 1.0;
    }

    /// Applies pending motion to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if self.is_idle() {
            return false;
        }
        let floor = self.min_distance.max(f32::EPSILON);
        let mut offset = camera.eye - camera.target;
        if offset.magnitude2() <= f32::EPSILON * f32::EPSILON {
            // eye on the target: back off along the framing diagonal
            offset = Vector3::new(1.0f32, 1.0, 1.0).normalize() * floor;
        }
        let radius = offset.magnitude();
        let step = if self.damping_factor > 0.0 {
            self.damping_factor
        } else {
            1.0
        };

        let theta = offset.x.atan2(offset.z) + self.theta_delta * step;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + self.phi_delta * step)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).max(floor);

        let before = camera.eye;
        camera.target += self.pan_offset * step;
        camera.eye = camera.target
            + Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );

        if self.damping_factor > 0.0 {
            let keep = 1.0 - self.damping_factor;
            self.theta_delta *= keep;
            self.phi_delta *= keep;
            self.pan_offset *= keep;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.eye - before).magnitude2() > f32::EPSILON * f32::EPSILON
    }
}

/// Camera, projection and controls of one viewer.
#[derive(Clone, Debug)]
pub struct ViewportRig {
    pub camera: Camera,
    pub projection: Projection,
    pub controller: OrbitController,
    framing_distance: f32,
    viewport_height: f32,
    released: bool,
}

impl ViewportRig {
    /// Camera at `(0, 0, 10)` looking at the origin until the first model is framed.
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            camera: Camera::new((0.0, 0.0, 10.0), (0.0, 0.0, 0.0)),
            projection: Projection::new(
                config.width,
                config.height,
                cgmath::Deg(config.field_of_view_deg),
                config.znear,
                config.zfar,
            ),
            controller: OrbitController::new(config.damping_factor, config.screen_space_panning),
            framing_distance: config.framing_distance,
            viewport_height: config.height as f32,
            released: false,
        }
    }

    /// Places the camera so a model of displayed bounding radius `radius`
    /// centred on the origin is fully in view.
    pub fn frame(&mut self, radius: f32) {
        let radius = if radius > 0.0 { radius } else { MIN_FRAMING_RADIUS };
        let direction = Vector3::new(1.0f32, 1.0, 1.0).normalize();
        self.camera.target = Point3::origin();
        let distance = self.framing_distance * radius;
        self.camera.eye = Point3::from_vec(direction * distance);
        self.controller.min_distance = distance * MIN_DISTANCE_FRACTION;
        self.controller.reset();
        log::debug!(
            "camera framed at {:?} for radius {}",
            self.camera.eye,
            radius
        );
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        if !self.released {
            self.controller.rotate(dx, dy, self.viewport_height);
        }
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.released {
            self.controller.pan(
                dx,
                dy,
                &self.camera,
                self.projection.fovy,
                self.viewport_height,
            );
        }
    }

    pub fn zoom(&mut self, steps: f32) {
        if !self.released {
            self.controller.zoom(steps);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.projection.resize(width, height);
            self.viewport_height = height as f32;
        }
    }

    /// Advances damping/inertia by one frame.
    pub fn update(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.controller.update(&mut self.camera)
    }

    pub fn uniform(&self) -> CameraUniform {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&self.camera, &self.projection);
        uniform
    }

    /// Detaches the controls; input and updates are ignored afterwards.
    pub fn release(&mut self) {
        self.controller.reset();
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}
