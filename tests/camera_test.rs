use cgmath::{InnerSpace, Point3};
use flow_viewer::{
    camera::{Camera, OrbitController, ViewportRig},
    config::ViewerConfig,
};

use crate::common::test_utils::approx_eq;

mod common;

fn framed_rig(radius: f32) -> ViewportRig {
    let mut rig = ViewportRig::new(&ViewerConfig::default());
    rig.frame(radius);
    rig
}

#[test]
fn starts_on_the_z_axis() {
    let rig = ViewportRig::new(&ViewerConfig::default());

    assert_eq!(rig.camera.eye, Point3::new(0.0, 0.0, 10.0));
    assert_eq!(rig.camera.target, Point3::new(0.0, 0.0, 0.0));
}

#[test]
fn framing_puts_the_camera_on_the_diagonal() {
    let rig = framed_rig(3.0);
    let eye = rig.camera.eye;

    assert!(approx_eq(eye.x, 6.0));
    assert!(approx_eq(eye.y, 6.0));
    assert!(approx_eq(eye.z, 6.0));
}

#[test]
fn zero_radius_is_still_framed() {
    let rig = framed_rig(0.0);

    assert!(rig.camera.distance() > 0.0);
    assert!(rig.camera.eye.x.is_finite());
}

#[test]
fn orbiting_keeps_the_distance() {
    let mut rig = framed_rig(2.0);
    let distance = rig.camera.distance();
    let eye = rig.camera.eye;

    rig.orbit(80.0, 0.0);
    for _ in 0..200 {
        rig.update();
    }

    assert_ne!(rig.camera.eye, eye);
    assert!(approx_eq(rig.camera.distance(), distance));
    assert_eq!(rig.camera.target, Point3::new(0.0, 0.0, 0.0));
}

#[test]
fn damping_spreads_motion_over_frames() {
    let mut rig = framed_rig(2.0);
    rig.orbit(100.0, 0.0);

    let mut moving_frames = 0;
    for _ in 0..20 {
        if rig.update() {
            moving_frames += 1;
        }
    }

    assert_eq!(moving_frames, 20);
    assert!(!rig.controller.is_idle());
}

#[test]
fn without_damping_motion_is_applied_at_once() {
    let config = ViewerConfig {
        damping_factor: 0.0,
        ..Default::default()
    };
    let mut rig = ViewportRig::new(&config);
    rig.frame(2.0);
    rig.orbit(100.0, 0.0);

    assert!(rig.update());
    assert!(rig.controller.is_idle());
    assert!(!rig.update());
}

#[test]
fn polar_angle_never_reaches_the_pole() {
    let mut rig = framed_rig(2.0);

    // dragging down a long way tips the camera over the model
    rig.orbit(0.0, 10_000.0);
    for _ in 0..200 {
        rig.update();
    }

    let offset = rig.camera.eye - rig.camera.target;
    let horizontal = (offset.x * offset.x + offset.z * offset.z).sqrt();
    assert!(offset.y > 0.0);
    assert!(horizontal > 1e-4 * offset.magnitude());
    assert!(rig.camera.calc_matrix().x.x.is_finite());
}

#[test]
fn zooming_in_moves_closer() {
    let mut rig = framed_rig(2.0);
    let distance = rig.camera.distance();

    rig.zoom(3.0);
    rig.update();
    let closer = rig.camera.distance();
    rig.zoom(-6.0);
    rig.update();

    assert!(closer < distance);
    assert!(rig.camera.distance() > distance);
}

#[test]
fn panning_moves_target_and_eye_together() {
    let mut rig = framed_rig(2.0);
    let offset = rig.camera.eye - rig.camera.target;

    rig.pan(50.0, 20.0);
    for _ in 0..200 {
        rig.update();
    }

    assert_ne!(rig.camera.target, Point3::new(0.0, 0.0, 0.0));
    let moved = rig.camera.eye - rig.camera.target;
    assert!(approx_eq(moved.magnitude(), offset.magnitude()));
}

#[test]
fn released_rig_ignores_input() {
    let mut rig = framed_rig(2.0);
    let eye = rig.camera.eye;
    rig.release();

    rig.orbit(100.0, 100.0);
    rig.zoom(5.0);
    rig.pan(5.0, 5.0);

    assert!(!rig.update());
    assert_eq!(rig.camera.eye, eye);
    assert!(rig.is_released());
}

#[test]
fn controller_reset_drops_pending_motion() {
    let mut controller = OrbitController::new(0.05, true);
    let mut camera = Camera::new((0.0, 0.0, 10.0), (0.0, 0.0, 0.0));
    controller.rotate(30.0, 30.0, 600.0);
    controller.zoom(2.0);
    controller.reset();

    assert!(controller.is_idle());
    assert!(!controller.update(&mut camera));
    assert_eq!(camera.eye, Point3::new(0.0, 0.0, 10.0));
}

#[test]
fn view_projection_puts_the_target_in_front_of_the_camera() {
    let rig = framed_rig(2.0);
    let uniform = rig.uniform();
    let view_proj = uniform.view_proj();
    let clip = view_proj * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);

    assert!(clip.w > 0.0);
    let depth = clip.z / clip.w;
    assert!((0.0..=1.0).contains(&depth));
    assert!(approx_eq(clip.x / clip.w, 0.0));
    assert!(approx_eq(clip.y / clip.w, 0.0));
}

#[test]
fn zooming_out_recovers_from_the_closest_zoom() {
    let mut rig = framed_rig(1.0);
    let start = rig.camera.distance();

    rig.zoom(400.0);
    rig.update();
    let close = rig.camera.distance();
    assert!(close > 0.0);
    assert!(close < start);
    let floor = rig.controller.min_distance;
    assert!((close - floor).abs() < floor * 1e-3);

    for _ in 0..5 {
        rig.zoom(-40.0);
        rig.update();
    }

    assert!(rig.camera.distance() > close * 100.0);
    assert!(rig.camera.eye.x.is_finite());
}

#[test]
fn eye_on_the_target_backs_off_when_zooming_out() {
    let mut controller = OrbitController::new(0.0, true);
    let mut camera = Camera::new((0.0, 0.0, 0.0), (0.0, 0.0, 0.0));

    controller.zoom(-10.0);

    assert!(controller.update(&mut camera));
    assert!(camera.distance() > 0.0);
    assert!(camera.eye.y.is_finite());
}
