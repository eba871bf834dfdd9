//! Continuous redraw.
//!
//! The host calls [`RenderLoop::tick`] at its display refresh cadence (winit's
//! `RedrawRequested`, `requestAnimationFrame` on the web) and asks for the next
//! frame only while the tick reports [`FrameStatus::Rendered`]. Cancelling the
//! [`LoopHandle`] stops the loop: every later tick returns
//! [`FrameStatus::Stopped`] before touching controls or the backend.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use instant::{Duration, Instant};

use crate::{
    camera::ViewportRig,
    render::{Drawn, RenderBackend},
    scene::Scene,
};

/// Cancellation handle of a running [`RenderLoop`].
#[derive(Clone, Debug, Default)]
pub struct LoopHandle {
    stopped: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Rendered,
    /// The surface had to be reconfigured; keep scheduling frames.
    Skipped,
    Stopped,
}

impl FrameStatus {
    pub fn wants_next_frame(&self) -> bool {
        !matches!(self, FrameStatus::Stopped)
    }
}

#[derive(Debug)]
pub struct RenderLoop {
    handle: LoopHandle,
    frames: u64,
    last_frame: Instant,
    frame_time: Duration,
}

impl RenderLoop {
    pub fn start() -> Self {
        Self {
            handle: LoopHandle::default(),
            frames: 0,
            last_frame: Instant::now(),
            frame_time: Duration::from_millis(0),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_stopped()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Time between the last two frames.
    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    /// One frame: advance the controls, then draw the scene.
    pub fn tick<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        scene: &Scene<B>,
        rig: &mut ViewportRig,
    ) -> anyhow::Result<FrameStatus> {
        if self.handle.is_stopped() {
            return Ok(FrameStatus::Stopped);
        }
        self.frame_time = self.last_frame.elapsed();
        self.last_frame = Instant::now();

        rig.update();
        let status = match backend.draw(scene.live(), rig)? {
            Drawn::Presented => FrameStatus::Rendered,
            Drawn::Skipped => FrameStatus::Skipped,
        };
        self.frames += 1;
        Ok(status)
    }

    pub fn stop(&self) {
        if !self.handle.is_stopped() {
            log::info!("render loop stopped after {} frames", self.frames);
        }
        self.handle.cancel();
    }
}
