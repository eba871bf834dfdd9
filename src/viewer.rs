//! One model viewer: state machine, load generations and teardown.
//!
//! A [`Viewer`] owns everything a mounted viewer needs: the render backend, the
//! scene with its (at most one) live resource set, the camera rig and the render
//! loop. Hosts drive it from a single thread:
//!
//! 1. [`Viewer::begin_load`] hands out a [`LoadTicket`] and switches to loading
//! 2. the host resolves the source asynchronously (see [`crate::resources::resolve`])
//!    while frames keep being rendered with the previous mesh
//! 3. [`Viewer::complete_load`] gets the ticket back with the result
//!
//! Tickets carry a monotonically increasing generation. Once a load has
//! settled (installed or failed) every result of the same or an older
//! generation is discarded, and after [`Viewer::dispose`] every completion is a
//! no-op.

use crate::{
    camera::ViewportRig,
    config::ViewerConfig,
    data_structures::{bounds::Bounds, mesh::DecodedMesh},
    error::ViewerError,
    normalize::Normalized,
    render::{MaterialDesc, RenderBackend},
    render_loop::{FrameStatus, LoopHandle, RenderLoop},
    resources::{self, MeshSource, Progress},
    scene::{Scene, SceneStats},
};

#[derive(Clone, Debug, PartialEq)]
pub enum ViewerState {
    Idle,
    Loading,
    Displaying,
    Failed(ViewerError),
}

/// What the host shows: at most one of `loading` and `error` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewerStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Proof of a started load, to be returned with its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// The mesh is now displayed.
    Installed { triangles: usize, scale: f32 },
    /// The load failed; the previous mesh, if any, is still displayed.
    Failed(ViewerError),
    /// A newer load has already settled, or a newer load is pending and this
    /// one failed; the result was dropped.
    Stale,
    /// The viewer was disposed before the load finished.
    Disposed,
}

pub struct Viewer<B: RenderBackend> {
    backend: B,
    scene: Scene<B>,
    rig: ViewportRig,
    render_loop: RenderLoop,
    state: ViewerState,
    target_size: f32,
    /// Generation of the newest started load.
    requested: u64,
    /// Generation of the newest load that was installed or failed.
    settled: u64,
    disposed: bool,
}

impl<B: RenderBackend> Viewer<B> {
    /// Creates an idle viewer and starts its render loop.
    pub fn new(backend: B, config: &ViewerConfig) -> Self {
        Self {
            backend,
            scene: Scene::new(MaterialDesc::default()),
            rig: ViewportRig::new(config),
            render_loop: RenderLoop::start(),
            state: ViewerState::Idle,
            target_size: config.target_size,
            requested: 0,
            settled: 0,
            disposed: false,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn status(&self) -> ViewerStatus {
        match &self.state {
            ViewerState::Loading => ViewerStatus {
                loading: true,
                error: None,
            },
            ViewerState::Failed(e) => ViewerStatus {
                loading: false,
                error: Some(e.user_message()),
            },
            ViewerState::Idle | ViewerState::Displaying => ViewerStatus::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scene(&self) -> &Scene<B> {
        &self.scene
    }

    pub fn scene_stats(&self) -> SceneStats {
        self.scene.stats()
    }

    pub fn rig(&self) -> &ViewportRig {
        &self.rig
    }

    pub fn loop_handle(&self) -> LoopHandle {
        self.render_loop.handle()
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether `ticket` belongs to the newest started load.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        !self.disposed && ticket.generation == self.requested
    }

    /// Starts a new load generation.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.requested += 1;
        if !self.disposed {
            self.state = ViewerState::Loading;
        }
        LoadTicket {
            generation: self.requested,
        }
    }

    /// Hands the result of the load started with `ticket` back to the viewer.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<DecodedMesh, ViewerError>,
    ) -> LoadOutcome {
        if self.disposed {
            log::debug!("load {} finished after teardown", ticket.generation);
            return LoadOutcome::Disposed;
        }
        if ticket.generation <= self.settled {
            log::info!(
                "discarding load {}, load {} has already settled",
                ticket.generation,
                self.settled
            );
            return LoadOutcome::Stale;
        }
        let latest = ticket.generation == self.requested;

        let mesh = match result {
            Ok(mesh) => mesh,
            Err(e) if latest => {
                log::error!("load {} failed: {}", ticket.generation, e);
                self.settled = ticket.generation;
                self.state = ViewerState::Failed(e.clone());
                return LoadOutcome::Failed(e);
            }
            Err(e) => {
                log::warn!(
                    "load {} failed while load {} is pending: {}",
                    ticket.generation,
                    self.requested,
                    e
                );
                return LoadOutcome::Stale;
            }
        };

        match self.install(&mesh) {
            Ok(scale) => {
                self.settled = ticket.generation;
                if latest {
                    self.state = ViewerState::Displaying;
                }
                LoadOutcome::Installed {
                    triangles: mesh.triangle_count(),
                    scale,
                }
            }
            Err(e) => {
                log::error!("load {} could not be displayed: {}", ticket.generation, e);
                if latest {
                    self.settled = ticket.generation;
                    self.state = ViewerState::Failed(e.clone());
                }
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Convenience for hosts without overlapping loads: begin, resolve, complete.
    ///
    /// Holding `&mut self` across the fetch means no frames are drawn meanwhile;
    /// hosts that keep rendering use [`Self::begin_load`] and
    /// [`Self::complete_load`] around [`resources::resolve`] instead.
    pub async fn load<F: FnMut(Progress)>(
        &mut self,
        source: MeshSource,
        on_progress: F,
    ) -> LoadOutcome {
        let ticket = self.begin_load();
        log::info!("load {} of {}", ticket.generation, source.describe());
        let result = resources::resolve(source, on_progress).await;
        self.complete_load(ticket, result)
    }

    /// Bounds → normalization → scene → camera. Returns the applied scale.
    fn install(&mut self, mesh: &DecodedMesh) -> Result<f32, ViewerError> {
        let normalized = Normalized::new(Bounds::of(mesh)?, self.target_size);
        let transform = normalized.transform;
        self.scene
            .install_mesh(&mut self.backend, &transform, mesh)?;
        let radius = normalized.displayed_radius();
        self.rig.frame(radius);
        log::info!(
            "showing {} triangles at scale {} (radius {})",
            mesh.triangle_count(),
            transform.scale,
            radius
        );
        Ok(transform.scale)
    }

    /// Renders one frame. Returns [`FrameStatus::Stopped`] once disposed.
    pub fn frame(&mut self) -> anyhow::Result<FrameStatus> {
        self.render_loop
            .tick(&mut self.backend, &self.scene, &mut self.rig)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.disposed {
            return;
        }
        self.rig.resize(width, height);
        self.backend.resize(width, height);
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.rig.orbit(dx, dy);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.rig.pan(dx, dy);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.rig.zoom(steps);
    }

    /// Tears the viewer down. Safe in every state and idempotent.
    ///
    /// Stops the render loop, releases the live resource set and the controls,
    /// and detaches the render surface. Loads still in flight become no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.render_loop.stop();
        self.scene.clear(&mut self.backend);
        self.rig.release();
        self.backend.detach();
        let stats = self.scene.stats();
        log::info!(
            "viewer disposed, {} resource sets installed and {} released",
            stats.installed,
            stats.released
        );
    }
}
