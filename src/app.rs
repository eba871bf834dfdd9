//! Window host and event loop.
//!
//! [`App`] mounts one [`Viewer`] into a winit window (a canvas inside the
//! element named by [`ViewerConfig::mount_id`] on the web) and drives it:
//!
//! 1. `resumed` creates the window and the wgpu [`Context`]
//! 2. the configured model, or any [`ViewerEvent::Load`], starts a load that is
//!    resolved on the async runtime while frames keep being drawn
//! 3. the result comes back as [`ViewerEvent::Loaded`] and is handed to the
//!    viewer together with its ticket
//! 4. `RedrawRequested` renders a frame and schedules the next one while the
//!    render loop runs
//! 5. closing the window disposes the viewer before the event loop exits
//!
//! Mouse input drives the orbit controls: left drag orbits, right drag (or
//! shift + left drag) pans and the wheel zooms.

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::mesh::DecodedMesh,
    error::ViewerError,
    resources::{self, MeshSource, Progress},
    viewer::{LoadOutcome, LoadTicket, Viewer, ViewerStatus},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Pixels of trackpad scroll that count as one wheel step.
const PIXELS_PER_WHEEL_STEP: f64 = 100.0;

pub enum ViewerEvent {
    /// The wgpu context finished initialising (web only, where it is async).
    #[allow(dead_code)]
    Initialized(Box<Viewer<Context>>),
    /// Replaces the displayed model.
    Load(MeshSource),
    Progress {
        ticket: LoadTicket,
        progress: Progress,
    },
    Loaded {
        ticket: LoadTicket,
        result: Result<DecodedMesh, ViewerError>,
    },
    Exit,
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Load(source) => f.debug_tuple("Load").field(source).finish(),
            Self::Progress { ticket, progress } => f
                .debug_struct("Progress")
                .field("ticket", ticket)
                .field("progress", progress)
                .finish(),
            Self::Loaded { ticket, result } => f
                .debug_struct("Loaded")
                .field("ticket", ticket)
                .field("ok", &result.is_ok())
                .finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Window title reflecting the viewer status.
pub fn window_title(base: &str, status: &ViewerStatus, progress: Option<Progress>) -> String {
    if let Some(error) = &status.error {
        return format!("{} - {}", base, error);
    }
    if status.loading {
        return match progress.and_then(|p| p.percent()) {
            Some(percent) => format!("{} - loading {:.0}%", base, percent),
            None => format!("{} - loading", base),
        };
    }
    base.to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Orbit,
    Pan,
}

#[derive(Debug, Default)]
struct Pointer {
    position: Option<PhysicalPosition<f64>>,
    drag: Option<Drag>,
    shift: bool,
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    viewer: Option<Viewer<Context>>,
    initializing: bool,
    /// Model to show once the viewer exists.
    pending: Option<MeshSource>,
    progress: Option<Progress>,
    pointer: Pointer,
}

impl App {
    pub fn new(
        event_loop: &EventLoop<ViewerEvent>,
        config: ViewerConfig,
        initial: Option<MeshSource>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            viewer: None,
            initializing: false,
            pending: initial,
            progress: None,
            pointer: Pointer::default(),
        })
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Arc<Window>> {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            window_attributes =
                window_attributes.with_canvas(Some(mount_canvas(&self.config)?));
        }

        Ok(Arc::new(event_loop.create_window(window_attributes)?))
    }

    /// Installs a freshly created viewer and starts whatever load is pending.
    fn attach(&mut self, viewer: Viewer<Context>) {
        self.viewer = Some(viewer);
        self.initializing = false;
        if let Some(source) = self.pending.take() {
            self.start_load(source);
        }
        self.refresh_title();
        self.request_redraw();
    }

    fn start_load(&mut self, source: MeshSource) {
        let Some(viewer) = &mut self.viewer else {
            self.pending = Some(source);
            return;
        };
        let ticket = viewer.begin_load();
        self.progress = None;
        log::info!("load {} of {}", ticket.generation(), source.describe());

        let proxy = self.proxy.clone();
        let load = async move {
            let progress_proxy = proxy.clone();
            let result = resources::resolve(source, move |progress| {
                let _ = progress_proxy.send_event(ViewerEvent::Progress { ticket, progress });
            })
            .await;
            if proxy
                .send_event(ViewerEvent::Loaded { ticket, result })
                .is_err()
            {
                log::debug!("event loop closed before load {} finished", ticket.generation());
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);

        self.refresh_title();
    }

    fn window(&self) -> Option<&Arc<Window>> {
        self.viewer.as_ref()?.backend().window()
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window() {
            window.request_redraw();
        }
    }

    fn refresh_title(&self) {
        if let (Some(viewer), Some(window)) = (&self.viewer, self.window()) {
            window.set_title(&window_title(
                &self.config.title,
                &viewer.status(),
                self.progress,
            ));
        }
    }

    fn dispose(&mut self) {
        if let Some(viewer) = &mut self.viewer {
            viewer.dispose();
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn mount_canvas(config: &ViewerConfig) -> anyhow::Result<web_sys::HtmlCanvasElement> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| anyhow::anyhow!("no document to mount the viewer in"))?;
    let mount = document
        .get_element_by_id(&config.mount_id)
        .ok_or_else(|| anyhow::anyhow!("no element with id {}", config.mount_id))?;
    let canvas = document
        .create_element("canvas")
        .map_err(|e| anyhow::anyhow!("cannot create canvas: {:?}", e))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| anyhow::anyhow!("created element is not a canvas"))?;
    canvas.set_width(config.width);
    canvas.set_height(config.height);
    mount
        .append_child(&canvas)
        .map_err(|e| anyhow::anyhow!("cannot mount canvas: {:?}", e))?;
    Ok(canvas)
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() || self.initializing {
            return;
        }
        let window = match self.create_window(event_loop) {
            Ok(window) => window,
            Err(e) => {
                log::error!("cannot create the viewer window: {:#}", e);
                event_loop.exit();
                return;
            }
        };
        self.initializing = true;

        let config = self.config.clone();
        let init_future = async move {
            let ctx = Context::new(window, &config).await?;
            anyhow::Ok(Viewer::new(ctx, &config))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(viewer) => self.attach(viewer),
                Err(e) => {
                    log::error!("cannot initialise the renderer: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(viewer) => ViewerEvent::Initialized(Box::new(viewer)),
                    Err(e) => {
                        log::error!("cannot initialise the renderer: {:#}", e);
                        ViewerEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed during initialisation");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(viewer) => self.attach(*viewer),
            ViewerEvent::Load(source) => self.start_load(source),
            ViewerEvent::Progress { ticket, progress } => {
                let current = self.viewer.as_ref().is_some_and(|v| v.is_current(ticket));
                if current {
                    if let Some(percent) = progress.percent() {
                        log::info!("{:.0}% loaded", percent);
                    }
                    self.progress = Some(progress);
                    self.refresh_title();
                }
            }
            ViewerEvent::Loaded { ticket, result } => {
                let Some(viewer) = &mut self.viewer else {
                    return;
                };
                match viewer.complete_load(ticket, result) {
                    LoadOutcome::Installed { triangles, .. } => {
                        log::info!("load {} displayed, {} triangles", ticket.generation(), triangles)
                    }
                    LoadOutcome::Failed(e) => {
                        log::warn!("load {} failed: {}", ticket.generation(), e)
                    }
                    LoadOutcome::Stale | LoadOutcome::Disposed => {}
                }
                self.progress = None;
                self.refresh_title();
                self.request_redraw();
            }
            ViewerEvent::Exit => {
                self.dispose();
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                self.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.pointer.shift = modifiers.state().shift_key();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.pointer.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) if self.pointer.shift => {
                        Some(Drag::Pan)
                    }
                    (ElementState::Pressed, MouseButton::Left) => Some(Drag::Orbit),
                    (ElementState::Pressed, MouseButton::Right) => Some(Drag::Pan),
                    (ElementState::Released, _) => None,
                    _ => self.pointer.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (Some(last), Some(drag)) = (self.pointer.position, self.pointer.drag) {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match drag {
                        Drag::Orbit => viewer.orbit(dx, dy),
                        Drag::Pan => viewer.pan(dx, dy),
                    }
                }
                self.pointer.position = Some(position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.position = None;
                self.pointer.drag = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_WHEEL_STEP) as f32,
                };
                viewer.zoom(steps);
            }
            WindowEvent::RedrawRequested => match viewer.frame() {
                Ok(status) => {
                    if status.wants_next_frame() {
                        self.request_redraw();
                    }
                }
                Err(e) => {
                    log::error!("frame failed: {:#}", e);
                    self.request_redraw();
                }
            },
            _ => {}
        }
    }
}

fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            log::debug!("logger already initialised: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::debug!("logger already initialised");
        }
    }
}

/// Opens a viewer showing `config.model` (if any) and runs until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let initial = config.model.clone().map(MeshSource::Remote);
    run_source(config, initial)
}

/// Like [`run`], with the first model given as any [`MeshSource`].
pub fn run_source(config: ViewerConfig, initial: Option<MeshSource>) -> anyhow::Result<()> {
    init_logger();
    config.validate()?;

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let app = App::new(&event_loop, config, initial)?;

    #[cfg(not(target_arch = "wasm32"))]
    {
        let mut app = app;
        event_loop.run_app(&mut app)?;
    }

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn web_config(mount_id: String, width: Option<u32>, height: Option<u32>) -> ViewerConfig {
    let defaults = ViewerConfig::default();
    ViewerConfig {
        mount_id,
        ..defaults.clone()
    }
    .with_size(width.unwrap_or(defaults.width), height.unwrap_or(defaults.height))
}

/// Shows the model at `url` in a canvas appended to the element `mount_id`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn view_model_url(
    mount_id: String,
    url: String,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<(), JsValue> {
    let config = web_config(mount_id, width, height).with_model(url);
    run(config).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}

/// Shows a model the page already holds, e.g. from a file input.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn view_model_bytes(
    mount_id: String,
    bytes: Vec<u8>,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<(), JsValue> {
    run_source(
        web_config(mount_id, width, height),
        Some(MeshSource::InMemory(bytes)),
    )
    .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
