//! flow-viewer
//!
//! A small 3D model viewer for native windows and the web. It fetches a mesh
//! (STL or OBJ) from a URL, a local path or an in-memory buffer, scales it so
//! its largest dimension is a fixed size, centres it at the origin and shows it
//! with a framed camera, orbit controls and a fixed three-light setup.
//!
//! High-level modules
//! - `app`: winit host that mounts a viewer into a window or canvas
//! - `viewer`: one viewer instance: load generations, state and teardown
//! - `resources`: model sources, fetching and the STL/OBJ decoders
//! - `normalize`: the scale/translation that fits a mesh to the view
//! - `scene`: the displayed resource set and its release discipline
//! - `render`: the backend seam the scene and render loop draw through
//! - `render_loop`: cancellable continuous redraw
//! - `context`: the wgpu backend that owns device, queue and surface
//! - `camera`: camera, projection and orbit controls
//! - `pipelines`: the lit mesh pipeline with its light and material uniforms
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod normalize;
pub mod pipelines;
pub mod render;
pub mod render_loop;
pub mod resources;
pub mod scene;
pub mod viewer;

// Re-exports commonly used types for convenience in downstream code.
pub use app::{ViewerEvent, run, run_source};
pub use config::ViewerConfig;
pub use data_structures::mesh::DecodedMesh;
pub use error::ViewerError;
pub use resources::{MeshSource, Progress};
pub use viewer::{LoadOutcome, LoadTicket, Viewer, ViewerState, ViewerStatus};
