//! The seam between the viewer and whatever draws it.
//!
//! [`RenderBackend`] creates and releases the three resources a displayed mesh
//! is made of (geometry, material, instance) and draws the current scene. The
//! wgpu implementation lives in [`crate::context`]; tests plug in a recording
//! backend.
//!
//! Resources are released explicitly through the backend, never by dropping
//! them, so that every allocation can be accounted for.

use crate::{
    camera::ViewportRig, data_structures::instance::Instance,
    data_structures::mesh::DecodedMesh, scene::ResourceSet,
};

/// Fixed appearance of displayed meshes: grey Phong, lit from both sides.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialDesc {
    pub color: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    /// Render back faces too, so meshes with inverted winding still show up.
    pub double_sided: bool,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            color: rgb(0x808080),
            specular: rgb(0x111111),
            shininess: 200.0,
            double_sided: true,
        }
    }
}

/// Splits a `0xRRGGBB` colour into linear 0..1 channels.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Result of one draw call into the output surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drawn {
    Presented,
    /// The surface was lost or outdated and has been reconfigured; nothing was shown.
    Skipped,
}

pub trait RenderBackend: Sized {
    type Geometry;
    type Material;
    type Instance;

    fn create_geometry(&mut self, mesh: &DecodedMesh) -> anyhow::Result<Self::Geometry>;
    fn create_material(&mut self, desc: &MaterialDesc) -> anyhow::Result<Self::Material>;
    fn create_instance(&mut self, instance: &Instance) -> anyhow::Result<Self::Instance>;

    fn release_geometry(&mut self, geometry: Self::Geometry);
    fn release_material(&mut self, material: Self::Material);
    fn release_instance(&mut self, instance: Self::Instance);

    /// Renders `live` (or an empty scene) as seen by `rig` to the output surface.
    fn draw(&mut self, live: Option<&ResourceSet<Self>>, rig: &ViewportRig)
    -> anyhow::Result<Drawn>;

    /// The output surface changed size in physical pixels.
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Gives up the output surface and detaches it from the host.
    fn detach(&mut self);
}
