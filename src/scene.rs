//! Ownership of the displayed mesh's render resources.
//!
//! A [`Scene`] holds at most one [`ResourceSet`]. Installing a new mesh
//! releases the previous set first, then allocates the new one; if any
//! allocation fails, whatever was already allocated for it is released again
//! before the error is returned.

use crate::{
    data_structures::{instance::Instance, mesh::DecodedMesh},
    error::ViewerError,
    normalize::NormalizationTransform,
    render::{MaterialDesc, RenderBackend},
};

/// Geometry, material and instance of one displayed mesh.
pub struct ResourceSet<B: RenderBackend> {
    pub geometry: B::Geometry,
    pub material: B::Material,
    pub instance: B::Instance,
    pub transform: NormalizationTransform,
    pub triangles: usize,
}

impl<B: RenderBackend> ResourceSet<B> {
    fn release(self, backend: &mut B) {
        backend.release_instance(self.instance);
        backend.release_material(self.material);
        backend.release_geometry(self.geometry);
    }
}

/// Counters of installed/released resource sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub installed: usize,
    pub released: usize,
}

impl SceneStats {
    pub fn live(&self) -> usize {
        self.installed - self.released
    }
}

pub struct Scene<B: RenderBackend> {
    live: Option<ResourceSet<B>>,
    material: MaterialDesc,
    stats: SceneStats,
}

impl<B: RenderBackend> Scene<B> {
    pub fn new(material: MaterialDesc) -> Self {
        Self {
            live: None,
            material,
            stats: SceneStats::default(),
        }
    }

    pub fn live(&self) -> Option<&ResourceSet<B>> {
        self.live.as_ref()
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    /// Replaces the displayed mesh.
    ///
    /// On success exactly one resource set is live. On failure none is: the old
    /// set is gone already and the partial new one was released.
    pub fn install_mesh(
        &mut self,
        backend: &mut B,
        transform: &NormalizationTransform,
        mesh: &DecodedMesh,
    ) -> Result<(), ViewerError> {
        self.clear(backend);

        let geometry = backend.create_geometry(mesh)?;
        let material = match backend.create_material(&self.material) {
            Ok(material) => material,
            Err(e) => {
                backend.release_geometry(geometry);
                return Err(e.into());
            }
        };
        let instance = match backend.create_instance(&Instance::from(transform)) {
            Ok(instance) => instance,
            Err(e) => {
                backend.release_material(material);
                backend.release_geometry(geometry);
                return Err(e.into());
            }
        };

        self.live = Some(ResourceSet {
            geometry,
            material,
            instance,
            transform: *transform,
            triangles: mesh.triangle_count(),
        });
        self.stats.installed += 1;
        Ok(())
    }

    /// Releases the live set, if any.
    pub fn clear(&mut self, backend: &mut B) {
        if let Some(set) = self.live.take() {
            set.release(backend);
            self.stats.released += 1;
        }
    }
}
