//! Axis-aligned bounding boxes and bounding spheres of decoded meshes.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use crate::{data_structures::mesh::DecodedMesh, error::ViewerError};

/// `min[i] <= max[i]` on every axis. Zero-volume boxes (flat or point meshes)
/// are legal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Per-axis min/max over all points, `None` for an empty slice.
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = Point3::from(*first);
        let mut max = min;
        for p in rest {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }
        Some(Self { min, max })
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// The largest side length of the box.
    pub fn max_extent(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }

    pub fn contains(&self, p: Point3<f32>, tolerance: f32) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tolerance && p[i] <= self.max[i] + tolerance)
    }
}

/// A sphere around the box center that holds every vertex. Not minimal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3<f32>,
    pub radius: f32,
}

/// Box and sphere of one mesh, computed together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub aabb: BoundingBox,
    pub sphere: BoundingSphere,
}

impl Bounds {
    /// Computes the bounds of `mesh`.
    ///
    /// Fails only for a mesh without vertices. The sphere is centred on the box
    /// center and its radius is the largest vertex distance from there, so it is
    /// zero exactly when all vertices coincide.
    pub fn of(mesh: &DecodedMesh) -> Result<Self, ViewerError> {
        let aabb = BoundingBox::from_points(&mesh.positions).ok_or(ViewerError::EmptyMesh)?;
        let center = aabb.center();
        let radius = mesh
            .positions
            .iter()
            .map(|p| (Point3::from(*p) - center).magnitude2())
            .fold(0.0f32, f32::max)
            .sqrt();
        Ok(Self {
            aabb,
            sphere: BoundingSphere { center, radius },
        })
    }
}
