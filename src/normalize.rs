//! Scale/translation that frames any mesh the same way.
//!
//! The transform centers the bounding box on the origin and scales uniformly so
//! that its largest side equals a target size. A displayed vertex is
//! `(original + translation) * scale`.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::data_structures::bounds::{BoundingBox, BoundingSphere, Bounds};

/// Largest side of a displayed model in model-space units.
pub const TARGET_SIZE: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizationTransform {
    pub scale: f32,
    pub translation: Vector3<f32>,
}

impl NormalizationTransform {
    /// Derives the transform for `aabb`.
    ///
    /// A box with zero extent (every vertex identical) keeps `scale == 1`
    /// instead of dividing by zero; it is still moved to the origin.
    pub fn fit(aabb: &BoundingBox, target_size: f32) -> Self {
        let extent = aabb.max_extent();
        let scale = if extent > 0.0 {
            target_size / extent
        } else {
            log::warn!("degenerate mesh with zero extent, keeping its scale");
            1.0
        };
        Self {
            scale,
            translation: -aabb.center().to_vec(),
        }
    }

    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translation: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn apply(&self, p: Point3<f32>) -> Point3<f32> {
        (p + self.translation) * self.scale
    }

    pub fn apply_box(&self, aabb: &BoundingBox) -> BoundingBox {
        BoundingBox::new(self.apply(aabb.min), self.apply(aabb.max))
    }

    /// The sphere as it appears after the transform; camera framing uses this.
    pub fn apply_sphere(&self, sphere: &BoundingSphere) -> BoundingSphere {
        BoundingSphere {
            center: self.apply(sphere.center),
            radius: sphere.radius * self.scale,
        }
    }

    /// The same transform as "scale, then move": the offset of the instance.
    pub fn position(&self) -> Vector3<f32> {
        self.translation * self.scale
    }
}

/// Bounds of the raw mesh together with the transform that normalizes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalized {
    pub raw: Bounds,
    pub transform: NormalizationTransform,
}

impl Normalized {
    pub fn new(raw: Bounds, target_size: f32) -> Self {
        Self {
            raw,
            transform: NormalizationTransform::fit(&raw.aabb, target_size),
        }
    }

    pub fn displayed_box(&self) -> BoundingBox {
        self.transform.apply_box(&self.raw.aabb)
    }

    pub fn displayed_radius(&self) -> f32 {
        self.transform.apply_sphere(&self.raw.sphere).radius
    }
}
