//! Render pipeline and the uniforms it binds.
//!
//! - `basic` is the lit, optionally double-sided mesh pipeline
//! - `light` holds the fixed directional lights and the ambient term
//! - `material` holds the colour/specular uniform of the displayed mesh

pub mod basic;
pub mod light;
pub mod material;
