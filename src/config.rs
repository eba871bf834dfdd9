//! Viewer configuration.
//!
//! Every field has a default, so an empty TOML document (or
//! `ViewerConfig::default()`) gives an 800×600 viewer without a model.

#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use anyhow::{Context as _, ensure};
use serde::Deserialize;

use crate::normalize::TARGET_SIZE;

/// Camera distance from the origin in units of the displayed bounding radius.
///
/// `2·√3` places the camera at `(2r, 2r, 2r)`.
pub const FRAMING_DISTANCE: f32 = 2.0 * 1.732_050_8;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Locator of the model shown on startup, remote URL or local path.
    pub model: Option<String>,
    pub target_size: f32,
    pub framing_distance: f32,
    pub field_of_view_deg: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Orbit damping per frame, `0.0` turns inertia off.
    pub damping_factor: f32,
    pub screen_space_panning: bool,
    pub clear_colour: [f64; 4],
    /// Id of the host element the canvas is appended to on the web.
    pub mount_id: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "flow-viewer".to_string(),
            model: None,
            target_size: TARGET_SIZE,
            framing_distance: FRAMING_DISTANCE,
            field_of_view_deg: 45.0,
            znear: 0.1,
            zfar: 2000.0,
            damping_factor: 0.05,
            screen_space_panning: true,
            clear_colour: [1.0, 1.0, 1.0, 1.0],
            mount_id: "viewer".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn with_model(mut self, locator: impl Into<String>) -> Self {
        self.model = Some(locator.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: ViewerConfig = toml::from_str(text).context("invalid viewer config")?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "viewer size must be positive, got {}x{}",
            self.width,
            self.height
        );
        ensure!(
            self.target_size > 0.0 && self.target_size.is_finite(),
            "target_size must be positive"
        );
        ensure!(
            self.framing_distance > 0.0 && self.framing_distance.is_finite(),
            "framing_distance must be positive"
        );
        ensure!(
            self.znear > 0.0 && self.zfar > self.znear,
            "clip planes must satisfy 0 < znear < zfar"
        );
        ensure!(
            (0.0..1.0).contains(&self.damping_factor),
            "damping_factor must be in [0, 1)"
        );
        Ok(())
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
