//! Turning a model source into a decoded mesh.
//!
//! A [`MeshSource`] is either a locator (remote URL or, on native, a path) or
//! bytes the host already holds. Both end up in [`decode`], which picks the
//! format and validates the result before anything downstream sees it.
//!
//! Transport failures are [`ViewerError::SourceUnavailable`], everything that
//! goes wrong after the bytes arrived is [`ViewerError::Decode`] or
//! [`ViewerError::EmptyMesh`].

use std::fmt;

use crate::{data_structures::mesh::DecodedMesh, error::ViewerError};

pub mod obj;
pub mod stl;

#[derive(Clone, PartialEq)]
pub enum MeshSource {
    Remote(String),
    InMemory(Vec<u8>),
}

impl MeshSource {
    pub fn describe(&self) -> String {
        match self {
            MeshSource::Remote(locator) => locator.clone(),
            MeshSource::InMemory(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

// Keeps multi-megabyte buffers out of log lines.
impl fmt::Debug for MeshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshSource::Remote(locator) => f.debug_tuple("Remote").field(locator).finish(),
            MeshSource::InMemory(bytes) => f.debug_tuple("InMemory").field(&bytes.len()).finish(),
        }
    }
}

impl From<&str> for MeshSource {
    fn from(locator: &str) -> Self {
        MeshSource::Remote(locator.to_string())
    }
}

impl From<String> for MeshSource {
    fn from(locator: String) -> Self {
        MeshSource::Remote(locator)
    }
}

impl From<Vec<u8>> for MeshSource {
    fn from(bytes: Vec<u8>) -> Self {
        MeshSource::InMemory(bytes)
    }
}

/// Download progress. Advisory only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub received: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.received as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
}

impl MeshFormat {
    /// Format named by the extension of a locator, ignoring query and fragment.
    pub fn from_locator(locator: &str) -> Option<Self> {
        let path = locator.split(['?', '#']).next().unwrap_or(locator);
        let extension = path.rsplit_once('.')?.1;
        if extension.contains('/') {
            return None;
        }
        match extension.to_ascii_lowercase().as_str() {
            "stl" => Some(MeshFormat::Stl),
            "obj" => Some(MeshFormat::Obj),
            _ => None,
        }
    }

    /// Guesses the format from content.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if stl::is_binary(bytes) || stl::is_ascii(bytes) {
            return Some(MeshFormat::Stl);
        }
        let looks_like_obj = bytes
            .split(|b| *b == b'\n')
            .map(|line| line.trim_ascii_start())
            .any(|line| line.starts_with(b"v ") || line.starts_with(b"f "));
        looks_like_obj.then_some(MeshFormat::Obj)
    }
}

/// Decodes and validates raw bytes.
///
/// `hint` wins over content sniffing; without one, the bytes decide.
pub fn decode(bytes: &[u8], hint: Option<MeshFormat>) -> Result<DecodedMesh, ViewerError> {
    if bytes.is_empty() {
        return Err(ViewerError::Decode("model buffer is empty".to_string()));
    }
    let format = hint
        .or_else(|| MeshFormat::sniff(bytes))
        .ok_or_else(|| ViewerError::Decode("unrecognised model format".to_string()))?;
    let mesh = match format {
        MeshFormat::Stl => stl::parse(bytes)?,
        MeshFormat::Obj => obj::parse(bytes)?,
    };
    mesh.validate()?;
    Ok(mesh)
}

/// Fetches (if needed) and decodes `source`.
///
/// `on_progress` is called while a remote download is running.
pub async fn resolve<F>(source: MeshSource, mut on_progress: F) -> Result<DecodedMesh, ViewerError>
where
    F: FnMut(Progress),
{
    match source {
        MeshSource::InMemory(bytes) => decode(&bytes, None),
        MeshSource::Remote(locator) => {
            let bytes = load_binary(&locator, &mut on_progress).await?;
            decode(&bytes, MeshFormat::from_locator(&locator))
        }
    }
}

fn is_url(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, ViewerError> {
    if is_url(file_name) {
        return reqwest::Url::parse(file_name)
            .map_err(|e| ViewerError::SourceUnavailable(format!("invalid url {}: {}", file_name, e)));
    }
    let origin = web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .ok_or_else(|| ViewerError::SourceUnavailable("no page origin".to_string()))?;
    let base = reqwest::Url::parse(&format!("{}/", origin))
        .map_err(|e| ViewerError::SourceUnavailable(e.to_string()))?;
    base.join(file_name)
        .map_err(|e| ViewerError::SourceUnavailable(format!("invalid locator {}: {}", file_name, e)))
}

#[cfg(target_arch = "wasm32")]
pub async fn load_binary<F: FnMut(Progress)>(
    locator: &str,
    on_progress: &mut F,
) -> Result<Vec<u8>, ViewerError> {
    let url = format_url(locator)?;
    let response = reqwest::get(url).await?.error_for_status()?;
    let total = response.content_length();
    let data = response.bytes().await?.to_vec();
    on_progress(Progress {
        received: data.len() as u64,
        total,
    });
    Ok(data)
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn load_binary<F: FnMut(Progress)>(
    locator: &str,
    on_progress: &mut F,
) -> Result<Vec<u8>, ViewerError> {
    if is_url(locator) {
        let url = reqwest::Url::parse(locator).map_err(|e| {
            ViewerError::SourceUnavailable(format!("invalid url {}: {}", locator, e))
        })?;
        let mut response = reqwest::get(url).await?.error_for_status()?;
        let total = response.content_length();
        let mut data = Vec::with_capacity(total.unwrap_or(0).min(1 << 28) as usize);
        while let Some(chunk) = response.chunk().await? {
            data.extend_from_slice(&chunk);
            on_progress(Progress {
                received: data.len() as u64,
                total,
            });
        }
        return Ok(data);
    }

    let path = std::path::Path::new(locator.strip_prefix("file://").unwrap_or(locator));
    // relative locators are looked up in ./assets first, like every other asset
    let asset = std::path::Path::new("./").join("assets").join(path);
    let path = if path.is_relative() && tokio::fs::try_exists(&asset).await.unwrap_or(false) {
        asset
    } else {
        path.to_path_buf()
    };
    let data = tokio::fs::read(&path).await.map_err(|e| {
        ViewerError::SourceUnavailable(format!("cannot read {}: {}", path.display(), e))
    })?;
    let len = data.len() as u64;
    on_progress(Progress {
        received: len,
        total: Some(len),
    });
    Ok(data)
}
