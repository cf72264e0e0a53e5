use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::LoaderSettings;
use crate::error::ImageError;

/// Decoded RGBA8 pixels for one image identifier.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Where an identifier's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Remote(String),
}

impl ImageSource {
    /// Identifiers containing `://` are URLs; everything else is relative to `asset_dir`.
    pub fn resolve(asset_dir: &Path, id: &str) -> Self {
        if id.contains("://") {
            Self::Remote(id.to_string())
        } else {
            Self::File(asset_dir.join(id))
        }
    }
}

/// Outcome of a batch load. Failures never abort the rest of the batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully decoded images, in request order.
    pub loaded: Vec<Arc<DecodedImage>>,
    pub failed: Vec<(String, ImageError)>,
}

/// Preloaded images keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    images: HashMap<String, Arc<DecodedImage>>,
}

impl ImageCache {
    pub fn from_report(report: &LoadReport) -> Self {
        let images = report
            .loaded
            .iter()
            .map(|img| (img.id.clone(), Arc::clone(img)))
            .collect();
        Self { images }
    }

    /// Returns `None` for identifiers that were never preloaded.
    pub fn get(&self, id: &str) -> Option<Arc<DecodedImage>> {
        self.images.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.images.contains_key(id)
    }

    pub fn insert(&mut self, image: Arc<DecodedImage>) {
        self.images.insert(image.id.clone(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

pub struct ImageLoader {
    asset_dir: PathBuf,
    client: reqwest::Client,
    max_in_flight: usize,
}

impl ImageLoader {
    pub fn new(asset_dir: impl Into<PathBuf>, settings: &LoaderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(settings.fetch_timeout)
            .build()
            .context("failed to build image fetch client")?;
        Ok(Self {
            asset_dir: asset_dir.into(),
            client,
            max_in_flight: settings.max_concurrent_decodes.max(1),
        })
    }

    /// Resolves and decodes every identifier, at most `max_in_flight` at a time.
    pub async fn load_batch(&self, ids: &[String]) -> LoadReport {
        let mut slots: Vec<Option<Result<DecodedImage, ImageError>>> =
            (0..ids.len()).map(|_| None).collect();
        let mut tasks: JoinSet<(usize, Result<DecodedImage, ImageError>)> = JoinSet::new();
        let mut next = 0;

        loop {
            while next < ids.len() && tasks.len() < self.max_in_flight {
                let id = ids[next].clone();
                let source = ImageSource::resolve(&self.asset_dir, &id);
                let client = self.client.clone();
                let index = next;
                tasks.spawn(async move { (index, load_one(client, id, source).await) });
                next += 1;
            }
            match tasks.join_next().await {
                Some(Ok((index, result))) => slots[index] = Some(result),
                Some(Err(err)) => warn!(error = %err, "image load task aborted"),
                None => break,
            }
        }

        let mut report = LoadReport::default();
        for (id, slot) in ids.iter().zip(slots) {
            match slot {
                Some(Ok(image)) => {
                    debug!(image = %id, width = image.width, height = image.height, "image loaded");
                    report.loaded.push(Arc::new(image));
                }
                Some(Err(err)) => {
                    warn!(image = %id, error = %err, "failed to load image");
                    report.failed.push((id.clone(), err));
                }
                None => {
                    let err = ImageError::Join("task did not report a result".into());
                    warn!(image = %id, error = %err, "failed to load image");
                    report.failed.push((id.clone(), err));
                }
            }
        }
        info!(
            requested = ids.len(),
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "image batch complete"
        );
        report
    }

    /// Loads each distinct identifier once and serves the results from memory.
    pub async fn preload<'a, I>(&self, ids: I) -> ImageCache
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            if seen.insert(id.as_str()) {
                unique.push(id.clone());
            }
        }
        debug!(unique = unique.len(), "preloading images");
        ImageCache::from_report(&self.load_batch(&unique).await)
    }
}

async fn load_one(
    client: reqwest::Client,
    id: String,
    source: ImageSource,
) -> Result<DecodedImage, ImageError> {
    let bytes = match source {
        ImageSource::Remote(url) => fetch(&client, &url).await?,
        ImageSource::File(path) => tokio::task::spawn_blocking(move || read_file(&path))
            .await
            .map_err(|err| ImageError::Join(err.to_string()))??,
    };
    let rgba = tokio::task::spawn_blocking(move || decode_rgba8_apply_exif(&bytes))
        .await
        .map_err(|err| ImageError::Join(err.to_string()))??;
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        id,
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, ImageError> {
    let fetch_err = |reason: String| ImageError::Fetch {
        url: url.to_string(),
        reason,
    };
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| fetch_err(err.to_string()))?;
    if !response.status().is_success() {
        return Err(fetch_err(format!("HTTP status: {}", response.status())));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| fetch_err(err.to_string()))?;
    Ok(bytes.to_vec())
}

fn read_file(path: &Path) -> Result<Vec<u8>, ImageError> {
    std::fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ImageError::NotFound(path.to_path_buf()),
        _ => ImageError::Io(err),
    })
}

// Orientation handling is best-effort; images without EXIF keep their stored orientation.
fn decode_rgba8_apply_exif(bytes: &[u8]) -> Result<image::RgbaImage, ImageError> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let orientation = read_orientation(bytes).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0).map(|v| v as u16)
}

fn apply_orientation(img: image::RgbaImage, orientation: u16) -> image::RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}
