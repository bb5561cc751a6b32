//! Offline catalog generator.
//!
//! Scans a local checkout of the photos directory and writes `photos.json`,
//! the listing the static gallery front end reads:
//!
//! ```text
//! {
//!   "home":        [ { "filename", "thumbnail", "date", "exif" }, ... ],
//!   "collections": { "trip": [ ... ], ... }
//! }
//! ```
//!
//! Photos directly under the root go to `home`; photos in a subfolder belong
//! to the collection named after the first folder level. Missing thumbnails
//! are generated under `{root}/thumbnails[/{collection}]`.

pub mod metadata;
pub mod thumbnail;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CatalogError;

pub use metadata::{date_taken, scan_header_date, PhotoMeta};
pub use thumbnail::{write_thumbnail, ThumbnailOptions};

/// Folder holding generated thumbnails, skipped while scanning.
pub const THUMBNAIL_DIR: &str = "thumbnails";

/// File extensions treated as photos (compared case-insensitively).
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// One photo in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoEntry {
    /// Path relative to the photos root, `/`-separated
    pub filename: String,
    /// Thumbnail path relative to the photos root
    pub thumbnail: String,
    /// Date taken in Exif layout
    pub date: String,
    pub exif: PhotoMeta,
}

/// The full listing written to `photos.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub home: Vec<PhotoEntry>,
    pub collections: BTreeMap<String, Vec<PhotoEntry>>,
}

impl Catalog {
    /// Total number of photos.
    pub fn len(&self) -> usize {
        self.home.len() + self.collections.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort every list newest first.
    fn sort(&mut self) {
        let newest_first = |a: &PhotoEntry, b: &PhotoEntry| b.date.cmp(&a.date);
        self.home.sort_by(newest_first);
        for photos in self.collections.values_mut() {
            photos.sort_by(newest_first);
        }
    }
}

/// Catalog generator settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOptions {
    pub thumbnails: ThumbnailOptions,
    /// Skip thumbnail generation entirely
    pub skip_thumbnails: bool,
}

/// Whether `path` has a photo extension.
pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Recursively list photo files under `root`, skipping thumbnail folders.
pub fn scan_photos(root: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let mut photos = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| CatalogError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| CatalogError::io(&path, e))?;

            if file_type.is_dir() {
                if entry.file_name() != THUMBNAIL_DIR {
                    pending.push(path);
                }
            } else if file_type.is_file() && is_photo(&path) {
                photos.push(path);
            }
        }
    }

    photos.sort();
    Ok(photos)
}

/// Build the catalog for the photos directory at `root`.
///
/// A photo that cannot be read is logged and skipped; a thumbnail that
/// cannot be generated is logged and the photo is still listed.
pub fn build_catalog(root: &Path, options: &CatalogOptions) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::default();

    for path in scan_photos(root)? {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some((name, folders)) = parts.split_last() else {
            continue;
        };
        let collection = folders.first().cloned();

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable photo");
                continue;
            }
        };

        let thumbnail = match &collection {
            Some(collection) => format!("{}/{}/{}", THUMBNAIL_DIR, collection, name),
            None => format!("{}/{}", THUMBNAIL_DIR, name),
        };
        let thumbnail_path = root.join(&thumbnail);

        if !options.skip_thumbnails && !thumbnail_path.exists() {
            match write_thumbnail(&data, &path, &thumbnail_path, options.thumbnails) {
                Ok(()) => info!(thumbnail = %thumbnail, "Generated thumbnail"),
                Err(e) => warn!(path = %path.display(), error = %e, "Thumbnail generation failed"),
            }
        }

        let exif = PhotoMeta::from_image(&data);
        let date = date_taken(&exif, &data, &path);
        debug!(photo = %relative.display(), date = %date, "Cataloged photo");

        let entry = PhotoEntry {
            filename: parts.join("/"),
            thumbnail,
            date,
            exif,
        };

        match collection {
            Some(collection) => catalog.collections.entry(collection).or_default().push(entry),
            None => catalog.home.push(entry),
        }
    }

    catalog.sort();
    Ok(catalog)
}

/// Write `catalog` as pretty-printed JSON.
pub fn write_catalog(catalog: &Catalog, output: &Path) -> Result<(), CatalogError> {
    let json =
        serde_json::to_string_pretty(catalog).map_err(|e| CatalogError::Serialize(e.to_string()))?;
    fs::write(output, json).map_err(|e| CatalogError::io(output, e))
}
