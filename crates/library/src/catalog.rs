//! The imported library: photos, events, faces and places, cross-referenced.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use iphoto_storage::backend::BoxSyncRead;
use iphoto_storage::{BackendHandle, FileInfo};
use std::collections::HashMap;
use std::path::Path;
use time::OffsetDateTime;

macro_rules! key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub i64);
        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

key!(
    /// Identifies a [`Photo`] (the database's version id).
    PhotoKey
);
key!(
    /// Identifies an [`Event`]. Key `0` means "no event".
    EventKey
);
key!(FaceKey);
key!(
    /// Identifies a [`Place`]. Key `0` means "no place".
    PlaceKey
);

impl EventKey {
    pub const NONE: Self = Self(0);
}
impl PlaceKey {
    pub const NONE: Self = Self(0);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    /// Path of the master file, relative to `Masters/` (and `Thumbnails/`).
    pub path: String,
    /// Capture time.
    pub date: OffsetDateTime,
    pub file_size: u64,
    pub file_name: String,
    /// Display name, empty if never set.
    pub name: String,
    /// IPTC caption, empty if never set.
    pub desc: String,
    pub rating: i64,
    pub hidden: bool,
    pub flagged: bool,
    pub original: bool,
    pub in_trash: bool,
    pub event: EventKey,
    pub place: PlaceKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub min_date: OffsetDateTime,
    pub max_date: OffsetDateTime,
    pub hidden: bool,
    pub favorite: bool,
    pub in_trash: bool,
}

/// Someone (or something) featured in photos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub name: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}
impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.lat + other.lat) / 2.0, (self.lon + other.lon) / 2.0)
    }
}

/// Where photos were taken: a named bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub min: LatLon,
    pub max: LatLon,
    pub centroid: LatLon,
}

/// Everything read from the library database, before it is tied to a
/// backend.
#[derive(Debug, Default)]
pub(crate) struct Records {
    pub(crate) photos: HashMap<PhotoKey, Photo>,
    pub(crate) events: HashMap<EventKey, Event>,
    pub(crate) faces: HashMap<FaceKey, Face>,
    pub(crate) places: HashMap<PlaceKey, Place>,
    pub(crate) event_photos: HashMap<EventKey, Vec<PhotoKey>>,
    pub(crate) place_photos: HashMap<PlaceKey, Vec<PhotoKey>>,
    pub(crate) face_photos: HashMap<FaceKey, Vec<PhotoKey>>,
    pub(crate) photo_faces: HashMap<PhotoKey, Vec<FaceKey>>,
    pub(crate) chronological: Vec<PhotoKey>,
}
impl Records {
    pub(crate) fn add_photo(&mut self, key: PhotoKey, photo: Photo) {
        self.event_photos.entry(photo.event).or_default().push(key);
        self.place_photos.entry(photo.place).or_default().push(key);
        self.chronological.push(key);
        self.photos.insert(key, photo);
    }

    pub(crate) fn add_face_photo(&mut self, face: FaceKey, photo: PhotoKey) {
        self.face_photos.entry(face).or_default().push(photo);
        self.photo_faces.entry(photo).or_default().push(face);
    }
}

/// An imported library.
///
/// The catalog keeps the storage backend it was read from, so media can be
/// opened for as long as the catalog lives. Dropping the catalog (or calling
/// [`close()`](Self::close)) releases the backend.
///
/// Index lookups for keys that have no entry return an empty slice.
pub struct Catalog {
    records: Records,
    backend: BackendHandle,
}
impl Catalog {
    pub(crate) fn new(records: Records, backend: BackendHandle) -> Self {
        Self { records, backend }
    }

    pub fn photos(&self) -> &HashMap<PhotoKey, Photo> {
        &self.records.photos
    }

    pub fn events(&self) -> &HashMap<EventKey, Event> {
        &self.records.events
    }

    pub fn faces(&self) -> &HashMap<FaceKey, Face> {
        &self.records.faces
    }

    pub fn places(&self) -> &HashMap<PlaceKey, Place> {
        &self.records.places
    }

    pub fn photo(&self, key: PhotoKey) -> Option<&Photo> {
        self.records.photos.get(&key)
    }

    pub fn event(&self, key: EventKey) -> Option<&Event> {
        self.records.events.get(&key)
    }

    pub fn face(&self, key: FaceKey) -> Option<&Face> {
        self.records.faces.get(&key)
    }

    pub fn place(&self, key: PlaceKey) -> Option<&Place> {
        self.records.places.get(&key)
    }

    /// Photos of an event, in capture order. Photos without an event are
    /// listed under [`EventKey::NONE`].
    pub fn event_photos(&self, key: EventKey) -> &[PhotoKey] {
        self.records.event_photos.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Photos taken at a place, in capture order. Photos without a place are
    /// listed under [`PlaceKey::NONE`].
    pub fn place_photos(&self, key: PlaceKey) -> &[PhotoKey] {
        self.records.place_photos.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn face_photos(&self, key: FaceKey) -> &[PhotoKey] {
        self.records.face_photos.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn photo_faces(&self, key: PhotoKey) -> &[FaceKey] {
        self.records.photo_faces.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every photo key, oldest capture first.
    pub fn chronological(&self) -> &[PhotoKey] {
        &self.records.chronological
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Media accessors for one photo, or `None` if the key is unknown.
    pub fn media(&self, key: PhotoKey) -> Option<Media<'_>> {
        let photo = self.records.photos.get(&key)?;
        Some(Media { key, photo, backend: &self.backend })
    }

    /// Release the storage backend. Calling this more than once is harmless,
    /// but media can no longer be opened afterwards.
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await.map_err(ErrorKind::storage)
    }
}

/// Files belonging to a single photo, read through the catalog's backend.
#[derive(Clone, Copy)]
pub struct Media<'a> {
    key: PhotoKey,
    photo: &'a Photo,
    backend: &'a BackendHandle,
}
impl Media<'_> {
    pub fn key(&self) -> PhotoKey {
        self.key
    }

    pub fn photo(&self) -> &Photo {
        self.photo
    }

    /// Metadata for the photo's own path, relative to the library root.
    pub async fn stat(&self) -> Result<FileInfo> {
        self.backend.stat(Path::new(&self.photo.path)).await.map_err(ErrorKind::storage)
    }

    /// Open the master (original) file.
    pub async fn open(&self) -> Result<BoxSyncRead> {
        self.read("Masters").await
    }

    /// Open the thumbnail.
    pub async fn open_thumb(&self) -> Result<BoxSyncRead> {
        self.read("Thumbnails").await
    }

    async fn read(&self, directory: &str) -> Result<BoxSyncRead> {
        let path = format!("{directory}/{}", self.photo.path);
        self.backend.open(Path::new(&path)).await.map_err(ErrorKind::storage)
    }
}
