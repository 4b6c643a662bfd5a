//! Rows as read from the library database, and their conversion into
//! catalog entities.
//!
//! Column aliases in the queries match the field names here.

use crate::catalog::{Event, EventKey, Face, LatLon, Photo, Place, PlaceKey};
use crate::error::{Error, ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use time::OffsetDateTime;
use unicode_normalization::{UnicodeNormalization, is_nfc};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, where library
/// timestamps start counting.
pub(crate) const STORE_EPOCH_OFFSET: i64 = 978_307_200;

/// Convert a library timestamp (fractional seconds since 2001) to UTC time.
pub(crate) fn store_timestamp(raw: f64) -> Result<OffsetDateTime> {
    if !raw.is_finite() {
        exn::bail!(ErrorKind::Import);
    }
    let seconds = raw.trunc();
    let nanos = ((raw - seconds) * 1e9) as i128;
    let total = (seconds as i128)
        .checked_add(i128::from(STORE_EPOCH_OFFSET))
        .and_then(|seconds| seconds.checked_mul(1_000_000_000))
        .and_then(|total| total.checked_add(nanos))
        .ok_or_raise(|| ErrorKind::Import)?;
    OffsetDateTime::from_unix_timestamp_nanos(total).or_raise(|| ErrorKind::Import)
}

/// Parse a `"lat,lon"` centroid.
pub(crate) fn parse_centroid(text: &str) -> Option<LatLon> {
    let (lat, lon) = text.split_once(',')?;
    Some(LatLon::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

fn nfc(text: String) -> String {
    if is_nfc(&text) { text } else { text.nfc().collect() }
}

pub(crate) const PHOTOS: &str = r#"
    SELECT
        V.modelId AS id,
        COALESCE((SELECT E.modelId FROM L.RKFolder AS E WHERE E.uuid = V.projectUuid), 0) AS event,
        COALESCE((SELECT Q.placeId FROM L.RKPlaceForVersion AS Q WHERE Q.versionId = V.modelId), 0) AS place,
        M.imagePath AS path,
        CAST(V.imageDate AS REAL) AS date,
        M.fileSize AS file_size,
        V.fileName AS file_name,
        COALESCE(V.name, '') AS name,
        COALESCE((SELECT U.stringProperty FROM P.RKUniqueString AS U
            WHERE U.modelId = (SELECT I.stringId FROM P.RKIptcProperty AS I
                WHERE I.versionId = V.modelId AND I.propertyKey = 'Caption/Abstract')), '') AS description,
        V.mainRating AS rating,
        V.isHidden AS hidden,
        V.isFlagged AS flagged,
        V.isOriginal AS original,
        V.isInTrash AS in_trash
    FROM L.RKVersion AS V
        INNER JOIN L.RKMaster AS M ON V.masterUuid = M.uuid
    ORDER BY V.imageDate
"#;

pub(crate) const EVENTS: &str = r#"
    SELECT
        modelId AS id,
        COALESCE(name, '') AS name,
        CAST(COALESCE(minImageDate, 0) AS REAL) AS min_date,
        CAST(COALESCE(maxImageDate, 0) AS REAL) AS max_date,
        isHidden AS hidden,
        isFavorite AS favorite,
        isInTrash AS in_trash
    FROM L.RKFolder
"#;

pub(crate) const PLACES: &str = r#"
    SELECT
        modelId AS id,
        COALESCE(defaultName, '') AS name,
        CAST(minLatitude AS REAL) AS min_lat,
        CAST(minLongitude AS REAL) AS min_lon,
        CAST(maxLatitude AS REAL) AS max_lat,
        CAST(maxLongitude AS REAL) AS max_lon,
        centroid
    FROM P.RKPlace
"#;

pub(crate) const FACES: &str = r#"
    SELECT
        faceKey AS id,
        COALESCE(name, '') AS name,
        COALESCE(fullName, '') AS full_name,
        COALESCE(email, '') AS email
    FROM F.RKFaceName
"#;

pub(crate) const FACE_PHOTOS: &str = r#"
    SELECT versionId AS photo, faceKey AS face FROM L.RKVersionFaceContent
"#;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PhotoRow {
    pub(crate) id: i64,
    event: i64,
    place: i64,
    path: String,
    /// Never NULL in a healthy library; a photo without one is rejected.
    date: Option<f64>,
    file_size: i64,
    file_name: String,
    name: String,
    description: String,
    rating: i64,
    hidden: i64,
    flagged: i64,
    original: i64,
    in_trash: i64,
}
impl TryFrom<PhotoRow> for Photo {
    type Error = Error;
    fn try_from(row: PhotoRow) -> Result<Self> {
        Ok(Self {
            path: row.path,
            date: store_timestamp(row.date.ok_or_raise(|| ErrorKind::Import)?)?,
            file_size: u64::try_from(row.file_size).or_raise(|| ErrorKind::Import)?,
            file_name: nfc(row.file_name),
            name: nfc(row.name),
            desc: nfc(row.description),
            rating: row.rating,
            hidden: row.hidden != 0,
            flagged: row.flagged != 0,
            original: row.original != 0,
            in_trash: row.in_trash != 0,
            event: EventKey(row.event),
            place: PlaceKey(row.place),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub(crate) id: i64,
    name: String,
    min_date: f64,
    max_date: f64,
    hidden: i64,
    favorite: i64,
    in_trash: i64,
}
impl TryFrom<EventRow> for Event {
    type Error = Error;
    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Self {
            name: nfc(row.name),
            min_date: store_timestamp(row.min_date)?,
            max_date: store_timestamp(row.max_date)?,
            hidden: row.hidden != 0,
            favorite: row.favorite != 0,
            in_trash: row.in_trash != 0,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PlaceRow {
    pub(crate) id: i64,
    name: String,
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
    centroid: Option<String>,
}
impl From<PlaceRow> for Place {
    fn from(row: PlaceRow) -> Self {
        let min = LatLon::new(row.min_lat, row.min_lon);
        let max = LatLon::new(row.max_lat, row.max_lon);
        let centroid = row
            .centroid
            .as_deref()
            .and_then(parse_centroid)
            .unwrap_or_else(|| min.midpoint(max));
        Self { name: nfc(row.name), min, max, centroid }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FaceRow {
    pub(crate) id: i64,
    name: String,
    full_name: String,
    email: String,
}
impl From<FaceRow> for Face {
    fn from(row: FaceRow) -> Self {
        Self {
            name: nfc(row.name),
            full_name: nfc(row.full_name),
            email: nfc(row.email),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FacePhotoRow {
    pub(crate) photo: i64,
    pub(crate) face: i64,
}
