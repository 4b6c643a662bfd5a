//! Relational import of the three library database files.
//!
//! The files are attached to a single in-memory SQLite session as `L`
//! (`Library.apdb`), `P` (`Properties.apdb`) and `F` (`Faces.db`), and five
//! fixed queries are read in order. The first failure aborts the import.

mod rows;

use self::rows::{EventRow, FacePhotoRow, FaceRow, PhotoRow, PlaceRow};
use crate::catalog::{EventKey, FaceKey, PhotoKey, PlaceKey, Records};
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Connection, FromRow, SqliteConnection};
use std::path::Path;
use tracing::instrument;

/// Attached schema name and file name of each library database file.
const ATTACHMENTS: [(&str, &str); 3] = [("L", "Library.apdb"), ("P", "Properties.apdb"), ("F", "Faces.db")];

/// Read the library databases in `directory` into catalog records.
#[instrument(skip_all, fields(directory = %directory.display()))]
pub(crate) async fn import(directory: &Path) -> Result<Records> {
    let mut conn = session().await?;
    let records = read(&mut conn, directory).await;
    // Attached files are only read; nothing is lost if closing fails.
    if let Err(err) = conn.close().await {
        tracing::warn!(error = %err, "Failed to close import session");
    }
    records
}

/// A read-only in-memory session. Attached files inherit its open flags, so
/// the library databases are never written to.
async fn session() -> Result<SqliteConnection> {
    SqliteConnectOptions::new()
        .filename(":memory:")
        .read_only(true)
        .connect()
        .await
        .or_raise(|| ErrorKind::Import)
}

async fn attach(conn: &mut SqliteConnection, directory: &Path) -> Result<()> {
    for (schema, file) in ATTACHMENTS {
        let path = directory.join(file);
        let path = path.to_str().ok_or_raise(|| ErrorKind::Import)?;
        // Schema names can't be bound; they are fixed above.
        sqlx::query(&format!("ATTACH DATABASE ? AS {schema}"))
            .bind(path)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Import)?;
    }
    Ok(())
}

async fn read(conn: &mut SqliteConnection, directory: &Path) -> Result<Records> {
    attach(conn, directory).await?;
    let mut records = Records::default();
    for row in fetch::<PhotoRow>(conn, rows::PHOTOS).await? {
        let key = PhotoKey(row.id);
        records.add_photo(key, row.try_into()?);
    }
    for row in fetch::<EventRow>(conn, rows::EVENTS).await? {
        let key = EventKey(row.id);
        records.events.insert(key, row.try_into()?);
    }
    for row in fetch::<PlaceRow>(conn, rows::PLACES).await? {
        records.places.insert(PlaceKey(row.id), row.into());
    }
    for row in fetch::<FaceRow>(conn, rows::FACES).await? {
        records.faces.insert(FaceKey(row.id), row.into());
    }
    for row in fetch::<FacePhotoRow>(conn, rows::FACE_PHOTOS).await? {
        records.add_face_photo(FaceKey(row.face), PhotoKey(row.photo));
    }
    tracing::debug!(
        photos = records.photos.len(),
        events = records.events.len(),
        places = records.places.len(),
        faces = records.faces.len(),
        "Library database imported"
    );
    Ok(records)
}

async fn fetch<R>(conn: &mut SqliteConnection, sql: &'static str) -> Result<Vec<R>>
where
    R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    sqlx::query_as::<_, R>(sql).fetch_all(&mut *conn).await.or_raise(|| ErrorKind::Import)
}

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
pub(crate) mod fixture;
