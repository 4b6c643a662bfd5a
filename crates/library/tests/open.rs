mod common;

use common::{MASTER, MEDIA_PATH, THUMBNAIL, unchanged, write_library, zipped_library};
use iphoto_library::error::ErrorKind;
use iphoto_library::{Catalog, EventKey, FaceKey, Options, PhotoKey, PlaceKey, open, open_with};
use rstest::rstest;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;

fn read_all(mut reader: iphoto_storage::backend::BoxSyncRead) -> Vec<u8> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data).unwrap();
    data
}

fn staging(dir: &Path) -> Options {
    let staging_dir = dir.join("staging");
    std::fs::create_dir_all(&staging_dir).unwrap();
    Options { staging_dir: Some(staging_dir) }
}

fn assert_staging_empty(options: &Options) {
    let staging_dir = options.staging_dir.as_ref().unwrap();
    assert_eq!(std::fs::read_dir(staging_dir).unwrap().count(), 0);
}

fn assert_fixture_catalog(catalog: &Catalog) {
    assert_eq!(catalog.photos().len(), 3);
    assert_eq!(catalog.events().len(), 2);
    assert_eq!(catalog.places().len(), 1);
    assert_eq!(catalog.faces().len(), 2);
    assert_eq!(catalog.chronological(), &[PhotoKey(102), PhotoKey(100), PhotoKey(101)]);
    assert_eq!(catalog.photo(PhotoKey(100)).unwrap().path, MEDIA_PATH);
}

#[tokio::test]
async fn directory_library() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_library(temp_dir.path(), &[]).await;
    let catalog = open(temp_dir.path()).await.unwrap();
    assert_fixture_catalog(&catalog);

    let media = catalog.media(PhotoKey(100)).unwrap();
    assert_eq!(read_all(media.open().await.unwrap()), MASTER);
    assert_eq!(read_all(media.open_thumb().await.unwrap()), THUMBNAIL);
    // Photo 101 is in the database but has no files.
    let err = catalog.media(PhotoKey(101)).unwrap().open().await.err().unwrap();
    assert!(matches!(&*err, ErrorKind::NotFound(_)));
}

#[rstest]
#[case(&["Faces.db"])]
#[case(&["Library.apdb"])]
#[case(&["Library.apdb", "Properties.apdb", "Faces.db"])]
#[tokio::test]
async fn incomplete_directory_library(#[case] skip: &[&str]) {
    let temp_dir = tempfile::tempdir().unwrap();
    write_library(temp_dir.path(), skip).await;
    let err = open(temp_dir.path()).await.err().unwrap();
    assert!(matches!(&*err, ErrorKind::IncompleteStore(missing) if missing.as_slice() == skip));
}

#[rstest]
#[case("")]
#[case("MyLibrary/")]
#[case("Users/pooh/Pictures/iPhoto Library/")]
#[tokio::test]
async fn zipped_library_at_any_depth(#[case] prefix: &str) {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = zipped_library(temp_dir.path(), prefix, &[], unchanged).await;
    let options = staging(temp_dir.path());
    let catalog = open_with(&archive, &options).await.unwrap();
    assert_fixture_catalog(&catalog);
    assert_staging_empty(&options);
    let media = catalog.media(PhotoKey(100)).unwrap();
    assert_eq!(read_all(media.open().await.unwrap()), MASTER);
    assert_eq!(read_all(media.open_thumb().await.unwrap()), THUMBNAIL);
}

#[tokio::test]
async fn zipped_library_ignores_media_case() {
    fn shout(name: &str) -> String {
        name.replace("Masters", "MASTERS").replace("Thumbnails", "thumbnails").replace("IMG_0001.JPG", "img_0001.jpg")
    }
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = zipped_library(temp_dir.path(), "MyLibrary/", &[], shout).await;
    let catalog = open(&archive).await.unwrap();
    let media = catalog.media(PhotoKey(100)).unwrap();
    assert_eq!(read_all(media.open().await.unwrap()), MASTER);
    assert_eq!(read_all(media.open_thumb().await.unwrap()), THUMBNAIL);
}

#[tokio::test]
async fn zipped_library_missing_database_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = zipped_library(temp_dir.path(), "MyLibrary/", &["Properties.apdb"], unchanged).await;
    let options = staging(temp_dir.path());
    let err = open_with(&archive, &options).await.err().unwrap();
    assert!(matches!(&*err, ErrorKind::IncompleteStore(missing) if missing == &vec!["Properties.apdb"]));
    assert_staging_empty(&options);
}

#[tokio::test]
async fn zip_without_library() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("holiday.zip");
    common::write_zip(&archive, &[("Photos/IMG_0001.JPG".to_string(), MASTER.to_vec())]);
    let err = open(&archive).await.err().unwrap();
    assert!(matches!(&*err, ErrorKind::MarkerNotFound(marker) if marker == "Database/apdb"));
}

#[tokio::test]
async fn failed_import_removes_staging() {
    fn corrupt(name: &str) -> String {
        // Swap two database files, so the queries hit the wrong schemas.
        if name.ends_with("Faces.db") {
            name.replace("Faces.db", "Library.apdb")
        } else if name.ends_with("Library.apdb") {
            name.replace("Library.apdb", "Faces.db")
        } else {
            name.to_string()
        }
    }
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = zipped_library(temp_dir.path(), "MyLibrary/", &[], corrupt).await;
    let options = staging(temp_dir.path());
    let err = open_with(&archive, &options).await.err().unwrap();
    assert!(matches!(&*err, ErrorKind::Import));
    assert_staging_empty(&options);
}

#[tokio::test]
async fn catalog_indices_agree() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_library(temp_dir.path(), &[]).await;
    let catalog = open(temp_dir.path()).await.unwrap();

    for (key, photo) in catalog.photos() {
        assert!(catalog.event_photos(photo.event).contains(key));
        assert!(catalog.place_photos(photo.place).contains(key));
        for face in catalog.photo_faces(*key) {
            assert!(catalog.face_photos(*face).contains(key));
        }
    }
    for key in catalog.events().keys() {
        assert!(catalog.event_photos(*key).iter().all(|photo| catalog.photos()[photo].event == *key));
    }
    assert!(catalog.event(EventKey::NONE).is_none());
    assert!(catalog.place(PlaceKey::NONE).is_none());
    assert_eq!(catalog.face_photos(FaceKey(2)), &[PhotoKey(101)]);
    assert!(catalog.face_photos(FaceKey(42)).is_empty());
}

#[tokio::test]
async fn zero_timestamp_is_store_epoch() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_library(temp_dir.path(), &[]).await;
    let catalog = open(temp_dir.path()).await.unwrap();
    let epoch = OffsetDateTime::from_unix_timestamp(978_307_200).unwrap();
    assert_eq!(catalog.photo(PhotoKey(102)).unwrap().date, epoch);
    assert_eq!(catalog.event(EventKey(11)).unwrap().min_date, epoch);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_media_reads() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = zipped_library(temp_dir.path(), "MyLibrary/", &[], unchanged).await;
    let catalog = Arc::new(open(&archive).await.unwrap());
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move {
                let media = catalog.media(PhotoKey(100)).unwrap();
                let reader = if i % 2 == 0 { media.open().await } else { media.open_thumb().await };
                read_all(reader.unwrap())
            })
        })
        .collect();
    for (i, task) in tasks.into_iter().enumerate() {
        let expected = if i % 2 == 0 { MASTER } else { THUMBNAIL };
        assert_eq!(task.await.unwrap(), expected);
    }
}

#[tokio::test]
async fn closed_catalog_keeps_metadata() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = zipped_library(temp_dir.path(), "", &[], unchanged).await;
    let catalog = open(&archive).await.unwrap();
    catalog.close().await.unwrap();
    catalog.close().await.unwrap();
    assert_fixture_catalog(&catalog);
    let err = catalog.media(PhotoKey(100)).unwrap().open().await.err().unwrap();
    assert!(matches!(&*err, ErrorKind::Storage));
}
