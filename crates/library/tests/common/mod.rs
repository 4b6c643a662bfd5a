//! Fixture libraries, shared by the integration tests and the importer's
//! unit tests.
//!
//! Three photos (keys 100, 101, 102) in two events, one place and two faces;
//! see the SQL scripts in `tests/fixtures/`. Only photo 100 has media.

#![allow(dead_code)]

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

pub const MASTER: &[u8] = b"master jpeg";
pub const THUMBNAIL: &[u8] = b"thumbnail jpeg";
pub const MEDIA_PATH: &str = "2020/06/15/IMG_0001.JPG";

const SCRIPTS: [(&str, &str); 3] = [
    ("Library.apdb", include_str!("../fixtures/Library.sql")),
    ("Properties.apdb", include_str!("../fixtures/Properties.sql")),
    ("Faces.db", include_str!("../fixtures/Faces.sql")),
];

/// Write the library database files (all but `skip`) into `directory`.
pub async fn write_databases(directory: &Path, skip: &[&str]) {
    std::fs::create_dir_all(directory).unwrap();
    for (file, sql) in SCRIPTS.iter().filter(|(file, _)| !skip.contains(file)) {
        let mut conn: SqliteConnection = SqliteConnectOptions::new()
            .filename(directory.join(file))
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::raw_sql(sql).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();
    }
}

/// Build an unpacked library at `root`.
pub async fn write_library(root: &Path, skip: &[&str]) {
    write_databases(&root.join("Database/apdb"), skip).await;
    for (directory, data) in [("Masters", MASTER), ("Thumbnails", THUMBNAIL)] {
        let path = root.join(directory).join(MEDIA_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }
}

/// Files of a library directory as `(slash separated relative path, bytes)`.
pub fn library_files(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                files.push((relative, std::fs::read(&path).unwrap()));
            }
        }
    }
    files.sort();
    files
}

/// Write a zip archive with the given entries.
pub fn write_zip(path: &Path, entries: &[(String, Vec<u8>)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        writer.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// Build a zipped library under `prefix` in a new archive inside `dir`.
///
/// `rename` may rewrite each archive entry name (e.g. to change its case).
pub async fn zipped_library(dir: &Path, prefix: &str, skip: &[&str], rename: fn(&str) -> String) -> PathBuf {
    let unpacked = tempfile::tempdir().unwrap();
    write_library(unpacked.path(), skip).await;
    let entries: Vec<_> = library_files(unpacked.path())
        .into_iter()
        .map(|(name, data)| (rename(&format!("{prefix}{name}")), data))
        .collect();
    let archive = dir.join("library.zip");
    write_zip(&archive, &entries);
    archive
}

pub fn unchanged(name: &str) -> String {
    name.to_string()
}
