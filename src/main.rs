//! iphoto - inspect iPhoto libraries, unpacked or zipped.
//!
//! Every input is opened on its own: a library that fails to open is
//! reported and skipped, and the exit status says whether any failed.

use clap::{Parser, Subcommand};
use exn::ResultExt;
use futures::{StreamExt, TryStreamExt};
use iphoto_config::Config;
use iphoto_library::error::{Error, ErrorKind, Result};
use iphoto_library::{Media, Options};
use iphoto_storage::backend::ArchiveBackend;
use iphoto_storage::error::ErrorKind as StorageErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "iphoto", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count photos, events, faces and places.
    Stats {
        /// Library directories or zip files.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List photos oldest first, with their event and media size.
    List {
        /// Library directories or zip files.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Measure thumbnails instead of masters.
        #[arg(long)]
        thumbs: bool,
    },
    /// List the symbolic links stored in zip files.
    Links {
        /// Zip files.
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = ?err, "Failed to load configuration");
            return ExitCode::FAILURE;
        },
    };
    let options = Options { staging_dir: config.staging_dir.clone() };

    let mut failed = 0;
    match &cli.command {
        Command::Stats { paths } => {
            for path in paths {
                if let Err(err) = stats(path, &options).await {
                    failed += 1;
                    tracing::error!(library = %path.display(), error = ?err, "Skipping library");
                }
            }
        },
        Command::List { paths, thumbs } => {
            for path in paths {
                if let Err(err) = list(path, &options, *thumbs, config.concurrency).await {
                    failed += 1;
                    tracing::error!(library = %path.display(), error = ?err, "Skipping library");
                }
            }
        },
        Command::Links { archives } => {
            for archive in archives {
                if let Err(err) = links(archive).await {
                    failed += 1;
                    tracing::error!(archive = %archive.display(), error = ?err, "Skipping archive");
                }
            }
        },
    }
    if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

async fn stats(path: &Path, options: &Options) -> Result<()> {
    let catalog = iphoto_library::open_with(path, options).await?;
    println!(
        "{}: {} photos, {} events, {} faces, {} places",
        path.display(),
        catalog.photos().len(),
        catalog.events().len(),
        catalog.faces().len(),
        catalog.places().len()
    );
    catalog.close().await
}

async fn list(path: &Path, options: &Options, thumbs: bool, concurrency: usize) -> Result<()> {
    let catalog = iphoto_library::open_with(path, options).await?;
    let mut sizes = futures::stream::iter(catalog.chronological().iter().filter_map(|key| catalog.media(*key)))
        .map(|media| async move { Ok::<_, Error>((media, media_size(media, thumbs).await?)) })
        .buffered(concurrency);
    while let Some((media, size)) = sizes.try_next().await? {
        let photo = media.photo();
        let event = catalog.event(photo.event).map_or("", |event| event.name.as_str());
        println!("{}\t{}\t{}\t{}", photo.date, event, size, photo.path);
    }
    drop(sizes);
    catalog.close().await
}

/// Byte length of a photo's master (or thumbnail), read through the backend.
async fn media_size(media: Media<'_>, thumbs: bool) -> Result<u64> {
    let mut reader = if thumbs { media.open_thumb().await? } else { media.open().await? };
    tokio::task::spawn_blocking(move || std::io::copy(&mut reader, &mut std::io::sink()))
        .await
        .or_raise(|| ErrorKind::Storage)?
        .or_raise(|| ErrorKind::Storage)
}

async fn links(archive: &Path) -> iphoto_storage::error::Result<()> {
    let name = archive.file_name().map_or_else(|| archive.to_string_lossy(), |name| name.to_string_lossy()).into_owned();
    let path = archive.to_path_buf();
    let backend = tokio::task::spawn_blocking(move || ArchiveBackend::new(name, path))
        .await
        .or_raise(|| StorageErrorKind::BackendError("archive task failed".to_string()))??;
    for (entry, target) in backend.symlinks().await? {
        println!("{}: {entry} -> {target}", archive.display());
    }
    Ok(())
}
