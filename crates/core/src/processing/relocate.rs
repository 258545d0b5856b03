//! Moving finished output from an isolated working directory into place.
//!
//! Existing files in the target always win: a file whose name is already
//! taken is left behind (and discarded with the working directory).

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;

/// What happened to each regular file found in the source directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelocationReport {
    pub moved: Vec<String>,
    pub skipped: Vec<String>,
}

/// Move every regular file (not subdirectories) from `src_dir` into
/// `target_dir`, never overwriting.
///
/// Tries an atomic rename first and falls back to copy-then-delete when the
/// two directories are on different filesystems.
pub async fn move_files(src_dir: &Path, target_dir: &Path) -> io::Result<RelocationReport> {
    tokio::fs::create_dir_all(target_dir).await?;

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(src_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name());
        }
    }
    names.sort();

    let mut report = RelocationReport::default();
    for name in names {
        let src = src_dir.join(&name);
        let dst = target_dir.join(&name);
        let display = name.to_string_lossy().into_owned();

        if tokio::fs::try_exists(&dst).await? {
            report.skipped.push(display);
            continue;
        }

        relocate_file(&src, &dst).await?;
        report.moved.push(display);
    }

    Ok(report)
}

async fn relocate_file(src: &Path, dst: &Path) -> io::Result<()> {
    match tokio::fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => copy_then_remove(src, dst).await,
        Err(err) => Err(err),
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

/// Copy `src` into `dst`, then delete `src`.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] if `dst` appeared after the
/// existence check. `src` is only removed once `dst` is complete.
async fn copy_then_remove(src: &Path, dst: &Path) -> io::Result<()> {
    let reader = tokio::fs::File::open(src).await?;
    copy_into_place(reader, dst).await?;
    tokio::fs::remove_file(src).await
}

/// Write `reader` to a hidden sibling of `dst` and publish it under the final
/// name only when fully written. Nothing is left behind on error.
async fn copy_into_place<R: AsyncRead + Unpin>(mut reader: R, dst: &Path) -> io::Result<()> {
    let partial = partial_path(dst);

    let result = async {
        let mut writer = tokio::fs::File::create(&partial).await?;
        tokio::io::copy(&mut reader, &mut writer).await?;
        writer.sync_all().await?;
        drop(writer);
        publish(&partial, dst).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

/// Give `partial` the name `dst` without replacing an existing file.
async fn publish(partial: &Path, dst: &Path) -> io::Result<()> {
    match tokio::fs::hard_link(partial, dst).await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(partial).await;
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(err),
        // Filesystems without hard links (exFAT, some network mounts).
        Err(_) => {
            if tokio::fs::try_exists(dst).await? {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists));
            }
            tokio::fs::rename(partial, dst).await
        }
    }
}

/// `dir/.name.partial` for `dir/name`.
fn partial_path(dst: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dst.file_name().unwrap_or_default());
    name.push(".partial");
    dst.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
