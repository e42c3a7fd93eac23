//! Archive expansion for toolchain artifacts
//!
//! Handles plain and gzip-compressed tarballs. Release archives wrap their
//! payload in one top-level directory, which callers strip with
//! `strip_components`.

use crate::error::{ScarbError, ScarbResult};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Expand `artifact` into `dest`, dropping the first `strip_components`
/// path components of every entry.
pub fn extract(artifact: &Path, dest: &Path, strip_components: usize) -> ScarbResult<()> {
    let mut file = File::open(artifact).map_err(|e| ScarbError::archive(artifact, e))?;

    let mut magic = [0u8; 2];
    let gzipped = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(ScarbError::archive(artifact, e)),
    };
    file.seek(SeekFrom::Start(0))
        .map_err(|e| ScarbError::archive(artifact, e))?;

    fs::create_dir_all(dest)
        .map_err(|e| ScarbError::io(format!("creating {}", dest.display()), e))?;

    let reader = BufReader::new(file);
    if gzipped {
        unpack(Archive::new(GzDecoder::new(reader)), artifact, dest, strip_components)
    } else {
        unpack(Archive::new(reader), artifact, dest, strip_components)
    }
}

/// Extract on a blocking thread
pub async fn extract_async(
    artifact: PathBuf,
    dest: PathBuf,
    strip_components: usize,
) -> ScarbResult<()> {
    tokio::task::spawn_blocking(move || extract(&artifact, &dest, strip_components)).await?
}

fn unpack<R: Read>(
    mut archive: Archive<R>,
    artifact: &Path,
    dest: &Path,
    strip_components: usize,
) -> ScarbResult<()> {
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let entries = archive
        .entries()
        .map_err(|e| ScarbError::archive(artifact, e))?;

    let mut count = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| ScarbError::archive(artifact, e))?;
        let raw = entry
            .path()
            .map_err(|e| ScarbError::archive(artifact, e))?
            .into_owned();

        let Some(relative) = stripped_path(&raw, strip_components)? else {
            continue;
        };

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ScarbError::io(format!("creating {}", parent.display()), e))?;
        }
        entry
            .unpack(&target)
            .map_err(|e| ScarbError::archive(artifact, e))?;
        count += 1;
    }

    debug!("Expanded {} entries into {}", count, dest.display());
    Ok(())
}

/// Drop leading components; `None` means the entry vanishes entirely
fn stripped_path(raw: &Path, strip_components: usize) -> ScarbResult<Option<PathBuf>> {
    let mut out = PathBuf::new();
    let components = raw
        .components()
        .skip_while(|c| matches!(c, Component::CurDir))
        .skip(strip_components);
    for component in components {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ScarbError::archive_entry(
                    raw.display().to_string(),
                    "path escapes the destination",
                ));
            }
        }
    }

    if raw.is_absolute() {
        return Err(ScarbError::archive_entry(
            raw.display().to_string(),
            "absolute path",
        ));
    }

    Ok(if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    })
}
