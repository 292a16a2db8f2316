// Slide bundle packer. A bundle is a primary `.mrxs` file plus an
// optional same-stem `.xml` metadata file and an optional same-stem
// folder of tile data, all sitting directly in the base directory. Each
// bundle becomes one archive under `<base>/zip/`.
//
// The staging directory is a `tempfile::TempDir` created inside the base
// directory, so it is removed when the bundle is done no matter which
// step failed.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Extension of the primary file that identifies a bundle.
pub const PRIMARY_EXT: &str = "mrxs";

/// Name of the output directory created under the base directory.
pub const ZIP_DIR: &str = "zip";

/// What a packing run produced. One entry in `failures` per bundle that
/// could not be archived; the run itself only fails on setup errors
/// (unreadable base directory, zip directory creation).
#[derive(Debug, Default)]
pub struct PackSummary {
    pub archives: Vec<PathBuf>,
    pub failures: Vec<(String, String)>,
}

/// Pack every bundle found directly inside `base_dir`. A failing bundle
/// is logged and printed, then the run moves on to the next one.
pub fn pack_slide_bundles(base_dir: &Path) -> Result<PackSummary> {
    let zip_dir = base_dir.join(ZIP_DIR);
    fs::create_dir_all(&zip_dir)
        .with_context(|| format!("Failed to create {}", zip_dir.display()))?;

    info!("started packing slide bundles in {}", base_dir.display());

    let mut primaries = Vec::new();
    for entry in fs::read_dir(base_dir)
        .with_context(|| format!("Failed to read {}", base_dir.display()))?
    {
        let path = entry?.path();
        // Anything named *.mrxs is attempted, directories included; a
        // directory by that name fails during copy and is reported like
        // any other bad bundle.
        let is_primary = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(PRIMARY_EXT));
        if is_primary {
            primaries.push(path);
        }
    }
    primaries.sort();

    let mut summary = PackSummary::default();
    for primary in &primaries {
        let name = primary
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match pack_one_bundle(base_dir, primary, &zip_dir) {
            Ok(archive) => {
                info!("created zip: {}", archive.display());
                println!("Created zip: {}", archive.display());
                summary.archives.push(archive);
            }
            Err(e) => {
                error!("error processing {}: {:#}", name, e);
                eprintln!("Error processing {}: {:#}", name, e);
                summary.failures.push((name, format!("{:#}", e)));
            }
        }
    }
    Ok(summary)
}

/// Stage one bundle's artifacts and compress them into
/// `<zip_dir>/<stem>.zip`. The staging directory lives inside `base_dir`
/// with a recognizable prefix and is deleted on drop.
fn pack_one_bundle(base_dir: &Path, primary: &Path, zip_dir: &Path) -> Result<PathBuf> {
    let stem = primary
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Primary file has no usable name")?
        .to_string();
    let primary_name = primary
        .file_name()
        .and_then(|s| s.to_str())
        .context("Primary file has no usable name")?;

    let staging = tempfile::Builder::new()
        .prefix(&format!("__temp_{}", stem))
        .tempdir_in(base_dir)
        .context("Failed to create staging directory")?;

    fs::copy(primary, staging.path().join(primary_name))
        .with_context(|| format!("Copying {}", primary_name))?;
    info!("copied: {}", primary_name);

    let metadata = base_dir.join(format!("{}.xml", stem));
    if metadata.is_file() {
        let metadata_name = format!("{}.xml", stem);
        fs::copy(&metadata, staging.path().join(&metadata_name))
            .with_context(|| format!("Copying {}", metadata_name))?;
        info!("copied: {}", metadata_name);
    }

    let folder = base_dir.join(&stem);
    if folder.is_dir() {
        copy_tree(&folder, &staging.path().join(&stem))
            .with_context(|| format!("Copying folder {}", stem))?;
        info!("copied folder: {}", stem);
    }

    let archive = zip_dir.join(format!("{}.zip", stem));
    zip_directory(staging.path(), &archive)
        .with_context(|| format!("Compressing {}", archive.display()))?;
    Ok(archive)
}

/// Recursively copy `src` into `dst`, preserving the directory layout.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Copying {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Write the contents of `src` into a new deflate-compressed archive at
/// `dest`, with entry names relative to `src`.
fn zip_directory(src: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest)
        .with_context(|| format!("Creating {}", dest.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default();

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        // zip entry names always use forward slashes
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else {
            writer.start_file(name, options)?;
            let mut f = File::open(entry.path())
                .with_context(|| format!("Reading {}", entry.path().display()))?;
            io::copy(&mut f, &mut writer)?;
        }
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn archive_entries(path: &Path) -> BTreeSet<String> {
        let file = File::open(path).expect("open archive");
        let mut archive = zip::ZipArchive::new(file).expect("read archive");
        (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect()
    }

    #[test]
    fn full_bundle_is_archived_with_all_three_items() {
        let base = tempfile::tempdir().expect("tempdir");
        fs::write(base.path().join("slide01.mrxs"), b"primary").expect("write");
        fs::write(base.path().join("slide01.xml"), b"<meta/>").expect("write");
        let tiles = base.path().join("slide01");
        fs::create_dir(&tiles).expect("mkdir");
        fs::write(tiles.join("Data0000.dat"), b"tile").expect("write");
        fs::write(tiles.join("Index.dat"), b"index").expect("write");

        let summary = pack_slide_bundles(base.path()).expect("pack");
        assert_eq!(summary.archives.len(), 1);
        assert!(summary.failures.is_empty());

        let archive = base.path().join("zip").join("slide01.zip");
        assert!(archive.is_file());
        let entries = archive_entries(&archive);
        assert!(entries.contains("slide01.mrxs"));
        assert!(entries.contains("slide01.xml"));
        assert!(entries.contains("slide01/Data0000.dat"));
        assert!(entries.contains("slide01/Index.dat"));
    }

    #[test]
    fn bare_primary_produces_single_entry_archive() {
        let base = tempfile::tempdir().expect("tempdir");
        fs::write(base.path().join("lonely.mrxs"), b"primary").expect("write");

        let summary = pack_slide_bundles(base.path()).expect("pack");
        assert_eq!(summary.archives.len(), 1);

        let entries = archive_entries(&base.path().join("zip").join("lonely.zip"));
        assert_eq!(entries.len(), 1);
        assert!(entries.contains("lonely.mrxs"));
    }

    #[test]
    fn a_failing_bundle_does_not_stop_the_run() {
        let base = tempfile::tempdir().expect("tempdir");
        fs::write(base.path().join("good_a.mrxs"), b"a").expect("write");
        fs::write(base.path().join("good_b.mrxs"), b"b").expect("write");
        // a directory with a primary name cannot be copied as a file
        fs::create_dir(base.path().join("broken.mrxs")).expect("mkdir");

        let summary = pack_slide_bundles(base.path()).expect("pack");
        assert_eq!(summary.archives.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "broken.mrxs");
        assert!(base.path().join("zip").join("good_a.zip").is_file());
        assert!(base.path().join("zip").join("good_b.zip").is_file());
    }

    #[test]
    fn staging_directories_are_removed_even_when_a_bundle_fails() {
        let base = tempfile::tempdir().expect("tempdir");
        fs::write(base.path().join("ok.mrxs"), b"ok").expect("write");
        fs::create_dir(base.path().join("bad.mrxs")).expect("mkdir");

        pack_slide_bundles(base.path()).expect("pack");

        let leftovers: Vec<_> = fs::read_dir(base.path())
            .expect("read base")
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("__temp_"))
            .collect();
        assert!(leftovers.is_empty(), "staging left behind: {:?}", leftovers);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let base = tempfile::tempdir().expect("tempdir");
        fs::write(base.path().join("SHOUTY.MRXS"), b"primary").expect("write");

        let summary = pack_slide_bundles(base.path()).expect("pack");
        assert_eq!(summary.archives.len(), 1);
        assert!(base.path().join("zip").join("SHOUTY.zip").is_file());
    }
}
