// Submission validation and the sequential upload loop. No prompts and
// no client construction happen in here: `validate` runs before any
// network object exists, and `run_batch` works against the `UploadService`
// trait so tests can drive it with a stub.

use crate::api::{ApiClient, UploadedFile};
use crate::config::Settings;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File extensions the remote service accepts, matched case-insensitively.
pub const SUPPORTED_FORMATS: &[&str] = &["svs", "tiff", "tif", "ndpi", "jpg", "png", "jpeg", "zip"];

/// A validated form submission: the parsed project id and the directory
/// to scan. Produced by `validate`, consumed by the upload flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub project_id: i64,
    pub directory: PathBuf,
}

/// Check the six form fields before anything touches the network.
/// Returns the error message the form shows verbatim.
pub fn validate(settings: &Settings) -> Result<Submission> {
    let all_filled = !settings.host.trim().is_empty()
        && !settings.upload_host.trim().is_empty()
        && !settings.public_key.trim().is_empty()
        && !settings.private_key.trim().is_empty()
        && !settings.project_id.trim().is_empty()
        && !settings.directory_path.trim().is_empty();
    if !all_filled {
        anyhow::bail!("Please fill in all fields and select a directory.");
    }

    let project_id: i64 = settings
        .project_id
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Project ID must be a number."))?;

    let directory = PathBuf::from(settings.directory_path.trim());
    if !directory.is_dir() {
        anyhow::bail!("Selected directory does not exist. Please check the path.");
    }

    Ok(Submission {
        project_id,
        directory,
    })
}

/// Regular files directly inside `dir` whose extension is one of
/// `SUPPORTED_FORMATS`. Sorted by path so batches run in a stable order.
pub fn supported_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(OsStr::to_str)
            .map_or(false, |ext| {
                SUPPORTED_FORMATS.iter().any(|s| s.eq_ignore_ascii_case(ext))
            });
        if recognized {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The per-file upload call the batch loop needs from a client. The
/// real implementation is `ApiClient`; tests substitute a stub.
pub trait UploadService {
    fn upload_image(&self, path: &Path, storage_id: i64, project_id: i64) -> Result<UploadedFile>;
}

impl UploadService for ApiClient {
    fn upload_image(&self, path: &Path, storage_id: i64, project_id: i64) -> Result<UploadedFile> {
        ApiClient::upload_image(self, path, storage_id, project_id)
    }
}

/// Outcome of one batch. `attempted` always equals the number of files
/// handed in; failures never stop the queue.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub uploaded: usize,
    pub failures: Vec<(String, String)>,
}

/// Upload every file in order, one blocking call at a time. Each file's
/// outcome is printed and logged; a failure is recorded and the loop
/// moves on to the next file.
pub fn run_batch<S: UploadService>(
    service: &S,
    files: &[PathBuf],
    storage_id: i64,
    project_id: i64,
) -> BatchReport {
    let mut report = BatchReport::default();

    let bar = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    for path in files {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("(unnamed)")
            .to_string();
        report.attempted += 1;
        bar.set_message(name.clone());
        bar.println(format!("Uploading: {}...", name));

        match service.upload_image(path, storage_id, project_id) {
            Ok(uploaded) => {
                report.uploaded += 1;
                info!(file = %name, id = %uploaded.id, "uploaded");
                bar.println(format!("Uploaded {} successfully. ID: {}", name, uploaded.id));
            }
            Err(e) => {
                warn!(file = %name, error = %e, "upload failed");
                bar.println(format!("Error uploading {}: {:#}", name, e));
                report.failures.push((name, format!("{:#}", e)));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;

    fn filled_settings(dir: &Path) -> Settings {
        Settings {
            host: "https://ims.example.org".into(),
            upload_host: "https://upload.example.org".into(),
            public_key: "pub".into(),
            private_key: "priv".into(),
            project_id: "7".into(),
            directory_path: dir.to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn validate_accepts_a_complete_submission() {
        let dir = tempfile::tempdir().expect("tempdir");
        let submission = validate(&filled_settings(dir.path())).expect("valid");
        assert_eq!(submission.project_id, 7);
        assert_eq!(submission.directory, dir.path());
    }

    #[test]
    fn validate_rejects_any_blank_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = filled_settings(dir.path());

        let blank_each: Vec<Settings> = vec![
            Settings { host: "".into(), ..base.clone() },
            Settings { upload_host: "".into(), ..base.clone() },
            Settings { public_key: "  ".into(), ..base.clone() },
            Settings { private_key: "".into(), ..base.clone() },
            Settings { project_id: "".into(), ..base.clone() },
            Settings { directory_path: "".into(), ..base.clone() },
        ];
        for settings in blank_each {
            assert!(validate(&settings).is_err(), "blank field accepted: {:?}", settings);
        }
    }

    #[test]
    fn validate_rejects_nonexistent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = filled_settings(dir.path());
        settings.directory_path = dir
            .path()
            .join("no-such-subdir")
            .to_string_lossy()
            .into_owned();
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn validate_rejects_non_numeric_project_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = filled_settings(dir.path());
        settings.project_id = "forty-two".into();
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn supported_images_counts_only_recognized_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["a.svs", "b.TIFF", "c.ndpi", "d.Jpg"] {
            fs::write(dir.path().join(name), b"img").expect("write");
        }
        for name in ["notes.txt", "slide.mrxs", "README"] {
            fs::write(dir.path().join(name), b"other").expect("write");
        }
        fs::create_dir(dir.path().join("nested.png")).expect("mkdir");

        let files = supported_images(dir.path()).expect("scan");
        assert_eq!(files.len(), 4);
    }

    struct ScriptedService {
        // file names that should fail to upload
        fail_on: Vec<String>,
        calls: RefCell<Vec<String>>,
    }

    impl UploadService for ScriptedService {
        fn upload_image(&self, path: &Path, _storage: i64, _project: i64) -> Result<UploadedFile> {
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            self.calls.borrow_mut().push(name.clone());
            if self.fail_on.contains(&name) {
                anyhow::bail!("simulated server rejection");
            }
            Ok(UploadedFile {
                id: serde_json::json!(1234),
            })
        }
    }

    #[test]
    fn run_batch_attempts_every_file_once() {
        let files: Vec<PathBuf> = ["x.svs", "y.png", "z.zip"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let service = ScriptedService {
            fail_on: vec![],
            calls: RefCell::new(vec![]),
        };
        let report = run_batch(&service, &files, 1, 2);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.uploaded, 3);
        assert_eq!(service.calls.borrow().len(), 3);
    }

    #[test]
    fn one_failed_upload_does_not_stop_the_batch() {
        let files: Vec<PathBuf> = ["x.svs", "y.png", "z.zip"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let service = ScriptedService {
            fail_on: vec!["y.png".into()],
            calls: RefCell::new(vec![]),
        };
        let report = run_batch(&service, &files, 1, 2);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "y.png");
        assert_eq!(*service.calls.borrow(), vec!["x.svs", "y.png", "z.zip"]);
    }
}
