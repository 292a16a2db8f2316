// API client module: a small blocking HTTP client that talks to the
// image-management service. It covers exactly the calls the upload form
// needs (who am I, does the project exist, which storage is mine, upload
// one file) and nothing else. Request signing is the server's concern;
// the keys travel as headers on every call.

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// Holds a reqwest blocking client, the two service endpoints and the
/// credential pair used on every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    host: String,
    upload_host: String,
    public_key: String,
    private_key: String,
}

/// The authenticated account, as returned by the current-user endpoint.
#[derive(Deserialize, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Project {
    pub id: i64,
    pub name: Option<String>,
}

/// A storage target. `user` is the id of the account that owns it; the
/// uploader always picks the storage owned by the authenticated user.
#[derive(Deserialize, Debug, Clone)]
pub struct Storage {
    pub id: i64,
    pub user: i64,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StorageCollection {
    collection: Vec<Storage>,
}

/// Response for a completed upload. The id is kept as a
/// `serde_json::Value` because the upload endpoint is looser about types
/// than the REST API; keeping it flexible avoids parsing failures after
/// the bytes are already on the server.
#[derive(Deserialize, Debug)]
pub struct UploadedFile {
    pub id: serde_json::Value,
}

impl ApiClient {
    /// Build a client for the given endpoints. Trailing slashes are
    /// stripped so URL formatting stays uniform.
    pub fn new(host: &str, upload_host: &str, public_key: &str, private_key: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            host: host.trim_end_matches('/').to_string(),
            upload_host: upload_host.trim_end_matches('/').to_string(),
            public_key: public_key.to_string(),
            private_key: private_key.to_string(),
        })
    }

    /// Credential headers attached to every request.
    fn key_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Api-Public-Key",
            HeaderValue::from_str(&self.public_key).context("Public key is not a valid header value")?,
        );
        headers.insert(
            "X-Api-Private-Key",
            HeaderValue::from_str(&self.private_key).context("Private key is not a valid header value")?,
        );
        Ok(headers)
    }

    /// Fetch the authenticated account. This is the first call the form
    /// makes, so a bad host or key pair fails here before anything else.
    pub fn current_user(&self) -> Result<CurrentUser> {
        let url = format!("{}/api/user/current.json", &self.host);
        let res = self
            .client
            .get(&url)
            .headers(self.key_headers()?)
            .send()
            .context("Failed to reach the server")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Authentication failed: {} - {}", status, txt);
        }
        let user: CurrentUser = res.json().context("Parsing current user json")?;
        Ok(user)
    }

    /// Fetch a project by id. A 404 comes back as an error with the
    /// server's status line, which the form turns into "project not
    /// found".
    pub fn fetch_project(&self, id: i64) -> Result<Project> {
        let url = format!("{}/api/project/{}.json", &self.host, id);
        let res = self
            .client
            .get(&url)
            .headers(self.key_headers()?)
            .send()
            .context("Failed to send project request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Project lookup failed: {} - {}", status, txt);
        }
        let project: Project = res.json().context("Parsing project json")?;
        Ok(project)
    }

    /// List every storage visible to the authenticated user.
    pub fn storages(&self) -> Result<Vec<Storage>> {
        let url = format!("{}/api/storage.json", &self.host);
        let res = self
            .client
            .get(&url)
            .headers(self.key_headers()?)
            .send()
            .context("Failed to send storage request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Storage lookup failed: {} - {}", status, txt);
        }
        let storages: StorageCollection = res.json().context("Parsing storage json")?;
        Ok(storages.collection)
    }

    /// Resolve the storage owned by the authenticated user, if any.
    pub fn my_storage(&self) -> Result<Option<Storage>> {
        let me = self.current_user()?;
        let storages = self.storages()?;
        Ok(storages.into_iter().find(|s| s.user == me.id))
    }

    /// Upload a single image to the upload endpoint using
    /// multipart/form-data. Blocks until the server has ingested the
    /// file and answered.
    pub fn upload_image(
        &self,
        file_path: &Path,
        storage_id: i64,
        project_id: i64,
    ) -> Result<UploadedFile> {
        let url = format!(
            "{}/upload?idStorage={}&idProject={}",
            &self.upload_host, storage_id, project_id
        );

        let file = File::open(file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;
        let file_name = file_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();

        let part = multipart::Part::reader(file)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .context("Building multipart body")?;
        let form = multipart::Form::new().part("files[]", part);

        let res = self
            .client
            .post(&url)
            .headers(self.key_headers()?)
            .multipart(form)
            .send()
            .context("Failed to send upload request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Upload failed: {} - {}", status, txt);
        }
        let uploaded: UploadedFile = res.json().context("Parsing upload response json")?;
        Ok(uploaded)
    }
}
