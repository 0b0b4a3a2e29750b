//! reqwest-backed [`MediaDownloader`].

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use media_platform::{
    DownloadRequest, MediaDownloader, MediaError, MediaErrorCategory, classify_http_status,
};
use tokio::{fs, io::AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct HttpMediaDownloader {
    client: reqwest::Client,
}

impl HttpMediaDownloader {
    pub fn new() -> Result<Self, MediaError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                MediaError::new(
                    MediaErrorCategory::Config,
                    "http_client_init_failed",
                    err.to_string(),
                )
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaDownloader for HttpMediaDownloader {
    async fn download(
        &self,
        request: DownloadRequest,
        cancel: CancellationToken,
    ) -> Result<PathBuf, MediaError> {
        let DownloadRequest { url, kind, path } = request;
        debug!(%url, ?kind, path = %path.display(), "starting attachment download");

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::cancelled(&url)),
            response = self.client.get(&url).send() => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::new(
                classify_http_status(status.as_u16()),
                "download_http_status",
                format!("GET {url} returned {status}"),
            ));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(MediaError::storage)?;
        }

        let part_path = part_path(&path);
        match write_body(&mut response, &part_path, &path, &cancel, &url).await {
            Ok(written) => {
                info!(%url, bytes = written, "attachment downloaded");
                Ok(path)
            }
            Err(err) => {
                let _ = fs::remove_file(&part_path).await;
                Err(err)
            }
        }
    }
}

/// Stream the body into `part_path`, then move it to `path`.
async fn write_body(
    response: &mut reqwest::Response,
    part_path: &Path,
    path: &Path,
    cancel: &CancellationToken,
    url: &str,
) -> Result<u64, MediaError> {
    let mut file = fs::File::create(part_path)
        .await
        .map_err(MediaError::storage)?;

    let mut written = 0_u64;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::cancelled(url)),
            chunk = response.chunk() => chunk.map_err(map_reqwest_error)?,
        };
        let Some(chunk) = chunk else {
            break;
        };
        file.write_all(&chunk).await.map_err(MediaError::storage)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(MediaError::storage)?;
    drop(file);
    fs::rename(part_path, path)
        .await
        .map_err(MediaError::storage)?;
    Ok(written)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn map_reqwest_error(err: reqwest::Error) -> MediaError {
    if let Some(status) = err.status() {
        return MediaError::new(
            classify_http_status(status.as_u16()),
            "download_http_status",
            err.to_string(),
        );
    }
    let code = if err.is_timeout() {
        "download_timeout"
    } else {
        "download_transport"
    };
    MediaError::new(MediaErrorCategory::Network, code, err.to_string())
}
