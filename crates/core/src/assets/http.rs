//! Stager that downloads, decodes and verifies assets.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::config::FetchConfig;
use super::error::AssetError;
use super::traits::AssetStager;
use crate::concurrency::{
    retry_with_backoff, PoolStatus, RateLimitStatus, RetryConfig, SlidingWindowLimiter, Transient,
    WorkerPool,
};
use crate::metrics;
use crate::scene::{CompositionRequest, MediaSource, SubtitleSource};

/// Download pool and rate limiter occupancy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchStatus {
    pub pool: PoolStatus,
    pub rate_limit: RateLimitStatus,
}

/// Production [`AssetStager`].
///
/// - local paths are checked for existence
/// - `data:` URIs and bare base64 are decoded to files
/// - URLs are downloaded through a bounded pool, a shared rate limiter and
///   exponential backoff
/// - inline subtitle text is written to a file
pub struct HttpAssetStager {
    client: Client,
    config: FetchConfig,
    limiter: Arc<SlidingWindowLimiter>,
    pool: WorkerPool,
}

impl HttpAssetStager {
    pub fn new(config: FetchConfig) -> Result<Self, AssetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AssetError::Client(e.to_string()))?;

        Ok(Self {
            client,
            limiter: Arc::new(SlidingWindowLimiter::per_minute(config.calls_per_minute)),
            pool: WorkerPool::new("fetch", config.max_concurrent),
            config,
        })
    }

    pub async fn status(&self) -> FetchStatus {
        FetchStatus {
            pool: self.pool.status(),
            rate_limit: self.limiter.status().await,
        }
    }

    async fn download_all(
        &self,
        downloads: Vec<(usize, String)>,
        work_dir: &Path,
    ) -> Result<Vec<(usize, PathBuf)>, AssetError> {
        if downloads.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.client.clone();
        let limiter = self.limiter.clone();
        let retry = self.config.retry.clone();
        let dir = work_dir.to_path_buf();

        let results = self
            .pool
            .run(downloads, move |(index, url)| {
                let client = client.clone();
                let limiter = limiter.clone();
                let retry = retry.clone();
                let dir = dir.clone();
                async move {
                    let dest = dir.join(format!("asset_{}.{}", index, url_extension(&url)));
                    download(&client, &limiter, &retry, &url, &dest).await?;
                    Ok::<_, AssetError>((index, dest))
                }
            })
            .await?;
        Ok(results)
    }
}

async fn download(
    client: &Client,
    limiter: &SlidingWindowLimiter,
    retry: &RetryConfig,
    url: &str,
    dest: &Path,
) -> Result<(), AssetError> {
    let parsed = Url::parse(url).map_err(|_| AssetError::InvalidUrl {
        url: url.to_string(),
    })?;

    let bytes = retry_with_backoff(retry, "asset download", |attempt| {
        let parsed = parsed.clone();
        async move {
            limiter.acquire().await;
            debug!(url, attempt, "Fetching asset");
            let result = fetch(client, parsed, url).await;
            let outcome = match &result {
                Ok(_) => "ok",
                Err(e) if e.is_transient() => "transient",
                Err(_) => "failed",
            };
            metrics::FETCH_ATTEMPTS.with_label_values(&[outcome]).inc();
            result
        }
    })
    .await?;

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| AssetError::io(dest, e))?;
    debug!(url, path = %dest.display(), size = bytes.len(), "Asset downloaded");
    Ok(())
}

async fn fetch(client: &Client, url: Url, raw: &str) -> Result<Vec<u8>, AssetError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AssetError::from_reqwest(raw, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AssetError::Status {
            url: raw.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AssetError::from_reqwest(raw, e))?;
    Ok(bytes.to_vec())
}

/// File extension guessed from a URL path, `bin` if there is none.
fn url_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// Decodes a `data:` URI or bare base64 into bytes and a file extension.
pub fn decode_data(data: &str) -> Result<(Vec<u8>, String), AssetError> {
    let data = data.trim();
    let (payload, extension, is_base64) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| AssetError::Decode("data URI has no payload".to_string()))?;
            let mime = header.split(';').next().unwrap_or_default();
            (payload, mime_extension(mime), header.ends_with(";base64"))
        }
        None => (data, "bin".to_string(), true),
    };

    if !is_base64 {
        return Ok((payload.as_bytes().to_vec(), extension));
    }

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| AssetError::Decode(e.to_string()))?;
    Ok((bytes, extension))
}

fn mime_extension(mime: &str) -> String {
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg".to_string(),
        "image/svg+xml" => "svg".to_string(),
        "audio/mpeg" | "audio/mp3" => "mp3".to_string(),
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav".to_string(),
        "text/plain" => "txt".to_string(),
        other => other
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty() && sub.bytes().all(|b| b.is_ascii_alphanumeric()))
            .map(str::to_string)
            .unwrap_or_else(|| "bin".to_string()),
    }
}

/// Name of the file inline subtitles are written to.
fn subtitle_file_name(content: &str) -> &'static str {
    if content.trim_start().starts_with("[Script Info]") {
        "subtitles.ass"
    } else {
        "subtitles.srt"
    }
}

#[async_trait]
impl AssetStager for HttpAssetStager {
    async fn stage(
        &self,
        job_id: &str,
        request: &CompositionRequest,
        work_dir: &Path,
    ) -> Result<CompositionRequest, AssetError> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| AssetError::io(work_dir, e))?;

        let mut staged = request.clone();

        if let Some(spec) = staged.subtitles.as_mut() {
            if let SubtitleSource::Inline(text) = &spec.source {
                if !text.trim().is_empty() {
                    let path = work_dir.join(subtitle_file_name(text));
                    tokio::fs::write(&path, text.as_bytes())
                        .await
                        .map_err(|e| AssetError::io(&path, e))?;
                    spec.source = SubtitleSource::File(MediaSource::Path(path));
                }
            }
        }

        let mut downloads = Vec::new();
        for (index, source) in staged.media_sources_mut().into_iter().enumerate() {
            let decoded = match &*source {
                MediaSource::Path(path) => {
                    if !path.as_os_str().is_empty() && tokio::fs::metadata(path).await.is_err() {
                        return Err(AssetError::Missing { path: path.clone() });
                    }
                    None
                }
                MediaSource::Data(data) if !data.trim().is_empty() => {
                    let (bytes, extension) = decode_data(data)?;
                    let path = work_dir.join(format!("asset_{}.{}", index, extension));
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| AssetError::io(&path, e))?;
                    Some(path)
                }
                MediaSource::Data(_) => None,
                MediaSource::Url(url) => {
                    if !url.trim().is_empty() {
                        downloads.push((index, url.trim().to_string()));
                    }
                    None
                }
            };
            if let Some(path) = decoded {
                *source = MediaSource::Path(path);
            }
        }

        let download_count = downloads.len();
        let downloaded = self.download_all(downloads, work_dir).await?;
        let mut sources = staged.media_sources_mut();
        for (index, path) in downloaded {
            if let Some(source) = sources.get_mut(index) {
                **source = MediaSource::Path(path);
            }
        }

        info!(job_id, downloads = download_count, "Assets staged");
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Background, ImageClip, SubtitlePosition, SubtitleSpec};
    use tempfile::TempDir;

    #[test]
    fn test_decode_data_uri() {
        let (bytes, ext) = decode_data("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(ext, "png");

        let (bytes, ext) = decode_data("data:image/jpeg;base64,aGVs\nbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn test_decode_bare_base64() {
        let (bytes, ext) = decode_data("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(ext, "bin");
        assert!(matches!(
            decode_data("not base64!!"),
            Err(AssetError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_plain_data_uri() {
        let (bytes, ext) = decode_data("data:text/plain,hi").unwrap();
        assert_eq!(bytes, b"hi");
        assert_eq!(ext, "txt");
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://cdn.example.com/img/photo.JPG?x=1"), "jpg");
        assert_eq!(url_extension("https://cdn.example.com/track"), "bin");
        assert_eq!(url_extension("https://cdn.example.com/a.verylongext"), "bin");
        assert_eq!(url_extension("not a url"), "bin");
    }

    #[tokio::test]
    async fn test_stage_decodes_and_writes_subtitles() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("local.png");
        tokio::fs::write(&local, b"png").await.unwrap();

        let mut request = CompositionRequest::new(5.0, 640, 360);
        request.background = Background::Image {
            source: MediaSource::Data("data:image/png;base64,aGVsbG8=".to_string()),
        };
        request.images.push(ImageClip {
            source: MediaSource::Path(local.clone()),
            start: 0.0,
            length: 1.0,
            rect: None,
            ken_burns: None,
        });
        request.subtitles = Some(SubtitleSpec {
            source: SubtitleSource::Inline("1\n00:00:00,000 --> 00:00:01,000\nHi\n".to_string()),
            font_size: 24,
            color: "#FFFFFF".to_string(),
            position: SubtitlePosition::Bottom,
            outline: true,
            background: "transparent".to_string(),
        });

        let work = dir.path().join("job-1");
        let stager = HttpAssetStager::new(FetchConfig::default()).unwrap();
        let staged = stager.stage("job-1", &request, &work).await.unwrap();

        let Background::Image {
            source: MediaSource::Path(bg),
        } = &staged.background
        else {
            panic!("background not staged");
        };
        assert_eq!(bg, &work.join("asset_0.png"));
        assert_eq!(tokio::fs::read(bg).await.unwrap(), b"hello");

        assert_eq!(staged.images[0].source, MediaSource::Path(local));

        let subtitles = staged.subtitles.unwrap();
        assert_eq!(
            subtitles.source,
            SubtitleSource::File(MediaSource::Path(work.join("subtitles.srt")))
        );
        // The caller's request is untouched.
        assert!(matches!(
            request.background,
            Background::Image {
                source: MediaSource::Data(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_stage_missing_local_file() {
        let dir = TempDir::new().unwrap();
        let mut request = CompositionRequest::new(5.0, 640, 360);
        request.images.push(ImageClip {
            source: MediaSource::Path(dir.path().join("nope.png")),
            start: 0.0,
            length: 1.0,
            rect: None,
            ken_burns: None,
        });

        let stager = HttpAssetStager::new(FetchConfig::default()).unwrap();
        let result = stager.stage("job-2", &request, &dir.path().join("w")).await;
        assert!(matches!(result, Err(AssetError::Missing { .. })));
    }

    #[tokio::test]
    async fn test_stage_invalid_url_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut request = CompositionRequest::new(5.0, 640, 360);
        request.images.push(ImageClip {
            source: MediaSource::Url("::not-a-url::".to_string()),
            start: 0.0,
            length: 1.0,
            rect: None,
            ken_burns: None,
        });

        let stager = HttpAssetStager::new(FetchConfig::default()).unwrap();
        let err = stager
            .stage("job-3", &request, &dir.path().join("w"))
            .await
            .unwrap_err();
        let AssetError::Batch(batch) = err else {
            panic!("expected batch error, got {err:?}");
        };
        assert_eq!(batch.failures.len(), 1);
        assert!(batch.failures[0].message.contains("Invalid asset URL"));

        // Rejected before any request, so no rate-limit slot is used.
        let status = stager.status().await;
        assert_eq!(status.pool.name, "fetch");
        assert_eq!(status.pool.active, 0);
        assert_eq!(status.pool.total_processed, 1);
        assert_eq!(status.pool.total_failed, 1);
        assert_eq!(status.rate_limit.calls_in_window, 0);
        assert_eq!(
            status.rate_limit.max_calls,
            FetchConfig::default().calls_per_minute as usize
        );
    }
}
