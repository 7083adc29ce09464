//! Source media fetching into the job work directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use splice_common::error::{SpliceError, SpliceResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Materializes a source URL as a local file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Write the media behind `url` to `dest`, returning its size in bytes.
    async fn fetch(&self, url: &str, dest: &Path) -> SpliceResult<u64>;

    /// Fetcher name.
    fn name(&self) -> &str;
}

/// Copies local paths and `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct LocalFetcher;

impl LocalFetcher {
    /// Local path for `url`, or a fetch error for remote schemes.
    pub fn resolve(url: &str) -> SpliceResult<PathBuf> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        match url.split_once("://") {
            Some((scheme, _)) => Err(SpliceError::fetch(format!(
                "unsupported source scheme '{scheme}' in {url}"
            ))),
            None => Ok(PathBuf::from(url)),
        }
    }
}

#[async_trait]
impl MediaFetcher for LocalFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> SpliceResult<u64> {
        let source = Self::resolve(url)?;
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(SpliceError::FileNotFound { path: source });
        }
        let bytes = tokio::fs::copy(&source, dest).await.map_err(|e| {
            SpliceError::fetch(format!("failed to copy {}: {e}", source.display()))
        })?;
        tracing::debug!(source = %source.display(), dest = %dest.display(), bytes, "Source fetched");
        Ok(bytes)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// One source to fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub dest: PathBuf,
}

/// Fetch every request with at most `max_parallel` in flight.
///
/// Returns destination paths in request order. The first failure aborts
/// the remaining fetches.
pub async fn fetch_all(
    fetcher: Arc<dyn MediaFetcher>,
    requests: Vec<FetchRequest>,
    max_parallel: usize,
) -> SpliceResult<Vec<PathBuf>> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();

    for (index, request) in requests.iter().cloned().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SpliceError::fetch(format!("fetch queue closed: {e}")))?;
            let bytes = fetcher.fetch(&request.url, &request.dest).await?;
            Ok::<_, SpliceError>((index, bytes))
        });
    }

    let mut total_bytes = 0u64;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| SpliceError::fetch(format!("fetch task failed: {e}")));
        match result.and_then(|r| r) {
            Ok((index, bytes)) => {
                total_bytes += bytes;
                tracing::debug!(index, bytes, "Fetch finished");
            }
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }

    tracing::info!(
        sources = requests.len(),
        total_bytes,
        fetcher = fetcher.name(),
        "All sources fetched"
    );
    Ok(requests.into_iter().map(|r| r.dest).collect())
}

/// Work-directory file name for the k-th source, keeping its extension.
pub fn source_file_name(index: usize, url: &str) -> String {
    let ext = Path::new(url.split(['?', '#']).next().unwrap_or(url))
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("mp4");
    format!("input_{index}.{}", ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_schemes() {
        assert_eq!(
            LocalFetcher::resolve("file:///tmp/a.mp4").unwrap(),
            PathBuf::from("/tmp/a.mp4")
        );
        assert_eq!(
            LocalFetcher::resolve("media/a.mp4").unwrap(),
            PathBuf::from("media/a.mp4")
        );
        assert!(matches!(
            LocalFetcher::resolve("https://cdn.example.com/a.mp4"),
            Err(SpliceError::Fetch { .. })
        ));
    }

    #[test]
    fn test_source_file_name() {
        assert_eq!(source_file_name(0, "media/a.MOV"), "input_0.mov");
        assert_eq!(source_file_name(2, "file:///x/y.webm?token=1"), "input_2.webm");
        assert_eq!(source_file_name(1, "clip"), "input_1.mp4");
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_order() {
        let dir = std::env::temp_dir().join("splice_test_fetch_all");
        std::fs::create_dir_all(&dir).unwrap();
        let mut requests = Vec::new();
        for k in 0..5 {
            let src = dir.join(format!("src_{k}.mp4"));
            std::fs::write(&src, vec![k as u8; 10 + k]).unwrap();
            requests.push(FetchRequest {
                url: src.to_string_lossy().into_owned(),
                dest: dir.join(format!("input_{k}.mp4")),
            });
        }

        let paths = fetch_all(Arc::new(LocalFetcher), requests, 2).await.unwrap();
        assert_eq!(paths.len(), 5);
        for (k, path) in paths.iter().enumerate() {
            assert_eq!(path, &dir.join(format!("input_{k}.mp4")));
            assert_eq!(std::fs::metadata(path).unwrap().len(), 10 + k as u64);
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = std::env::temp_dir().join("splice_test_fetch_missing");
        std::fs::create_dir_all(&dir).unwrap();
        let result = fetch_all(
            Arc::new(LocalFetcher),
            vec![FetchRequest {
                url: dir.join("nope.mp4").to_string_lossy().into_owned(),
                dest: dir.join("input_0.mp4"),
            }],
            4,
        )
        .await;
        assert!(matches!(result, Err(SpliceError::FileNotFound { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }
}
