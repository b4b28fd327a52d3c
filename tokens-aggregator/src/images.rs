use std::{
    collections::BTreeSet,
    io,
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use reqwest::Client;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    advisory::{AdvisoryCategory, AdvisoryLog},
    bucket::{local_image, TokenRecord},
};

/// Token logos cached as `<dir>/<id>.png`.
pub struct ImageCache {
    client: Client,
    advisory: Arc<dyn AdvisoryLog>,
}

impl ImageCache {
    pub fn new(client: Client, advisory: Arc<dyn AdvisoryLog>) -> Self {
        Self { client, advisory }
    }

    /// Downloads the image of every record in `records`, returning the ids that failed.
    ///
    /// Records without an image url are left alone.
    pub async fn download_new(&self, dir: &Path, records: &[&TokenRecord]) -> Vec<String> {
        tracing::info!(new_tokens = records.len(), "downloading images of new tokens");
        let mut failed = Vec::new();

        for record in records {
            let Some(url) = record.image_url.as_deref() else {
                continue;
            };

            let path = dir.join(&record.local_image);
            match self.download(url, &path).await {
                Ok(()) => tracing::debug!(?path, "downloaded image"),
                Err(err) => {
                    tracing::warn!(token = %record.id, url, "unable to download image: {err:#}");
                    self.advisory.record(
                        AdvisoryCategory::FailedDownloads,
                        &format!("{} | {url}", record.local_image),
                        &format!("{err:#}"),
                    );
                    failed.push(record.id.clone());
                },
            }
        }

        if !failed.is_empty() {
            tracing::warn!(count = failed.len(), ids = %failed.join(", "), "failed to download images");
        }

        failed
    }

    async fn download(&self, url: &str, path: &Path) -> anyhow::Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("request failed")?;

        let result = write_body(response, path).await;
        if result.is_err() {
            // Never leave a truncated image behind
            let _ = fs::remove_file(path).await;
        }
        result
    }

    /// Deletes the cached images of `ids`. Returns how many files were removed.
    pub async fn remove(&self, dir: &Path, ids: &BTreeSet<String>) -> usize {
        let mut removed = 0;

        for id in ids {
            let path = dir.join(local_image(id));
            match fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::info!(?path, "removed image");
                    removed += 1;
                },
                Err(err) if err.kind() == io::ErrorKind::NotFound => {},
                Err(err) => tracing::warn!(?path, %err, "unable to remove image"),
            }
        }

        removed
    }
}

async fn write_body(mut response: reqwest::Response, path: &Path) -> anyhow::Result<()> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("unable to create {}", path.display()))?;

    while let Some(chunk) = response.chunk().await.context("body read failed")? {
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(())
}
