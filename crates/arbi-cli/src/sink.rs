//! Output for accepted listings.
//!
//! Each traversal writes into `<output_dir>/<store>/<section>/`:
//!
//! - product images, named by [`ListingRecord::image_file_name`]
//! - one caption file per listing with [`ListingRecord::insert_text`]
//! - `list.txt`, the running listing log
//! - `fail_page_source.html` when page 1 could not be understood
//!
//! The section folder is cleared when a traversal starts and removed again
//! if the traversal produced nothing.

use std::path::{Path, PathBuf};

use arbi_core::{ListingRecord, StoreKind};
use arbi_scraper::{ItemSink, SinkError};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

const LIST_FILE: &str = "list.txt";
const DIAGNOSTIC_FILE: &str = "fail_page_source.html";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub(crate) struct FolderSink {
    dir: PathBuf,
    http: reqwest::Client,
}

impl FolderSink {
    /// Creates an empty section folder, discarding output of earlier runs.
    pub(crate) async fn create(
        output_dir: &Path,
        store: StoreKind,
        section: &str,
        http: reqwest::Client,
    ) -> Result<Self, SinkError> {
        let dir = output_dir.join(store.to_string()).join(section);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => tracing::debug!(dir = %dir.display(), "cleared previous output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&dir)(e)),
        }
        tokio::fs::create_dir_all(&dir).await.map_err(io_error(&dir))?;
        Ok(Self { dir, http })
    }

    /// Removes the section folder if the traversal left it empty.
    pub(crate) async fn finish(self) -> Result<(), SinkError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;
        let is_empty = entries
            .next_entry()
            .await
            .map_err(io_error(&self.dir))?
            .is_none();
        if is_empty {
            tokio::fs::remove_dir(&self.dir)
                .await
                .map_err(io_error(&self.dir))?;
            tracing::debug!(dir = %self.dir.display(), "removed empty output folder");
        }
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SinkError> {
        let failed = |reason: String| SinkError::Download {
            url: url.to_owned(),
            reason,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| failed(e.to_string()))?;
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn append_to_list(&self, block: &str) -> Result<(), SinkError> {
        let path = self.dir.join(LIST_FILE);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_error(&path))?;
        file.write_all(block.as_bytes())
            .await
            .map_err(io_error(&path))?;
        file.write_all(b"\n").await.map_err(io_error(&path))
    }
}

#[async_trait]
impl ItemSink for FolderSink {
    async fn process_accepted_item(&mut self, record: &ListingRecord) -> Result<(), SinkError> {
        // All downloads finish before anything is written for this listing.
        let mut images = Vec::with_capacity(record.image_urls.len());
        for url in &record.image_urls {
            images.push(self.download(url).await?);
        }

        for (n, bytes) in images.iter().enumerate() {
            let path = self.dir.join(record.image_file_name(n));
            tokio::fs::write(&path, bytes)
                .await
                .map_err(io_error(&path))?;
        }

        let caption = self
            .dir
            .join(Path::new(&record.image_file_name(0)).with_extension("txt"));
        tokio::fs::write(&caption, record.insert_text())
            .await
            .map_err(io_error(&caption))?;

        self.append_to_list(&record.display_block()).await?;
        tracing::info!(
            index = record.sequence_index,
            brand = %record.brand,
            title = %record.title,
            selling_price = record.selling_price,
            "saved listing"
        );
        Ok(())
    }

    async fn save_diagnostic(&mut self, url: &str, html: &str) -> Result<(), SinkError> {
        let path = self.dir.join(DIAGNOSTIC_FILE);
        tokio::fs::write(&path, html)
            .await
            .map_err(io_error(&path))?;
        tracing::warn!(url, path = %path.display(), "saved page source for inspection");
        Ok(())
    }
}

/// Logs accepted listings without touching the network or the disk.
#[derive(Debug, Default)]
pub(crate) struct DryRunSink;

#[async_trait]
impl ItemSink for DryRunSink {
    async fn process_accepted_item(&mut self, record: &ListingRecord) -> Result<(), SinkError> {
        tracing::info!(
            index = record.sequence_index,
            brand = %record.brand,
            title = %record.title,
            landed_cost = record.landed_cost,
            selling_price = record.selling_price,
            profit = record.profit,
            "[dry-run] would save listing"
        );
        Ok(())
    }

    async fn save_diagnostic(&mut self, url: &str, html: &str) -> Result<(), SinkError> {
        tracing::warn!(url, bytes = html.len(), "[dry-run] would save page source");
        Ok(())
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;
