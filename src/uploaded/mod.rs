use std::sync::RwLock;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

/// One record from the remote listing: the storage key plus the upload
/// timestamp the server reports for it.
#[derive(Debug, Deserialize)]
struct ItemRecord {
    #[allow(dead_code)]
    uploaded: String,
    key: String,
}

/// The authoritative set of already-uploaded asset identifiers, as reported
/// by the remote service. Constructed once and shared by reference;
/// `refresh` swaps the whole list in one write so `contains` readers never
/// observe a partial update.
pub struct UploadedSet {
    http: reqwest::Client,
    endpoint: Url,
    storage_prefix: String,
    keys: RwLock<Vec<String>>,
}

impl UploadedSet {
    pub fn new(http: reqwest::Client, endpoint: Url, storage_prefix: impl Into<String>) -> Self {
        UploadedSet {
            http,
            endpoint,
            storage_prefix: storage_prefix.into(),
            keys: RwLock::new(Vec::new()),
        }
    }

    /// Re-fetches the uploaded listing. On success the in-memory set is
    /// replaced wholesale; on any transport or decode failure the prior set
    /// is left untouched and the failure is only logged.
    pub async fn refresh(&self) {
        match self.fetch().await {
            Ok(keys) => {
                debug!(count = keys.len(), "refreshed uploaded set");

                match self.keys.write() {
                    Ok(mut current) => *current = keys,
                    Err(_) => warn!("uploaded set lock poisoned, refresh dropped"),
                }
            }
            Err(err) => warn!("could not refresh uploaded set: {err:#}"),
        }
    }

    async fn fetch(&self) -> anyhow::Result<Vec<String>> {
        let records = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ItemRecord>>()
            .await?;

        Ok(records
            .into_iter()
            .map(|record| {
                record
                    .key
                    .strip_prefix(&self.storage_prefix)
                    .map(str::to_owned)
                    .unwrap_or(record.key)
            })
            .collect())
    }

    /// Exact-match membership against the most recent successful refresh.
    pub fn contains(&self, identifier: &str) -> bool {
        self.keys
            .read()
            .map(|keys| keys.iter().any(|key| key == identifier))
            .unwrap_or(false)
    }
}
