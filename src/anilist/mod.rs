use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Settings;
use crate::model::{Series, SeriesInfo, PROVIDER_ANILIST};
use crate::source::{unless_cancelled, SeriesSource, SourceError};

mod client;
mod map;

pub use client::AniListClient;

/// Community aggregator source backed by the AniList GraphQL API.
#[derive(Debug, Clone)]
pub struct AniListSource {
    client: AniListClient,
    prefer_english_titles: bool,
}

impl AniListSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: AniListClient::new(settings.http_timeout)?,
            prefer_english_titles: settings.prefer_english_titles,
        })
    }

    async fn resolve_id(&self, series: &Series, cancel: &CancellationToken) -> Result<i32, SourceError> {
        if let Some(id) = series
            .provider_id(PROVIDER_ANILIST)
            .and_then(|s| s.trim().parse::<i32>().ok())
        {
            return Ok(id);
        }
        let name = series
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SourceError::NotFound("series has no name or AniList id".into()))?;
        let hit = unless_cancelled(cancel, self.client.search_id(name)).await?;
        hit.ok_or_else(|| SourceError::NotFound(format!("no AniList match for '{}'", name)))
    }
}

#[async_trait]
impl SeriesSource for AniListSource {
    fn name(&self) -> &'static str {
        "AniList"
    }

    async fn find_series_info(
        &self,
        series: &Series,
        cancel: &CancellationToken,
    ) -> Result<SeriesInfo, SourceError> {
        let id = self.resolve_id(series, cancel).await?;
        debug!("Fetching AniList media {}", id);
        let media = unless_cancelled(cancel, self.client.fetch_media(id))
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("AniList has no media {}", id)))?;
        Ok(map::map_media(media, self.prefer_english_titles))
    }
}
