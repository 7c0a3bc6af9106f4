use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::model::{Series, SeriesInfo};
use crate::refresh::ProviderRefreshState;

/// Position of a source in the fixed merge priority.
///
/// By convention the primary slot holds the structured anime database
/// (AniDB), the secondary the community aggregator (AniList) and the
/// tertiary the tracker site (MyAnimeList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceSlot {
    Primary,
    Secondary,
    Tertiary,
}

impl SourceSlot {
    pub const ALL: [SourceSlot; 3] = [
        SourceSlot::Primary,
        SourceSlot::Secondary,
        SourceSlot::Tertiary,
    ];

    pub fn index(self) -> usize {
        match self {
            SourceSlot::Primary => 0,
            SourceSlot::Secondary => 1,
            SourceSlot::Tertiary => 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no match: {0}")]
    NotFound(String),

    #[error("transient source failure: {0:#}")]
    Transient(#[from] anyhow::Error),

    #[error("cancelled")]
    Cancelled,
}

/// One external metadata source, normalized to [`SeriesInfo`].
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Short display name used in logs.
    fn name(&self) -> &'static str;

    fn requires_internet(&self) -> bool {
        true
    }

    /// Lets a source force a refresh independently of the entity's own
    /// modification date.
    fn needs_refresh_based_on_compare_date(
        &self,
        _series: &Series,
        _state: &ProviderRefreshState,
    ) -> bool {
        false
    }

    async fn find_series_info(
        &self,
        series: &Series,
        cancel: &CancellationToken,
    ) -> Result<SeriesInfo, SourceError>;
}

/// Races a source request against the refresh's cancellation token.
pub async fn unless_cancelled<T, F>(cancel: &CancellationToken, request: F) -> Result<T, SourceError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        res = request => res.map_err(SourceError::Transient),
    }
}
