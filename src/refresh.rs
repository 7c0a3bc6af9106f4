use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::SourceQueryCoordinator;
use crate::identifiers::merge_provider_ids;
use crate::merge::{merge_series_info, SourceSet};
use crate::model::Series;

/// Bumped whenever merge rules change so stored series get refreshed.
pub const PROVIDER_VERSION: &str = "1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh cancelled")]
    Cancelled,
}

/// What the host remembers about the last refresh of one series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRefreshState {
    pub last_refreshed: Option<DateTime<Utc>>,
    pub provider_version: Option<String>,
}

/// Entry point the host calls once per refresh cycle of a series.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    coordinator: SourceQueryCoordinator,
}

impl RefreshOrchestrator {
    pub fn new(coordinator: SourceQueryCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &SourceQueryCoordinator {
        &self.coordinator
    }

    pub fn requires_internet(&self) -> bool {
        self.coordinator
            .registered()
            .any(|(_, s)| s.requires_internet())
    }

    pub fn needs_refresh(&self, series: &Series, state: &ProviderRefreshState) -> bool {
        let Some(last) = state.last_refreshed else {
            return true;
        };
        if state.provider_version.as_deref() != Some(PROVIDER_VERSION) {
            return true;
        }
        if self
            .coordinator
            .registered()
            .any(|(_, s)| s.needs_refresh_based_on_compare_date(series, state))
        {
            return true;
        }
        series.date_modified.is_some_and(|modified| modified > last)
    }

    /// Reads back what the last successful refresh stamped onto the series.
    pub fn provider_state(&self, series: &Series) -> ProviderRefreshState {
        ProviderRefreshState {
            last_refreshed: series.last_refreshed_utc,
            provider_version: series.provider_version.clone(),
        }
    }

    /// Runs one refresh: query sources, fold identifiers, merge fields
    /// (unless the user has frozen the series) and stamp the refresh time.
    ///
    /// `force` is recorded only; deciding whether to call this at all is the
    /// host's job (see [`Self::needs_refresh`]).
    pub async fn refresh(
        &self,
        series: &mut Series,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<bool, RefreshError> {
        if cancel.is_cancelled() {
            return Err(RefreshError::Cancelled);
        }
        info!(
            "Refreshing series '{}' (force={})",
            series.name.as_deref().unwrap_or("<unnamed>"),
            force
        );

        let contributions = self.coordinator.query_all(series, cancel).await?;
        merge_provider_ids(
            &mut series.provider_ids,
            contributions.iter().map(|c| &c.info.external_providers),
        );
        debug!(
            sources = contributions.len(),
            provider_ids = series.provider_ids.len(),
            "Identifiers merged"
        );

        if cancel.is_cancelled() {
            info!("Refresh cancelled after identifier merge");
            return Err(RefreshError::Cancelled);
        }

        if series.dont_fetch_meta {
            debug!("Series metadata is frozen; skipping field merge");
        } else {
            let sources = SourceSet::from_contributions(contributions);
            let locked = series.locked_fields.clone();
            merge_series_info(series, &sources, &locked);
        }

        series.last_refreshed_utc = Some(Utc::now());
        series.provider_version = Some(PROVIDER_VERSION.to_string());
        info!(
            "Finished refresh for '{}'",
            series.name.as_deref().unwrap_or("<unnamed>")
        );
        Ok(true)
    }
}
