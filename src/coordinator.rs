use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{Series, SeriesInfo};
use crate::refresh::RefreshError;
use crate::source::{SeriesSource, SourceError, SourceSlot};

#[derive(Debug, Clone)]
pub struct SourceContribution {
    pub slot: SourceSlot,
    pub source: &'static str,
    pub info: SeriesInfo,
}

/// Queries every registered source once per refresh, in slot order.
#[derive(Clone, Default)]
pub struct SourceQueryCoordinator {
    sources: [Option<Arc<dyn SeriesSource>>; 3],
}

impl SourceQueryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` in `slot`, replacing whatever was there.
    pub fn with_source(mut self, slot: SourceSlot, source: Arc<dyn SeriesSource>) -> Self {
        self.sources[slot.index()] = Some(source);
        self
    }

    pub fn registered(&self) -> impl Iterator<Item = (SourceSlot, &Arc<dyn SeriesSource>)> {
        SourceSlot::ALL
            .into_iter()
            .filter_map(|slot| self.sources[slot.index()].as_ref().map(|s| (slot, s)))
    }

    /// Collects what each source returned. A failing source contributes
    /// nothing; only cancellation ends the whole query.
    pub async fn query_all(
        &self,
        series: &Series,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceContribution>, RefreshError> {
        let mut contributions = Vec::with_capacity(3);
        for (slot, source) in self.registered() {
            if cancel.is_cancelled() {
                info!("Refresh cancelled before querying {}", source.name());
                return Err(RefreshError::Cancelled);
            }
            match source.find_series_info(series, cancel).await {
                Ok(info) => {
                    debug!(
                        source = source.name(),
                        slot = ?slot,
                        provider_ids = info.external_providers.len(),
                        "Source contributed series info"
                    );
                    contributions.push(SourceContribution {
                        slot,
                        source: source.name(),
                        info,
                    });
                }
                Err(SourceError::Cancelled) => {
                    info!("{} observed cancellation", source.name());
                    return Err(RefreshError::Cancelled);
                }
                Err(SourceError::NotFound(msg)) => {
                    debug!("{} has no match: {}", source.name(), msg);
                }
                Err(e) => {
                    warn!("{} failed, skipping: {}", source.name(), e);
                }
            }
        }
        Ok(contributions)
    }
}
