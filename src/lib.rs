pub mod anilist;
pub mod config;
pub mod coordinator;
pub mod identifiers;
pub mod mal;
pub mod merge;
pub mod model;
pub mod refresh;
pub mod source;
pub mod text;

pub use coordinator::{SourceContribution, SourceQueryCoordinator};
pub use model::{MetadataField, PersonInfo, PersonKind, Series, SeriesInfo, SeriesStatus};
pub use refresh::{ProviderRefreshState, RefreshError, RefreshOrchestrator, PROVIDER_VERSION};
pub use source::{SeriesSource, SourceError, SourceSlot};
