use animelink::model::{PROVIDER_ANIDB, PROVIDER_ANILIST};
use animelink::{
    MetadataField, PersonInfo, PersonKind, RefreshError, RefreshOrchestrator, Series,
    SeriesInfo, SeriesSource, SeriesStatus, SourceError, SourceQueryCoordinator, SourceSlot,
};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

enum Reply {
    Info(SeriesInfo),
    NotFound,
    Down,
    Cancelled,
}

/// Canned source that also counts how often it was asked.
struct FakeSource {
    name: &'static str,
    reply: Reply,
    calls: AtomicUsize,
    cancel_after_reply: Option<CancellationToken>,
}

impl FakeSource {
    fn new(name: &'static str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            calls: AtomicUsize::new(0),
            cancel_after_reply: None,
        })
    }

    fn cancelling(name: &'static str, reply: Reply, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            calls: AtomicUsize::new(0),
            cancel_after_reply: Some(token),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SeriesSource for FakeSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn find_series_info(
        &self,
        _series: &Series,
        _cancel: &CancellationToken,
    ) -> Result<SeriesInfo, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = match &self.reply {
            Reply::Info(info) => Ok(info.clone()),
            Reply::NotFound => Err(SourceError::NotFound("nothing".into())),
            Reply::Down => Err(SourceError::Transient(anyhow::anyhow!("503 from upstream"))),
            Reply::Cancelled => Err(SourceError::Cancelled),
        };
        if let Some(token) = &self.cancel_after_reply {
            token.cancel();
        }
        out
    }
}

fn orchestrator(
    primary: Arc<FakeSource>,
    secondary: Arc<FakeSource>,
    tertiary: Arc<FakeSource>,
) -> RefreshOrchestrator {
    RefreshOrchestrator::new(
        SourceQueryCoordinator::new()
            .with_source(SourceSlot::Primary, primary)
            .with_source(SourceSlot::Secondary, secondary)
            .with_source(SourceSlot::Tertiary, tertiary),
    )
}

fn ids(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn anidb() -> SeriesInfo {
    SeriesInfo {
        name: Some("Mushishi".into()),
        description: Some("anidb text".into()),
        runtime_ticks: Some(25 * 600_000_000),
        start_date: NaiveDate::from_ymd_opt(2005, 10, 23),
        end_date: NaiveDate::from_ymd_opt(2006, 6, 19),
        genres: vec!["Anidb Tag".into()],
        studios: vec!["Artland".into()],
        people: vec![PersonInfo::new(
            "Yuto Nakano",
            Some("Ginko".into()),
            PersonKind::Actor,
        )],
        community_rating: Some(8.1),
        vote_count: Some(10),
        external_providers: ids(&[(PROVIDER_ANIDB, "3437")]),
        ..SeriesInfo::default()
    }
}

fn anilist() -> SeriesInfo {
    SeriesInfo {
        name: Some("Mushi-Shi".into()),
        description: Some("anilist text".into()),
        genres: vec!["Adventure".into(), "Mystery".into()],
        community_rating: Some(8.3),
        vote_count: Some(0),
        external_providers: ids(&[(PROVIDER_ANILIST, "457"), ("MyAnimeList", "457")]),
        ..SeriesInfo::default()
    }
}

fn mal() -> SeriesInfo {
    SeriesInfo {
        genres: Vec::new(),
        community_rating: Some(8.6),
        vote_count: Some(50),
        external_providers: ids(&[("MyAnimeList", "458")]),
        ..SeriesInfo::default()
    }
}

#[tokio::test]
async fn full_refresh_merges_every_source() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::Info(anilist())),
        FakeSource::new("mal", Reply::Info(mal())),
    );
    let mut series = Series::named("mushishi");
    let ok = o
        .refresh(&mut series, false, &CancellationToken::new())
        .await
        .expect("refresh");

    assert!(ok);
    assert_eq!(series.name.as_deref(), Some("Mushishi"));
    assert_eq!(series.overview.as_deref(), Some("anilist text"));
    assert_eq!(series.genres, vec!["Adventure", "Mystery", "Animation"]);
    assert_eq!(series.studios, vec!["Artland"]);
    assert_eq!(series.status, Some(SeriesStatus::Ended));
    assert_eq!(series.production_year, Some(2005));
    assert_eq!(series.community_rating, Some(8.6));
    assert_eq!(series.vote_count, Some(50));
    assert_eq!(series.provider_ids.get("AniDB").map(String::as_str), Some("3437"));
    assert_eq!(series.provider_ids.get("MyAnimeList").map(String::as_str), Some("458"));
    assert!(series.last_refreshed_utc.is_some());
}

#[tokio::test]
async fn failing_sources_are_skipped_not_fatal() {
    let primary = FakeSource::new("anidb", Reply::Down);
    let secondary = FakeSource::new("anilist", Reply::NotFound);
    let tertiary = FakeSource::new("mal", Reply::Info(mal()));
    let o = orchestrator(primary.clone(), secondary.clone(), tertiary.clone());

    let mut series = Series::named("Kino no Tabi");
    let ok = o
        .refresh(&mut series, false, &CancellationToken::new())
        .await
        .expect("refresh");

    assert!(ok);
    assert_eq!((primary.calls(), secondary.calls(), tertiary.calls()), (1, 1, 1));
    assert_eq!(series.name.as_deref(), Some("Kino no Tabi"));
    assert_eq!(series.vote_count, Some(50));
    assert_eq!(series.provider_ids.len(), 1);
}

#[tokio::test]
async fn zero_sources_still_succeed_and_stamp() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Down),
        FakeSource::new("anilist", Reply::Down),
        FakeSource::new("mal", Reply::NotFound),
    );
    let mut series = Series {
        name: Some("Kept".into()),
        genres: vec!["Drama".into()],
        ..Series::default()
    };
    let before = Utc::now();
    let ok = o
        .refresh(&mut series, true, &CancellationToken::new())
        .await
        .expect("refresh");

    assert!(ok);
    assert_eq!(series.name.as_deref(), Some("Kept"));
    assert_eq!(series.genres, vec!["Drama"]);
    assert_eq!(series.status, Some(SeriesStatus::Continuing));
    assert!(series.last_refreshed_utc.is_some_and(|t| t >= before));
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let primary = FakeSource::new("anidb", Reply::Info(anidb()));
    let o = orchestrator(
        primary.clone(),
        FakeSource::new("anilist", Reply::Info(anilist())),
        FakeSource::new("mal", Reply::Info(mal())),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut series = Series::named("x");
    let original = series.clone();

    let err = o.refresh(&mut series, false, &cancel).await.unwrap_err();
    assert_eq!(err, RefreshError::Cancelled);
    assert_eq!(primary.calls(), 0);
    assert_eq!(series, original);
}

#[tokio::test]
async fn cancellation_between_sources_stops_further_calls() {
    let cancel = CancellationToken::new();
    let primary = FakeSource::cancelling("anidb", Reply::Info(anidb()), cancel.clone());
    let secondary = FakeSource::new("anilist", Reply::Info(anilist()));
    let o = orchestrator(
        primary.clone(),
        secondary.clone(),
        FakeSource::new("mal", Reply::Info(mal())),
    );
    let mut series = Series::named("x");

    let err = o.refresh(&mut series, false, &cancel).await.unwrap_err();
    assert_eq!(err, RefreshError::Cancelled);
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);
    assert!(series.provider_ids.is_empty());
    assert!(series.last_refreshed_utc.is_none());
}

#[tokio::test]
async fn cancellation_reported_by_a_source_propagates() {
    let tertiary = FakeSource::new("mal", Reply::Info(mal()));
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::Cancelled),
        tertiary.clone(),
    );
    let mut series = Series::named("x");
    let err = o
        .refresh(&mut series, false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RefreshError::Cancelled);
    assert_eq!(tertiary.calls(), 0);
}

#[tokio::test]
async fn cancellation_after_last_source_keeps_identifiers_only() {
    let cancel = CancellationToken::new();
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::Info(anilist())),
        FakeSource::cancelling("mal", Reply::Info(mal()), cancel.clone()),
    );
    let mut series = Series::named("original");

    let err = o.refresh(&mut series, false, &cancel).await.unwrap_err();
    assert_eq!(err, RefreshError::Cancelled);
    assert_eq!(series.provider_ids.get("AniDB").map(String::as_str), Some("3437"));
    assert_eq!(series.name.as_deref(), Some("original"));
    assert!(series.last_refreshed_utc.is_none());
}

#[tokio::test]
async fn frozen_series_only_gains_identifiers() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::Info(anilist())),
        FakeSource::new("mal", Reply::Info(mal())),
    );
    let mut series = Series {
        name: Some("Frozen".into()),
        dont_fetch_meta: true,
        ..Series::default()
    };

    o.refresh(&mut series, false, &CancellationToken::new())
        .await
        .expect("refresh");

    assert_eq!(series.name.as_deref(), Some("Frozen"));
    assert!(series.genres.is_empty());
    assert_eq!(series.status, None);
    assert_eq!(series.provider_ids.len(), 3);
    assert!(series.last_refreshed_utc.is_some());
}

#[tokio::test]
async fn locked_fields_survive_refresh() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::Info(anilist())),
        FakeSource::new("mal", Reply::Info(mal())),
    );
    let mut series = Series {
        name: Some("My Title".into()),
        run_time_ticks: Some(1),
        studios: vec!["Mine".into()],
        people: Vec::new(),
        ..Series::default()
    };
    series.locked_fields.extend([
        MetadataField::Name,
        MetadataField::Runtime,
        MetadataField::Studios,
        MetadataField::Cast,
    ]);

    o.refresh(&mut series, false, &CancellationToken::new())
        .await
        .expect("refresh");

    assert_eq!(series.name.as_deref(), Some("My Title"));
    assert_eq!(series.run_time_ticks, Some(1));
    assert_eq!(series.studios, vec!["Mine"]);
    assert!(series.people.is_empty());
    assert_eq!(series.overview.as_deref(), Some("anilist text"));
}

#[tokio::test]
async fn repeated_refresh_is_idempotent() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::Info(anilist())),
        FakeSource::new("mal", Reply::Info(mal())),
    );
    let mut series = Series::named("x");
    let cancel = CancellationToken::new();

    o.refresh(&mut series, false, &cancel).await.expect("first");
    let mut first = series.clone();
    o.refresh(&mut series, false, &cancel).await.expect("second");

    first.last_refreshed_utc = series.last_refreshed_utc;
    assert_eq!(series, first);
}

#[tokio::test]
async fn orchestrator_reports_internet_need() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::NotFound),
        FakeSource::new("anilist", Reply::NotFound),
        FakeSource::new("mal", Reply::NotFound),
    );
    assert!(o.requires_internet());
}

#[tokio::test]
async fn stored_older_version_is_refreshed_and_restamped() {
    let o = orchestrator(
        FakeSource::new("anidb", Reply::Info(anidb())),
        FakeSource::new("anilist", Reply::NotFound),
        FakeSource::new("mal", Reply::NotFound),
    );
    let raw = r#"{
        "name": "Kino no Tabi",
        "last_refreshed_utc": "2024-01-01T00:00:00Z",
        "provider_version": "0"
    }"#;
    let mut series: Series = serde_json::from_str(raw).expect("series json");
    assert!(o.needs_refresh(&series, &o.provider_state(&series)));

    o.refresh(&mut series, false, &CancellationToken::new())
        .await
        .expect("refresh");

    let saved = serde_json::to_string(&series).expect("serialize");
    let reloaded: Series = serde_json::from_str(&saved).expect("reload");
    assert_eq!(reloaded.provider_version.as_deref(), Some(animelink::PROVIDER_VERSION));
    assert!(!o.needs_refresh(&reloaded, &o.provider_state(&reloaded)));
}
