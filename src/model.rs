use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One tick is 100ns, the host's time resolution.
pub const TICKS_PER_MINUTE: i64 = 600_000_000;

pub const PROVIDER_ANIDB: &str = "AniDB";
pub const PROVIDER_ANILIST: &str = "AniList";
pub const PROVIDER_MYANIMELIST: &str = "MyAnimeList";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonKind {
    Actor,
    Director,
    Writer,
    Producer,
    Composer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonInfo {
    pub name: String,
    pub role: Option<String>,
    pub kind: PersonKind,
}

impl PersonInfo {
    pub fn new(name: impl Into<String>, role: Option<String>, kind: PersonKind) -> Self {
        Self {
            name: name.into(),
            role,
            kind,
        }
    }
}

/// A single source's normalized view of a series.
///
/// `None` means the source did not say; an empty collection means it said
/// nothing is there. A source that did not answer produces no `SeriesInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content_rating: Option<String>,
    pub runtime_ticks: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub air_time: Option<String>,
    pub air_days: Vec<Weekday>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub people: Vec<PersonInfo>,
    pub community_rating: Option<f32>,
    pub vote_count: Option<i32>,
    pub external_providers: HashMap<String, String>,
}

/// Fields a user can pin against automatic overwrites.
///
/// Derived fields (status, production year, community rating) are not
/// lockable here; they are recomputed on every merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetadataField {
    Name,
    Overview,
    OfficialRating,
    Runtime,
    PremiereDate,
    EndDate,
    AirTime,
    AirDays,
    Genres,
    Studios,
    Cast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    Continuing,
    Ended,
}

/// The persisted series record owned by the host and mutated in place by a
/// refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Series {
    pub name: Option<String>,
    pub overview: Option<String>,
    pub official_rating: Option<String>,
    pub run_time_ticks: Option<i64>,
    pub premiere_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub air_time: Option<String>,
    pub air_days: Vec<Weekday>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub people: Vec<PersonInfo>,
    pub community_rating: Option<f32>,
    pub vote_count: Option<i32>,
    pub status: Option<SeriesStatus>,
    pub production_year: Option<i32>,
    pub locked_fields: BTreeSet<MetadataField>,
    pub provider_ids: BTreeMap<String, String>,
    pub dont_fetch_meta: bool,
    pub date_modified: Option<DateTime<Utc>>,
    pub last_refreshed_utc: Option<DateTime<Utc>>,
    /// Merge-rule version that produced `last_refreshed_utc`.
    pub provider_version: Option<String>,
}

impl Series {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_locked(&self, field: MetadataField) -> bool {
        self.locked_fields.contains(&field)
    }

    pub fn provider_id(&self, provider: &str) -> Option<&str> {
        self.provider_ids
            .get(provider)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Appends a genre unless it is already present (case-insensitive).
    pub fn add_genre(&mut self, genre: &str) {
        if !contains_ignore_case(&self.genres, genre) {
            self.genres.push(genre.to_string());
        }
    }

    /// Appends a studio unless it is already present (case-insensitive).
    pub fn add_studio(&mut self, studio: &str) {
        if !contains_ignore_case(&self.studios, studio) {
            self.studios.push(studio.to_string());
        }
    }

    /// Appends a person unless one with the same name and kind exists.
    pub fn add_person(&mut self, person: PersonInfo) {
        let exists = self
            .people
            .iter()
            .any(|p| p.kind == person.kind && p.name.eq_ignore_ascii_case(&person.name));
        if !exists {
            self.people.push(person);
        }
    }
}

fn contains_ignore_case(items: &[String], value: &str) -> bool {
    let value = value.trim();
    items.iter().any(|i| i.trim().eq_ignore_ascii_case(value))
}
