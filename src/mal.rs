use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Settings;
use crate::model::{Series, SeriesInfo, PROVIDER_MYANIMELIST, TICKS_PER_MINUTE};
use crate::source::{unless_cancelled, SeriesSource, SourceError};
use crate::text::clean_synopsis;

const JIKAN_BASE: &str = "https://api.jikan.moe/v4";

/// Tracker-style source: MyAnimeList, read through the public Jikan API.
#[derive(Debug, Clone)]
pub struct MalSource {
    client: Client,
    prefer_english_titles: bool,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Anime {
    mal_id: i32,
    title: Option<String>,
    title_english: Option<String>,
    synopsis: Option<String>,
    rating: Option<String>,
    duration: Option<String>,
    aired: Option<Aired>,
    broadcast: Option<Broadcast>,
    #[serde(default)]
    genres: Vec<Named>,
    #[serde(default)]
    studios: Vec<Named>,
    score: Option<f32>,
    scored_by: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Aired {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Broadcast {
    day: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    mal_id: i32,
    title: Option<String>,
    title_english: Option<String>,
}

impl MalSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let user_agent = format!("animelink/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(settings.http_timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build Jikan HTTP client")?;
        Ok(Self {
            client,
            prefer_english_titles: settings.prefer_english_titles,
        })
    }

    /// `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("Jikan request failed")?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = res.text().await.context("Reading Jikan body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {} {}", url, status, text));
        }
        let parsed = serde_json::from_str(&text).context("Jikan JSON parse failed")?;
        Ok(Some(parsed))
    }

    async fn search_id(&self, query: &str) -> Result<Option<i32>> {
        let url = format!(
            "{JIKAN_BASE}/anime?q={}&limit=5",
            urlencoding::encode(query)
        );
        let hits: Vec<SearchHit> = self
            .get_json::<Envelope<Vec<SearchHit>>>(&url)
            .await?
            .map(|e| e.data)
            .unwrap_or_default();
        let normalized = query.trim().to_lowercase();
        let exact = hits.iter().find(|h| {
            [h.title.as_deref(), h.title_english.as_deref()]
                .into_iter()
                .flatten()
                .any(|t| t.trim().to_lowercase() == normalized)
        });
        Ok(exact.or_else(|| hits.first()).map(|h| h.mal_id))
    }

    async fn fetch_anime(&self, id: i32) -> Result<Option<Anime>> {
        let url = format!("{JIKAN_BASE}/anime/{id}/full");
        Ok(self
            .get_json::<Envelope<Anime>>(&url)
            .await?
            .map(|e| e.data))
    }
}

#[async_trait]
impl SeriesSource for MalSource {
    fn name(&self) -> &'static str {
        "MyAnimeList"
    }

    async fn find_series_info(
        &self,
        series: &Series,
        cancel: &CancellationToken,
    ) -> Result<SeriesInfo, SourceError> {
        let known = series
            .provider_id(PROVIDER_MYANIMELIST)
            .and_then(|s| s.trim().parse::<i32>().ok());
        let id = match known {
            Some(id) => id,
            None => {
                let name = series
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        SourceError::NotFound("series has no name or MyAnimeList id".into())
                    })?;
                unless_cancelled(cancel, self.search_id(name))
                    .await?
                    .ok_or_else(|| SourceError::NotFound(format!("no MyAnimeList match for '{}'", name)))?
            }
        };
        debug!("Fetching MyAnimeList entry {}", id);
        let anime = unless_cancelled(cancel, self.fetch_anime(id))
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("MyAnimeList has no entry {}", id)))?;
        Ok(map_anime(anime, self.prefer_english_titles))
    }
}

fn map_anime(anime: Anime, prefer_english: bool) -> SeriesInfo {
    let pick = |s: Option<String>| s.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let english = pick(anime.title_english);
    let default = pick(anime.title);
    let name = if prefer_english {
        english.or(default)
    } else {
        default.or(english)
    };

    let (start_date, end_date) = anime
        .aired
        .map(|a| {
            (
                a.from.as_deref().and_then(iso_date),
                a.to.as_deref().and_then(iso_date),
            )
        })
        .unwrap_or_default();

    let (air_days, air_time) = match anime.broadcast {
        Some(b) => (
            b.day.as_deref().and_then(weekday_from_plural).into_iter().collect(),
            b.time.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        ),
        None => (Vec::new(), None),
    };

    let mut external_providers = HashMap::new();
    external_providers.insert(PROVIDER_MYANIMELIST.to_string(), anime.mal_id.to_string());

    SeriesInfo {
        name,
        description: anime.synopsis.as_deref().and_then(clean_synopsis),
        content_rating: anime.rating.as_deref().and_then(rating_code),
        runtime_ticks: anime
            .duration
            .as_deref()
            .and_then(duration_minutes)
            .and_then(|m| m.checked_mul(TICKS_PER_MINUTE)),
        start_date,
        end_date,
        air_time,
        air_days,
        genres: anime.genres.into_iter().map(|g| g.name).collect(),
        studios: anime.studios.into_iter().map(|s| s.name).collect(),
        people: Vec::new(),
        community_rating: anime.score,
        vote_count: anime.scored_by,
        external_providers,
    }
}

fn iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()
}

/// "PG-13 - Teens 13 or older" -> "PG-13".
fn rating_code(value: &str) -> Option<String> {
    let code = value.split(" - ").next()?.trim();
    if code.is_empty() || code.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(code.to_string())
    }
}

/// Parses "24 min per ep", "1 hr 55 min" and similar into whole minutes.
/// Values that overflow read as unknown.
fn duration_minutes(value: &str) -> Option<i64> {
    let mut total = 0i64;
    let mut pending: Option<i64> = None;
    for token in value.split_whitespace() {
        if let Ok(n) = token.parse::<i64>() {
            pending = Some(n);
            continue;
        }
        let Some(n) = pending.take() else {
            continue;
        };
        let minutes = match token.trim_end_matches('.').to_ascii_lowercase().as_str() {
            "hr" | "hrs" | "hour" | "hours" => n.checked_mul(60)?,
            "min" | "mins" | "minute" | "minutes" => n,
            _ => continue,
        };
        total = total.checked_add(minutes)?;
    }
    (total > 0).then_some(total)
}

fn weekday_from_plural(day: &str) -> Option<Weekday> {
    let prefix = day.trim().get(..3)?.to_ascii_lowercase();
    match prefix.as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}
