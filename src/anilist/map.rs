use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use std::collections::HashMap;

use super::client::{AiringEpisode, FuzzyDate, Media, MediaTitle, NamedNode};
use crate::model::{
    PersonInfo, PersonKind, SeriesInfo, PROVIDER_ANILIST, PROVIDER_MYANIMELIST, TICKS_PER_MINUTE,
};
use crate::text::clean_synopsis;

/// Broadcast schedules are published in Japan time.
const JST_OFFSET_SECS: i32 = 9 * 3600;

pub(crate) fn map_media(media: Media, prefer_english: bool) -> SeriesInfo {
    let mut external_providers = HashMap::new();
    external_providers.insert(PROVIDER_ANILIST.to_string(), media.id.to_string());
    if let Some(mal) = media.id_mal {
        external_providers.insert(PROVIDER_MYANIMELIST.to_string(), mal.to_string());
    }

    let (air_days, air_time) = media
        .next_airing_episode
        .as_ref()
        .and_then(broadcast_slot)
        .map(|(day, time)| (vec![day], Some(time)))
        .unwrap_or_default();

    let vote_count = media
        .stats
        .and_then(|s| s.score_distribution)
        .and_then(|buckets| {
            buckets
                .iter()
                .filter_map(|b| b.amount)
                .try_fold(0i32, i32::checked_add)
        });

    SeriesInfo {
        name: choose_title(&media.title.unwrap_or_default(), prefer_english),
        description: media.description.as_deref().and_then(clean_synopsis),
        content_rating: media.is_adult.map(content_rating_from_is_adult),
        runtime_ticks: media
            .duration
            .filter(|d| *d > 0)
            .and_then(|d| i64::from(d).checked_mul(TICKS_PER_MINUTE)),
        start_date: media.start_date.as_ref().and_then(fuzzy_date),
        end_date: media.end_date.as_ref().and_then(fuzzy_date),
        air_time,
        air_days,
        genres: media.genres.unwrap_or_default(),
        studios: media
            .studios
            .and_then(|s| s.nodes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|n| n.name)
            .collect(),
        people: people(media.characters, media.staff),
        community_rating: media.average_score.map(|s| s as f32 / 10.0),
        vote_count,
        external_providers,
    }
}

/// Keeps only the most relevant Japanese voice actor per character.
/// Characters without a name still yield their actor, with no role.
fn people(
    characters: Option<super::client::CharacterConnection>,
    staff: Option<super::client::StaffConnection>,
) -> Vec<PersonInfo> {
    let mut out = Vec::new();
    for edge in characters.and_then(|c| c.edges).unwrap_or_default() {
        let role = edge.node.and_then(NamedNode::full_name);
        let actor = edge
            .voice_actors
            .and_then(|v| v.into_iter().next())
            .and_then(NamedNode::full_name);
        if let Some(actor) = actor {
            out.push(PersonInfo::new(actor, role, PersonKind::Actor));
        }
    }
    for edge in staff.and_then(|s| s.edges).unwrap_or_default() {
        let Some(kind) = edge.role.as_deref().and_then(staff_kind) else {
            continue;
        };
        if let Some(name) = edge.node.and_then(NamedNode::full_name) {
            out.push(PersonInfo::new(name, edge.role, kind));
        }
    }
    out
}

fn staff_kind(role: &str) -> Option<PersonKind> {
    let role = role.to_ascii_lowercase();
    if role.contains("director") {
        if role.contains("assistant") || role.contains("episode") {
            return None;
        }
        return Some(PersonKind::Director);
    }
    if role.contains("original creator") || role.contains("series composition") {
        return Some(PersonKind::Writer);
    }
    if role == "music" || role.starts_with("music (") {
        return Some(PersonKind::Composer);
    }
    None
}

fn content_rating_from_is_adult(is_adult: bool) -> String {
    let rating = if is_adult { "Adult" } else { "All Audiences" };
    rating.to_string()
}

fn choose_title(title: &MediaTitle, prefer_english: bool) -> Option<String> {
    let clean = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let english = clean(&title.english);
    let romaji = clean(&title.romaji);
    if prefer_english {
        english.or(romaji)
    } else {
        romaji.or(english)
    }
}

fn fuzzy_date(date: &FuzzyDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year?, date.month?, date.day?)
}

fn broadcast_slot(next: &AiringEpisode) -> Option<(Weekday, String)> {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS)?;
    let at = DateTime::from_timestamp(next.airing_at, 0)?.with_timezone(&jst);
    Some((at.weekday(), at.format("%H:%M").to_string()))
}
