use chrono::Datelike;
use std::collections::BTreeSet;
use tracing::debug;

use crate::coordinator::SourceContribution;
use crate::model::{MetadataField, Series, SeriesInfo, SeriesStatus};
use crate::source::SourceSlot;

pub mod policy;

pub use policy::{chain, Candidate, ANIMATION_GENRE, RATING_PRECEDENCE};

/// The per-slot snapshots a merge reads from. Empty slots are sources that
/// did not answer.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    slots: [Option<SeriesInfo>; 3],
}

impl SourceSet {
    pub fn new(
        primary: Option<SeriesInfo>,
        secondary: Option<SeriesInfo>,
        tertiary: Option<SeriesInfo>,
    ) -> Self {
        Self {
            slots: [primary, secondary, tertiary],
        }
    }

    pub fn from_contributions(contributions: Vec<SourceContribution>) -> Self {
        let mut set = Self::default();
        for c in contributions {
            set.slots[c.slot.index()] = Some(c.info);
        }
        set
    }

    pub fn get(&self, slot: SourceSlot) -> Option<&SeriesInfo> {
        self.slots[slot.index()].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Reconciles `series` against the fetched snapshots in place.
///
/// Locked fields are never touched. With no contributing source only the
/// derived fields are recomputed.
pub fn merge_series_info(series: &mut Series, sources: &SourceSet, locked: &BTreeSet<MetadataField>) {
    if !sources.is_empty() {
        merge_scalars(series, sources, locked);
        merge_collections(series, sources, locked);
    }
    apply_derived(series, sources);
}

fn merge_scalars(series: &mut Series, sources: &SourceSet, locked: &BTreeSet<MetadataField>) {
    resolve_scalar(&mut series.name, MetadataField::Name, sources, locked, |i| {
        i.name.as_ref()
    });
    resolve_scalar(&mut series.overview, MetadataField::Overview, sources, locked, |i| {
        i.description.as_ref()
    });
    resolve_scalar(
        &mut series.official_rating,
        MetadataField::OfficialRating,
        sources,
        locked,
        |i| i.content_rating.as_ref(),
    );
    resolve_scalar(&mut series.run_time_ticks, MetadataField::Runtime, sources, locked, |i| {
        i.runtime_ticks.as_ref()
    });
    resolve_scalar(
        &mut series.premiere_date,
        MetadataField::PremiereDate,
        sources,
        locked,
        |i| i.start_date.as_ref(),
    );
    resolve_scalar(&mut series.end_date, MetadataField::EndDate, sources, locked, |i| {
        i.end_date.as_ref()
    });
    resolve_scalar(&mut series.air_time, MetadataField::AirTime, sources, locked, |i| {
        i.air_time.as_ref()
    });
}

fn merge_collections(series: &mut Series, sources: &SourceSet, locked: &BTreeSet<MetadataField>) {
    if !locked.contains(&MetadataField::Cast) {
        let people = first_non_empty(MetadataField::Cast, &series.people, sources, |i| &i.people);
        series.people.clear();
        for person in people {
            series.add_person(person);
        }
    }

    if !locked.contains(&MetadataField::Genres) {
        let genres = first_non_empty(MetadataField::Genres, &series.genres, sources, |i| &i.genres);
        series.genres.clear();
        for genre in &genres {
            series.add_genre(genre);
        }
        series.add_genre(ANIMATION_GENRE);
    }

    if !locked.contains(&MetadataField::Studios) {
        let studios =
            first_non_empty(MetadataField::Studios, &series.studios, sources, |i| &i.studios);
        series.studios.clear();
        for studio in &studios {
            series.add_studio(studio);
        }
    }

    if !locked.contains(&MetadataField::AirDays) {
        series.air_days =
            first_non_empty(MetadataField::AirDays, &series.air_days, sources, |i| &i.air_days);
    }
}

fn apply_derived(series: &mut Series, sources: &SourceSet) {
    series.status = Some(if series.end_date.is_some() {
        SeriesStatus::Ended
    } else {
        SeriesStatus::Continuing
    });

    if series.production_year.is_none() {
        series.production_year = series.premiere_date.map(|d| d.year());
    }

    if let Some(info) = most_voted(sources) {
        if info.vote_count.unwrap_or(0) > 0 {
            series.community_rating = info.community_rating;
            series.vote_count = info.vote_count;
        }
    }
}

/// The source with the highest vote count; ties go to the earlier entry in
/// [`RATING_PRECEDENCE`].
pub fn most_voted(sources: &SourceSet) -> Option<&SeriesInfo> {
    RATING_PRECEDENCE
        .iter()
        .filter_map(|slot| sources.get(*slot))
        .fold(None, |best: Option<&SeriesInfo>, info| match best {
            Some(b) if info.vote_count.unwrap_or(0) <= b.vote_count.unwrap_or(0) => Some(b),
            _ => Some(info),
        })
}

fn resolve_scalar<T, F>(
    target: &mut Option<T>,
    field: MetadataField,
    sources: &SourceSet,
    locked: &BTreeSet<MetadataField>,
    pick: F,
) where
    T: Clone + std::fmt::Debug,
    F: Fn(&SeriesInfo) -> Option<&T>,
{
    if locked.contains(&field) {
        return;
    }
    let resolved = chain(field).iter().find_map(|candidate| match candidate {
        Candidate::Existing => target.clone(),
        Candidate::Source(slot) => sources.get(*slot).and_then(&pick).cloned(),
    });
    debug!(field = ?field, value = ?resolved, "Resolved field");
    *target = resolved;
}

fn first_non_empty<T, F>(
    field: MetadataField,
    current: &[T],
    sources: &SourceSet,
    pick: F,
) -> Vec<T>
where
    T: Clone,
    F: Fn(&SeriesInfo) -> &Vec<T>,
{
    chain(field)
        .iter()
        .map(|candidate| match candidate {
            Candidate::Existing => current,
            Candidate::Source(slot) => sources.get(*slot).map(|i| pick(i).as_slice()).unwrap_or(&[]),
        })
        .find(|items| !items.is_empty())
        .map(|items| items.to_vec())
        .unwrap_or_default()
}
