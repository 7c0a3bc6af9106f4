//! Per-field source precedence, kept as data so the editorial trust order
//! can be read (and tested) in one place.

use crate::model::MetadataField;
use crate::source::SourceSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Existing,
    Source(SourceSlot),
}

const PRIMARY: Candidate = Candidate::Source(SourceSlot::Primary);
const SECONDARY: Candidate = Candidate::Source(SourceSlot::Secondary);
const TERTIARY: Candidate = Candidate::Source(SourceSlot::Tertiary);
const EXISTING: Candidate = Candidate::Existing;

/// Literal genre every merged series carries.
pub const ANIMATION_GENRE: &str = "Animation";

/// Order in which sources compete for community rating; the first source
/// holding the strictly highest vote count wins.
pub const RATING_PRECEDENCE: [SourceSlot; 3] = [
    SourceSlot::Primary,
    SourceSlot::Tertiary,
    SourceSlot::Secondary,
];

/// Candidate order for a field. Scalars take the first present value,
/// collections the first non-empty one.
pub fn chain(field: MetadataField) -> &'static [Candidate] {
    match field {
        MetadataField::Name => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
        MetadataField::Overview => &[EXISTING, SECONDARY, TERTIARY, PRIMARY],
        MetadataField::OfficialRating => &[EXISTING, PRIMARY, SECONDARY, TERTIARY],
        MetadataField::Runtime => &[PRIMARY, EXISTING, SECONDARY, TERTIARY],
        MetadataField::PremiereDate => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
        MetadataField::EndDate => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
        MetadataField::AirTime => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
        MetadataField::AirDays => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
        MetadataField::Genres => &[TERTIARY, SECONDARY, EXISTING, PRIMARY],
        MetadataField::Studios => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
        MetadataField::Cast => &[PRIMARY, SECONDARY, TERTIARY, EXISTING],
    }
}
