//! Normalises a candidate's persisted `stage`/`status` pair into one canonical [`Stage`].

use super::domain::{normalize_key, Candidate, Stage};

/// Legacy `status` values written by older screens, keyed by their normalised spelling.
pub const LEGACY_STATUS_TABLE: &[(&str, Stage)] = &[
    ("new", Stage::Applied),
    ("applied", Stage::Applied),
    ("pending", Stage::Applied),
    ("screening", Stage::Screened),
    ("screened", Stage::Screened),
    ("under-review", Stage::Screened),
    ("shortlisted", Stage::Shortlisted),
    ("interview-scheduled", Stage::Interviewing),
    ("interviewing", Stage::Interviewing),
    ("interviewed", Stage::Interviewing),
    ("final-review", Stage::FinalReview),
    ("offer-made", Stage::OfferPending),
    ("offer-pending", Stage::OfferPending),
    ("offered", Stage::OfferPending),
    ("on-hold", Stage::OnHold),
    ("rejected", Stage::Rejected),
    ("declined", Stage::Rejected),
    ("hired", Stage::Hired),
    ("offer-accepted", Stage::Hired),
];

/// Resolve the canonical stage of a candidate.
///
/// A recognised `stage` field wins; otherwise the legacy `status` is looked up in
/// [`LEGACY_STATUS_TABLE`]. Missing or unrecognised data resolves to [`Stage::Applied`].
pub fn resolve(candidate: &Candidate) -> Stage {
    candidate
        .stage
        .as_deref()
        .and_then(Stage::parse)
        .or_else(|| candidate.status.as_deref().and_then(resolve_status))
        .unwrap_or(Stage::Applied)
}

/// Look up a legacy status value; `None` when the value is not in the table.
pub fn resolve_status(status: &str) -> Option<Stage> {
    let key = normalize_key(status, '-');
    LEGACY_STATUS_TABLE
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, stage)| *stage)
}
