use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::catalog::WorkflowAction;

/// Opaque identifier assigned by the candidate store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an open position (job) within a recruitment event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub String);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the reviewer executing an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformerId(pub String);

impl fmt::Display for PerformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate record as persisted by the store.
///
/// `status` is the legacy free-text field and `stage` the canonical one; both are kept raw so
/// records written by older screens round-trip untouched. Use [`super::stage::resolve`] to get
/// the single canonical [`Stage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(alias = "positionId")]
    pub position_id: PositionId,
    #[serde(
        default,
        alias = "positionTitle",
        skip_serializing_if = "Option::is_none"
    )]
    pub position_title: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub stage: Option<String>,
    /// Produced by the external evaluation service; holds zero or one element.
    #[serde(
        rename = "evaluationData",
        alias = "evaluation_data",
        default,
        deserialize_with = "list_or_empty"
    )]
    pub evaluation_data: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: BTreeMap<String, Value>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        position_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CandidateId(id.into()),
            name: name.into(),
            email: None,
            phone: None,
            position_id: PositionId(position_id.into()),
            position_title: None,
            status: None,
            stage: None,
            evaluation_data: Vec::new(),
            created_at,
            updated_at: created_at,
            profile: BTreeMap::new(),
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage.as_str().to_string());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_position_title(mut self, title: impl Into<String>) -> Self {
        self.position_title = Some(title.into());
        self
    }

    pub fn evaluation(&self) -> Option<&Value> {
        self.evaluation_data.first()
    }
}

/// Non-string stage values (numbers, objects, `null`) read as absent.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Some(raw),
        _ => None,
    })
}

fn list_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    })
}

/// Canonical pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Applied,
    Screened,
    Shortlisted,
    Interviewing,
    FinalReview,
    OfferPending,
    OnHold,
    Rejected,
    Hired,
}

impl Stage {
    pub const COUNT: usize = 9;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Applied,
            Self::Screened,
            Self::Shortlisted,
            Self::Interviewing,
            Self::FinalReview,
            Self::OfferPending,
            Self::OnHold,
            Self::Rejected,
            Self::Hired,
        ]
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Screened => "screened",
            Self::Shortlisted => "shortlisted",
            Self::Interviewing => "interviewing",
            Self::FinalReview => "final_review",
            Self::OfferPending => "offer_pending",
            Self::OnHold => "on_hold",
            Self::Rejected => "rejected",
            Self::Hired => "hired",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Screened => "Screened",
            Self::Shortlisted => "Shortlisted",
            Self::Interviewing => "Interviewing",
            Self::FinalReview => "Final Review",
            Self::OfferPending => "Offer Pending",
            Self::OnHold => "On Hold",
            Self::Rejected => "Rejected",
            Self::Hired => "Hired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Hired)
    }

    /// Parse a canonical stage name. Separators and case are normalised, so `Final-Review`
    /// and `final_review` are the same stage; anything else is unrecognised.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = normalize_key(raw, '_');
        Self::ordered()
            .into_iter()
            .find(|stage| stage.as_str() == key)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase, trim, and collapse `-`, `_` and whitespace runs into `separator`.
pub(crate) fn normalize_key(raw: &str, separator: char) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending = false;
    for ch in raw.trim().chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending = !key.is_empty();
            continue;
        }
        if pending {
            key.push(separator);
            pending = false;
        }
        key.push(ch.to_ascii_lowercase());
    }
    key
}

/// Append-only audit entry written once per committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub candidate_id: CandidateId,
    pub action: WorkflowAction,
    pub performer: PerformerId,
    #[serde(default)]
    pub note: String,
    pub at: DateTime<Utc>,
    pub from_stage: Stage,
    pub to_stage: Stage,
}

/// Directory entry used to populate the position selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    #[serde(default, alias = "eventName", skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}
