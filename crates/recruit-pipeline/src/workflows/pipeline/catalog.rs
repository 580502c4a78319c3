//! Static stage → action table and the action → outcome rules behind it.
//!
//! Both tables are defined once here. The executor validates against [`ActionRule::origins`]
//! and screens render [`available_actions`]; a `const` assertion at the bottom of this file
//! rejects any edit that lets the two drift apart or leaves a stage unreachable.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{normalize_key, Stage};

/// Named operation a reviewer performs on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum WorkflowAction {
    StartScreening,
    Shortlist,
    ScheduleInterview,
    StartFinalReview,
    MakeOffer,
    PutOnHold,
    Reactivate,
    Hire,
    Reject,
}

/// Outcome table entry for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRule {
    pub origins: &'static [Stage],
    pub destination: Stage,
    /// Legacy `status` value persisted alongside the canonical stage.
    pub status: &'static str,
}

impl ActionRule {
    pub fn allows(&self, stage: Stage) -> bool {
        self.origins.contains(&stage)
    }
}

impl WorkflowAction {
    pub const COUNT: usize = 9;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::StartScreening,
            Self::Shortlist,
            Self::ScheduleInterview,
            Self::StartFinalReview,
            Self::MakeOffer,
            Self::PutOnHold,
            Self::Reactivate,
            Self::Hire,
            Self::Reject,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartScreening => "start-screening",
            Self::Shortlist => "shortlist",
            Self::ScheduleInterview => "schedule-interview",
            Self::StartFinalReview => "start-final-review",
            Self::MakeOffer => "make-offer",
            Self::PutOnHold => "put-on-hold",
            Self::Reactivate => "reactivate",
            Self::Hire => "hire",
            Self::Reject => "reject",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::StartScreening => "Start Screening",
            Self::Shortlist => "Shortlist",
            Self::ScheduleInterview => "Schedule Interview",
            Self::StartFinalReview => "Move to Final Review",
            Self::MakeOffer => "Make Offer",
            Self::PutOnHold => "Put on Hold",
            Self::Reactivate => "Reactivate",
            Self::Hire => "Mark as Hired",
            Self::Reject => "Reject",
        }
    }

    pub const fn rule(self) -> ActionRule {
        match self {
            Self::StartScreening => ActionRule {
                origins: &[Stage::Applied],
                destination: Stage::Screened,
                status: "screening",
            },
            Self::Shortlist => ActionRule {
                origins: &[Stage::Applied, Stage::Screened],
                destination: Stage::Shortlisted,
                status: "shortlisted",
            },
            Self::ScheduleInterview => ActionRule {
                origins: &[Stage::Shortlisted],
                destination: Stage::Interviewing,
                status: "interview-scheduled",
            },
            Self::StartFinalReview => ActionRule {
                origins: &[Stage::Interviewing],
                destination: Stage::FinalReview,
                status: "final-review",
            },
            Self::MakeOffer => ActionRule {
                origins: &[Stage::Shortlisted, Stage::Interviewing, Stage::FinalReview],
                destination: Stage::OfferPending,
                status: "offer-made",
            },
            Self::PutOnHold => ActionRule {
                origins: &[
                    Stage::Screened,
                    Stage::Shortlisted,
                    Stage::Interviewing,
                    Stage::FinalReview,
                    Stage::OfferPending,
                ],
                destination: Stage::OnHold,
                status: "on-hold",
            },
            Self::Reactivate => ActionRule {
                origins: &[Stage::OnHold],
                destination: Stage::Shortlisted,
                status: "shortlisted",
            },
            Self::Hire => ActionRule {
                origins: &[Stage::OfferPending],
                destination: Stage::Hired,
                status: "hired",
            },
            Self::Reject => ActionRule {
                origins: &[
                    Stage::Applied,
                    Stage::Screened,
                    Stage::Shortlisted,
                    Stage::Interviewing,
                    Stage::FinalReview,
                    Stage::OfferPending,
                    Stage::OnHold,
                ],
                destination: Stage::Rejected,
                status: "rejected",
            },
        }
    }

    /// Parse an action name. `_` and `-` are interchangeable and `start-interview` is accepted
    /// as the older name of `schedule-interview`.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = normalize_key(raw, '-');
        if key == "start-interview" {
            return Some(Self::ScheduleInterview);
        }
        Self::ordered()
            .into_iter()
            .find(|action| action.as_str() == key)
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workflow action '{0}'")]
pub struct UnknownAction(pub String);

impl TryFrom<String> for WorkflowAction {
    type Error = UnknownAction;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownAction(value))
    }
}

/// Actions offered at `stage`, primary action first. Terminal stages offer nothing.
pub const fn available_actions(stage: Stage) -> &'static [WorkflowAction] {
    use WorkflowAction::*;
    match stage {
        Stage::Applied => &[StartScreening, Shortlist, Reject],
        Stage::Screened => &[Shortlist, PutOnHold, Reject],
        Stage::Shortlisted => &[ScheduleInterview, MakeOffer, PutOnHold, Reject],
        Stage::Interviewing => &[StartFinalReview, MakeOffer, PutOnHold, Reject],
        Stage::FinalReview => &[MakeOffer, PutOnHold, Reject],
        Stage::OfferPending => &[Hire, PutOnHold, Reject],
        Stage::OnHold => &[Reactivate, Reject],
        Stage::Rejected | Stage::Hired => &[],
    }
}

/// Lookup by raw stage name; an unknown stage yields no actions rather than an error.
pub fn available_actions_for(raw_stage: &str) -> &'static [WorkflowAction] {
    match Stage::parse(raw_stage) {
        Some(stage) => available_actions(stage),
        None => &[],
    }
}

pub fn label(action: WorkflowAction) -> &'static str {
    action.label()
}

/// Display hint for stage badges.
pub const fn color(stage: Stage) -> &'static str {
    match stage {
        Stage::Applied => "blue",
        Stage::Screened => "indigo",
        Stage::Shortlisted => "purple",
        Stage::Interviewing => "amber",
        Stage::FinalReview => "orange",
        Stage::OfferPending => "teal",
        Stage::OnHold => "gray",
        Stage::Rejected => "red",
        Stage::Hired => "green",
    }
}

const fn same_stage(a: Stage, b: Stage) -> bool {
    a as usize == b as usize
}

const fn same_action(a: WorkflowAction, b: WorkflowAction) -> bool {
    a as usize == b as usize
}

const fn has_stage(list: &[Stage], stage: Stage) -> bool {
    let mut i = 0;
    while i < list.len() {
        if same_stage(list[i], stage) {
            return true;
        }
        i += 1;
    }
    false
}

const fn count_action(list: &[WorkflowAction], action: WorkflowAction) -> usize {
    let mut i = 0;
    let mut found = 0;
    while i < list.len() {
        if same_action(list[i], action) {
            found += 1;
        }
        i += 1;
    }
    found
}

/// The stage lists and the rule origins describe the same edge set, terminal stages are
/// sinks, and every other stage has at least one way out.
const fn tables_agree() -> bool {
    let stages = Stage::ordered();
    let actions = WorkflowAction::ordered();

    let mut s = 0;
    while s < stages.len() {
        let stage = stages[s];
        let offered = available_actions(stage);
        if stage.is_terminal() != (offered.is_empty()) {
            return false;
        }

        let mut a = 0;
        while a < actions.len() {
            let action = actions[a];
            let listed = count_action(offered, action);
            if listed > 1 {
                return false;
            }
            if (listed == 1) != has_stage(action.rule().origins, stage) {
                return false;
            }
            a += 1;
        }
        s += 1;
    }

    let mut a = 0;
    while a < actions.len() {
        if actions[a].rule().origins.is_empty() {
            return false;
        }
        a += 1;
    }
    true
}

const fn every_stage_reachable() -> bool {
    let stages = Stage::ordered();
    let mut reached = [false; Stage::COUNT];
    reached[Stage::Applied.index()] = true;

    let mut changed = true;
    while changed {
        changed = false;
        let mut s = 0;
        while s < stages.len() {
            if reached[s] {
                let offered = available_actions(stages[s]);
                let mut a = 0;
                while a < offered.len() {
                    let next = offered[a].rule().destination.index();
                    if !reached[next] {
                        reached[next] = true;
                        changed = true;
                    }
                    a += 1;
                }
            }
            s += 1;
        }
    }

    let mut s = 0;
    while s < reached.len() {
        if !reached[s] {
            return false;
        }
        s += 1;
    }
    true
}

const _: () = assert!(
    tables_agree(),
    "stage action lists disagree with action origin rules"
);
const _: () = assert!(
    every_stage_reachable(),
    "a pipeline stage is unreachable from applied"
);
