use crate::infra::{
    seed_candidates, seed_positions, InMemoryCandidateStore, InMemoryPositionDirectory,
};
use chrono::Utc;
use clap::Args;
use recruit_pipeline::error::AppError;
use recruit_pipeline::workflows::pipeline::{
    available_actions, available_actions_for, color, label, resolve, CandidateId, ExtraFilters,
    InMemoryTransitionLog, PerformerId, PipelineService, PipelineServiceError, PositionId,
    SortKey, Stage, StageCount, WorkflowAction, WorkflowError,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Only show the actions available from this stage
    #[arg(long)]
    pub(crate) stage: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Position to select before walking the pipeline
    #[arg(long, default_value = "pos-backend")]
    pub(crate) position: String,
    /// Reviewer recorded on every transition
    #[arg(long, default_value = "demo-reviewer")]
    pub(crate) reviewer: String,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            position: "pos-backend".to_string(),
            reviewer: "demo-reviewer".to_string(),
        }
    }
}

type DemoService = PipelineService<InMemoryCandidateStore, InMemoryTransitionLog>;

pub(crate) fn print_catalog(args: CatalogArgs) {
    if let Some(raw) = args.stage {
        let actions = available_actions_for(&raw);
        match Stage::parse(&raw) {
            Some(stage) => {
                println!("{} ({})", stage.label(), color(stage));
                if actions.is_empty() {
                    println!("  terminal stage, no actions");
                }
                for action in actions {
                    println!(
                        "  - {} [{}] -> {}",
                        label(*action),
                        action,
                        action.rule().destination.label()
                    );
                }
            }
            None => {
                let known: Vec<&str> = Stage::ordered()
                    .iter()
                    .map(|stage| stage.as_str())
                    .collect();
                println!("Unknown stage '{raw}'. Known stages: {}", known.join(", "));
            }
        }
        return;
    }

    println!("Candidate pipeline catalog");
    for stage in Stage::ordered() {
        let actions: Vec<String> = available_actions(stage)
            .iter()
            .map(|action| format!("{} -> {}", label(*action), action.rule().destination))
            .collect();
        let marker = if stage.is_terminal() { " (terminal)" } else { "" };
        println!(
            "- {:<14} {:<7}{marker} {}",
            stage.as_str(),
            color(stage),
            if actions.is_empty() {
                "no actions".to_string()
            } else {
                actions.join(" | ")
            }
        );
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { position, reviewer } = args;
    let reviewer = PerformerId(reviewer);

    let store = Arc::new(InMemoryCandidateStore::seeded(seed_candidates(Utc::now())));
    let service: DemoService = PipelineService::new(
        store,
        Arc::new(InMemoryTransitionLog::default()),
        Arc::new(InMemoryPositionDirectory::new(seed_positions())),
        Default::default(),
    );

    println!("Candidate pipeline demo");
    match service
        .select_position(Some(PositionId(position.clone())))
        .await
    {
        Ok(Some(selected)) => println!(
            "Selected position: {} ({}){}",
            selected.title,
            selected.id,
            selected
                .event_name
                .as_deref()
                .map(|event| format!(" at {event}"))
                .unwrap_or_default()
        ),
        Ok(None) => {}
        Err(PipelineServiceError::UnknownPosition(id)) => {
            println!("Position {id} is not open; showing every position instead");
        }
        Err(other) => {
            println!("Position directory unavailable: {other}");
            return Ok(());
        }
    }

    render_counts("Pipeline before review", &service.stage_counts(None).await?);

    let applied = service
        .query(
            Stage::Applied,
            ExtraFilters {
                sort: Some(SortKey::Oldest),
                ..ExtraFilters::default()
            },
        )
        .await;
    if let Some(error) = applied.error() {
        println!("Could not load applicants: {error}");
        return Ok(());
    }

    println!("\nApplied (oldest first)");
    for candidate in applied.items() {
        let raw = candidate
            .stage
            .as_deref()
            .or(candidate.status.as_deref())
            .unwrap_or("-");
        let score = candidate
            .evaluation()
            .and_then(|evaluation| evaluation.get("overallScore"))
            .map(|score| format!(" | score {score}"))
            .unwrap_or_default();
        println!(
            "- {} {} (stored as '{raw}'){score}",
            candidate.id,
            candidate.name
        );
    }

    let Some(first) = applied.items().into_iter().next() else {
        println!("No applicants waiting for review.");
        return Ok(());
    };

    println!("\nWalking {} through the pipeline", first.name);
    let steps = [
        (WorkflowAction::StartScreening, "phone screen booked"),
        (WorkflowAction::Shortlist, "strong systems background"),
        (WorkflowAction::Hire, "skipping ahead"),
        (WorkflowAction::ScheduleInterview, "panel on Thursday"),
    ];
    for (action, note) in steps {
        match service
            .perform(&applied, &first.id, action, &reviewer, note)
            .await
        {
            Ok(outcome) => println!(
                "- {}: {} -> {}",
                label(action),
                outcome.record.from_stage.label(),
                resolve(&outcome.candidate).label()
            ),
            Err(WorkflowError::InvalidTransition { stage, .. }) => {
                let allowed: Vec<&str> = available_actions(stage)
                    .iter()
                    .map(|next| next.label())
                    .collect();
                println!(
                    "- {}: refused while {} (allowed: {})",
                    label(action),
                    stage.label(),
                    allowed.join(", ")
                );
            }
            Err(err) => println!("- {}: {err}", label(action)),
        }
    }
    println!(
        "Applied view now holds {} candidate(s)",
        applied.items().len()
    );
    applied.close();

    let legacy = CandidateId("cand-1004".to_string());
    if let Ok(candidate) = service.candidate(&legacy).await {
        println!(
            "\nLegacy record {} stored as '{}' resolves to {}",
            candidate.name,
            candidate.status.as_deref().unwrap_or("-"),
            resolve(&candidate).label()
        );
    }

    println!("\nTransition log for {}", first.name);
    for entry in service.history(&first.id) {
        println!(
            "- {} {} by {}: {} -> {}{}",
            entry.at.format("%Y-%m-%d %H:%M"),
            entry.action,
            entry.performer,
            entry.from_stage,
            entry.to_stage,
            if entry.note.is_empty() {
                String::new()
            } else {
                format!(" ({})", entry.note)
            }
        );
    }

    render_counts(
        "\nPipeline after review",
        &service.stage_counts(None).await?,
    );
    Ok(())
}

fn render_counts(title: &str, counts: &[StageCount]) {
    println!("{title}");
    for entry in counts.iter().filter(|entry| entry.count > 0) {
        println!("  - {:<16} {}", entry.label, entry.count);
    }
}
