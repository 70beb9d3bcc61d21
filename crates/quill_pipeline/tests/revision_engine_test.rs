//! Revision batches: budget halts, validation skips, aborts and commits.

mod test_utils;

use quill_core::{RevisionRequest, SceneSequel, Stage, StageOutput, Story};
use quill_error::{ErrorCategory, ProviderErrorKind, QuillErrorKind, RevisionErrorKind};
use quill_models::CostBudget;
use quill_pipeline::{HaltReason, RevisionEngine, SkipReason, StageRunner};
use quill_storage::{InMemoryProjectStore, ProjectRepository, StageStatus};
use std::sync::Arc;
use test_utils::{MODEL, MockResponse, RoutingProvider, manager, story_provider};

fn scene(number: u32, content: &str) -> SceneSequel {
    SceneSequel {
        number,
        title: format!("Scene {number}"),
        content: content.to_string(),
        pov_character: "Maren".to_string(),
        location: "Lamp room".to_string(),
        time_hours: number as f64,
    }
}

fn story() -> Story {
    Story::new(vec![
        scene(1, "Fog rolled in."),
        scene(2, "She lit the lamp."),
        scene(3, "The harbor was empty."),
    ])
}

#[tokio::test]
async fn cost_hint_over_limit_halts_before_any_call() -> anyhow::Result<()> {
    let provider = Arc::new(RoutingProvider::new().route(
        "Rewrite this scene only",
        r#"{"sceneNumber": 2, "content": "Rewritten."}"#,
    ));
    let manager = manager(Arc::clone(&provider));
    let original = story();
    let requests = vec![RevisionRequest::new(2, "Add dread").with_cost_hint(0.02)];

    let outcome = RevisionEngine::default()
        .apply_revisions(&original, &requests, &manager, MODEL, 0.01, false)
        .await?;

    assert_eq!(outcome.story(), &original);
    assert_eq!(*outcome.applied_count(), 0);
    assert_eq!(outcome.unapplied().len(), 1);
    assert_eq!(outcome.unapplied()[0].request, requests[0]);
    assert_eq!(outcome.unapplied()[0].reason, SkipReason::BudgetExhausted);
    assert_eq!(
        outcome.halt(),
        &Some(HaltReason::BudgetExhausted {
            completed: 0,
            skipped: 1
        })
    );
    assert!(provider.prompts().is_empty());
    Ok(())
}

#[tokio::test]
async fn spend_accumulates_until_limit() -> anyhow::Result<()> {
    let provider = Arc::new(
        RoutingProvider::new()
            .route(r#"Scene 1, ""#, r#"{"sceneNumber": 1, "content": "Thick fog rolled in."}"#)
            .route(r#"Scene 2, ""#, r#"{"sceneNumber": 2, "content": "She lit it."}"#)
            .route(r#"Scene 3, ""#, r#"{"sceneNumber": 3, "content": "Empty."}"#)
            .with_cost(0.004),
    );
    let manager = manager(Arc::clone(&provider));
    let requests = vec![
        RevisionRequest::new(1, "a").with_cost_hint(0.004),
        RevisionRequest::new(2, "b").with_cost_hint(0.004),
        RevisionRequest::new(3, "c").with_cost_hint(0.004),
    ];

    let outcome = RevisionEngine::default()
        .apply_revisions(&story(), &requests, &manager, MODEL, 0.01, true)
        .await?;

    assert_eq!(*outcome.applied_count(), 2);
    assert_eq!(
        outcome.halt(),
        &Some(HaltReason::BudgetExhausted {
            completed: 2,
            skipped: 1
        })
    );
    assert_eq!(outcome.unapplied()[0].request.scene_number, 3);
    assert!((outcome.spent() - 0.008).abs() < 1e-12);
    assert_eq!(outcome.story().scenes[2].content, "The harbor was empty.");
    assert_eq!(outcome.story().total_actual_words, 4 + 3 + 4);
    Ok(())
}

#[tokio::test]
async fn shared_budget_also_limits_batch() -> anyhow::Result<()> {
    let provider = Arc::new(RoutingProvider::new().route(
        "Rewrite this scene only",
        r#"{"sceneNumber": 1, "content": "x"}"#,
    ));
    let manager = manager(Arc::clone(&provider)).with_budget(CostBudget::with_ceiling(0.001)?);
    let requests = vec![RevisionRequest::new(1, "a").with_cost_hint(0.005)];

    let outcome = RevisionEngine::default()
        .apply_revisions(&story(), &requests, &manager, MODEL, 10.0, false)
        .await?;

    assert_eq!(*outcome.applied_count(), 0);
    assert!(outcome.halt().is_some());
    assert!(provider.prompts().is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_replacements_and_missing_scenes_are_skipped() -> anyhow::Result<()> {
    let provider = Arc::new(
        RoutingProvider::new()
            .route(r#"Scene 1, ""#, r#"{"sceneNumber": 2, "content": "Wrong scene."}"#)
            .route(
                r#"Scene 2, ""#,
                r#"{"sceneNumber": 2, "content": "She lit the lamp and waited for the knock."}"#,
            )
            .route(
                r#"Scene 3, ""#,
                r#"[{"sceneNumber": 3, "content": "a"}, {"sceneNumber": 4, "content": "b"}]"#,
            ),
    );
    let manager = manager(Arc::clone(&provider));
    let requests = vec![
        RevisionRequest::new(1, "Darker"),
        RevisionRequest::new(9, "Nonexistent"),
        RevisionRequest::new(2, "Add dread"),
        RevisionRequest::new(3, "Split"),
    ];

    let outcome = RevisionEngine::default()
        .apply_revisions(&story(), &requests, &manager, MODEL, 1.0, false)
        .await?;

    assert_eq!(*outcome.applied_count(), 1);
    assert!(outcome.halt().is_none());
    let skipped: Vec<u32> = outcome
        .unapplied()
        .iter()
        .map(|u| u.request.scene_number)
        .collect();
    assert_eq!(skipped, vec![1, 9, 3]);
    assert_eq!(outcome.unapplied()[1].reason, SkipReason::UnknownScene);
    assert!(matches!(outcome.unapplied()[0].reason, SkipReason::Invalid(_)));

    assert_eq!(outcome.story().scenes[0].content, "Fog rolled in.");
    assert_eq!(
        outcome.story().scenes[1].content,
        "She lit the lamp and waited for the knock."
    );
    assert_eq!(outcome.story().total_actual_words, 3 + 9 + 4);
    assert_eq!(provider.prompts().len(), 3);
    Ok(())
}

#[tokio::test]
async fn permanent_error_aborts_with_progress() -> anyhow::Result<()> {
    let provider = Arc::new(
        RoutingProvider::new()
            .route(r#"Scene 1, ""#, r#"{"sceneNumber": 1, "content": "New fog."}"#)
            .route_sequence(
                r#"Scene 2, ""#,
                vec![MockResponse::Error(ProviderErrorKind::Authentication(
                    "key revoked".to_string(),
                ))],
            ),
    );
    let manager = manager(Arc::clone(&provider));
    let requests = vec![
        RevisionRequest::new(1, "a"),
        RevisionRequest::new(2, "b"),
        RevisionRequest::new(3, "c"),
    ];

    let err = RevisionEngine::default()
        .apply_revisions(&story(), &requests, &manager, MODEL, 1.0, false)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ProviderPermanent);
    let QuillErrorKind::Revision(revision) = err.kind() else {
        panic!("expected revision error, got {err}");
    };
    let RevisionErrorKind::Aborted {
        scene_number,
        applied,
        skipped,
        ..
    } = &revision.kind;
    assert_eq!(*scene_number, 2);
    assert_eq!(*applied, 1);
    assert_eq!(*skipped, 2);
    Ok(())
}

#[tokio::test]
async fn revise_commits_new_prose_version() -> anyhow::Result<()> {
    let provider = Arc::new(
        story_provider()
            .route(
                r#"Scene 2, ""#,
                r#"{"sceneNumber": 2, "content": "She lit the lamp and waited for the knock."}"#,
            )
            .route(r#"Scene 3, ""#, "I would rather not."),
    );
    let store = Arc::new(InMemoryProjectStore::new());
    let runner = StageRunner::new(manager(Arc::clone(&provider)), store.clone());

    let mut project = runner.create_project("The Lighthouse", "").await?;
    runner.run_through(&mut project, Stage::Revision).await?;
    runner.run_stage(&mut project, Stage::Export).await?;

    let outcome = runner.revise(&mut project, 1.0, false).await?;
    assert_eq!(*outcome.applied_count(), 1);
    assert_eq!(outcome.unapplied()[0].request.scene_number, 3);

    // Priority 1 request for scene 2 runs before scene 3
    let revise_prompts: Vec<String> = provider
        .prompts()
        .into_iter()
        .filter(|p| p.contains("Rewrite this scene only"))
        .collect();
    assert!(revise_prompts[0].starts_with("Scene 2,"));

    assert_eq!(project.record(Stage::Prose).map(|r| *r.version()), Some(2));
    assert_eq!(project.status(Stage::Revision), StageStatus::Stale);
    assert_eq!(project.status(Stage::Export), StageStatus::Stale);

    let StageOutput::Prose(story) = project.usable_output(Stage::Prose)? else {
        panic!("expected prose");
    };
    assert_eq!(story.total_actual_words, 3 + 9 + 4 + 3);
    assert_eq!(store.load(*project.id()).await?, project);
    Ok(())
}

#[tokio::test]
async fn nothing_applied_keeps_prose_version() -> anyhow::Result<()> {
    let provider = Arc::new(story_provider().route("Rewrite this scene only", "No JSON here."));
    let store = Arc::new(InMemoryProjectStore::new());
    let runner = StageRunner::new(manager(Arc::clone(&provider)), store);

    let mut project = runner.create_project("Test", "").await?;
    runner.run_through(&mut project, Stage::Revision).await?;

    let outcome = runner.revise(&mut project, 1.0, false).await?;
    assert_eq!(*outcome.applied_count(), 0);
    assert_eq!(runner.commit_revision(&mut project, &outcome).await?, None);
    assert_eq!(project.record(Stage::Prose).map(|r| *r.version()), Some(1));
    assert_eq!(project.status(Stage::Revision), StageStatus::Committed);
    Ok(())
}

#[tokio::test]
async fn nothing_applied_still_records_spend() -> anyhow::Result<()> {
    let provider = Arc::new(
        story_provider()
            .route("Rewrite this scene only", "No JSON here.")
            .with_cost(0.01),
    );
    let store = Arc::new(InMemoryProjectStore::new());
    let runner = StageRunner::new(manager(Arc::clone(&provider)), store.clone());

    let mut project = runner.create_project("Test", "").await?;
    runner.run_through(&mut project, Stage::Revision).await?;
    let before = project.clone();

    let outcome = runner.revise(&mut project, 1.0, false).await?;
    assert_eq!(*outcome.applied_count(), 0);
    assert!((outcome.spent() - 0.02).abs() < 1e-9);

    assert!((project.spent() - before.spent() - outcome.spent()).abs() < 1e-9);
    assert_eq!(project.stages(), before.stages());
    assert_eq!(store.load(*project.id()).await?, project);
    Ok(())
}

#[tokio::test]
async fn aborted_revise_records_spend_and_keeps_prose() -> anyhow::Result<()> {
    let provider = Arc::new(
        story_provider()
            .route(
                r#"Scene 2, ""#,
                r#"{"sceneNumber": 2, "content": "She lit the lamp and waited."}"#,
            )
            .route_sequence(
                r#"Scene 3, ""#,
                vec![MockResponse::Error(ProviderErrorKind::Authentication(
                    "key revoked".to_string(),
                ))],
            )
            .with_cost(0.01),
    );
    let store = Arc::new(InMemoryProjectStore::new());
    let runner = StageRunner::new(manager(Arc::clone(&provider)), store.clone());

    let mut project = runner.create_project("Test", "").await?;
    runner.run_through(&mut project, Stage::Revision).await?;
    let before = project.clone();

    let err = runner.revise(&mut project, 1.0, false).await.unwrap_err();
    let QuillErrorKind::Revision(revision) = err.kind() else {
        panic!("expected revision error, got {err}");
    };
    let RevisionErrorKind::Aborted { applied, spent, .. } = &revision.kind;
    assert_eq!(*applied, 1);
    assert!((spent - 0.01).abs() < 1e-9);

    assert!((project.spent() - before.spent() - 0.01).abs() < 1e-9);
    assert_eq!(project.stages(), before.stages());
    assert_eq!(store.load(*project.id()).await?, project);
    Ok(())
}
