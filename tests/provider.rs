//! Provider selection, capability gating, health checks and the embedded
//! libgit2 engine.

#[macro_use]
mod common;

use serde_json::json;

use common::{assert_error_kind, assert_has_path, TestRepo};
use gitops_engine::ops::branch::{BranchAction, BranchOutcome};
use gitops_engine::ops::commit::CommitOptions;
use gitops_engine::ops::history::LogOptions;
use gitops_engine::ops::integrate::RebaseAction;
use gitops_engine::ops::remote::{RemoteAction, RemoteOutcome};
use gitops_engine::ops::repo::InitOptions;
use gitops_engine::ops::stage::AddOptions;
use gitops_engine::ops::status::StatusOptions;
use gitops_engine::ops::tag::{TagAction, TagOutcome};
use gitops_engine::{
    dispatch, CancelToken, EngineConfig, ErrorKind, GitCliProvider, GitOpsError, GitRunner,
    OperationContext, Operation, Provider, ProviderKind,
};

// ============================================================================
// Capability gating
// ============================================================================

#[tokio::test]
async fn test_unsupported_operation_fails_without_touching_disk() {
    // A directory that does not exist: any real attempt would fail differently.
    let ctx = OperationContext::new("/nonexistent/gitops-engine/provider-test");
    let provider = TestRepo::embedded_provider();

    let err = assert_error_kind(
        provider
            .rebase(
                &RebaseAction::Start {
                    upstream: "main".to_string(),
                    onto: None,
                },
                &ctx,
            )
            .await,
        ErrorKind::UnsupportedCapability,
    );
    match err {
        GitOpsError::UnsupportedCapability { operation, provider } => {
            assert_eq!(operation, Operation::Rebase);
            assert_eq!(provider, "embedded");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_every_unsupported_operation_is_gated() {
    let provider = TestRepo::embedded_provider();
    for op in Operation::ALL {
        let supported = provider.capabilities().supports(op);
        assert_eq!(provider.gate(op).is_ok(), supported || op.is_baseline(), "{}", op);
    }
}

#[test]
fn test_baseline_always_supported() {
    for provider in [TestRepo::embedded_provider(), TestRepo::cli_provider()] {
        for op in [Operation::Init, Operation::Status, Operation::Log] {
            assert!(provider.gate(op).is_ok(), "{} on {}", op, provider.name());
        }
    }
}

#[test]
fn test_cli_provider_supports_everything() {
    let provider = TestRepo::cli_provider();
    assert_eq!(provider.kind(), ProviderKind::Cli);
    assert_eq!(
        provider.capabilities().supported_operations().len(),
        Operation::ALL.len()
    );
}

#[tokio::test]
async fn test_embedded_rejects_signing() {
    let repo = TestRepo::new();
    let opts = CommitOptions {
        message: "signed".to_string(),
        sign: true,
        ..CommitOptions::default()
    };
    let result = TestRepo::embedded_provider().commit(&opts, &repo.ctx()).await;
    assert_error_kind(result, ErrorKind::UnsupportedCapability);
}

// ============================================================================
// Health checks
// ============================================================================

#[tokio::test]
async fn test_health_checks_are_repeatable() {
    require_git!();
    let dir = TestRepo::new();
    for provider in [TestRepo::cli_provider(), TestRepo::embedded_provider()] {
        for _ in 0..3 {
            assert!(provider.health_check(&dir.ctx()).await, "{}", provider.name());
        }
    }
    // Health checks never create a repository.
    assert!(!dir.join(".git").exists());
}

#[tokio::test]
async fn test_health_check_missing_binary() {
    let provider = Provider::Cli(GitCliProvider::new(GitRunner::new(
        "/nonexistent/bin/definitely-not-git",
    )));
    let dir = TestRepo::new();
    assert!(!provider.health_check(&dir.ctx()).await);
}

// ============================================================================
// Embedded engine
// ============================================================================

#[tokio::test]
async fn test_embedded_end_to_end() {
    let repo = TestRepo::new();
    let provider = TestRepo::embedded_provider();
    let ctx = repo.ctx();

    let init = provider.init(&InitOptions::default(), &ctx).await.unwrap();
    assert!(!init.reinitialized);
    assert!(repo.join(".git").is_dir());

    // Identity for the embedded commit.
    let git_repo = git2::Repository::open(repo.path()).unwrap();
    let mut config = git_repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();

    let empty_log = provider.log(&LogOptions::default(), &ctx).await.unwrap();
    assert!(empty_log.commits.is_empty());

    repo.add_file("a.txt", "alpha\n");
    let status = provider.status(&StatusOptions::default(), &ctx).await.unwrap();
    assert_has_path(&status.untracked_files, "a.txt");
    assert_eq!(status.head_commit, None);

    let added = provider
        .add(
            &AddOptions {
                paths: vec!["a.txt".to_string()],
                ..AddOptions::default()
            },
            &ctx,
        )
        .await
        .unwrap();
    assert_has_path(&added.added, "a.txt");

    let status = provider.status(&StatusOptions::default(), &ctx).await.unwrap();
    assert_has_path(&status.staged_changes.added, "a.txt");

    let commit = provider
        .commit(
            &CommitOptions {
                message: "first".to_string(),
                ..CommitOptions::default()
            },
            &ctx,
        )
        .await
        .unwrap();
    assert!(commit.root_commit);
    assert_eq!(commit.subject, "first");
    assert_eq!(commit.stats.additions, 1);

    let log = provider.log(&LogOptions::default(), &ctx).await.unwrap();
    assert_eq!(log.commits.len(), 1);
    assert_eq!(log.commits[0].hash, commit.hash);
    assert_eq!(log.commits[0].author_email, "test@test.com");

    let nothing = provider
        .commit(
            &CommitOptions {
                message: "again".to_string(),
                ..CommitOptions::default()
            },
            &ctx,
        )
        .await;
    assert_error_kind(nothing, ErrorKind::Validation);
}

#[tokio::test]
async fn test_embedded_refs() {
    let repo = TestRepo::new();
    let provider = TestRepo::embedded_provider();
    let ctx = repo.ctx();
    provider.init(&InitOptions::default(), &ctx).await.unwrap();
    let git_repo = git2::Repository::open(repo.path()).unwrap();
    let mut config = git_repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();

    repo.add_file("a.txt", "a\n");
    provider
        .add(
            &AddOptions {
                all: true,
                ..AddOptions::default()
            },
            &ctx,
        )
        .await
        .unwrap();
    provider
        .commit(
            &CommitOptions {
                message: "base".to_string(),
                ..CommitOptions::default()
            },
            &ctx,
        )
        .await
        .unwrap();

    let created = provider
        .branch(
            &BranchAction::Create {
                name: "feature".to_string(),
                start_point: None,
                force: false,
            },
            &ctx,
        )
        .await
        .unwrap();
    assert!(matches!(created, BranchOutcome::Created { .. }));

    let duplicate = provider
        .branch(
            &BranchAction::Create {
                name: "feature".to_string(),
                start_point: None,
                force: false,
            },
            &ctx,
        )
        .await;
    assert_error_kind(duplicate, ErrorKind::Conflict);

    let BranchOutcome::Listed { branches } = provider.branch(&BranchAction::List { all: false }, &ctx).await.unwrap() else {
        panic!("expected listing");
    };
    assert_eq!(branches.iter().filter(|b| b.current).count(), 1);
    assert!(branches.iter().any(|b| b.name == "feature"));

    provider
        .tag(
            &TagAction::Create {
                name: "v0.1".to_string(),
                target: None,
                message: Some("first".to_string()),
                force: false,
            },
            &ctx,
        )
        .await
        .unwrap();
    let TagOutcome::Listed { tags } = provider.tag(&TagAction::List, &ctx).await.unwrap() else {
        panic!("expected listing");
    };
    assert_eq!(tags, vec!["v0.1".to_string()]);

    provider
        .remote(
            &RemoteAction::Add {
                name: "origin".to_string(),
                url: "https://example.com/repo.git".to_string(),
            },
            &ctx,
        )
        .await
        .unwrap();
    let RemoteOutcome::Listed { remotes } = provider.remote(&RemoteAction::List, &ctx).await.unwrap() else {
        panic!("expected listing");
    };
    assert_eq!(remotes[0].name, "origin");

    let bad_name = provider
        .branch(
            &BranchAction::Delete {
                name: "-D".to_string(),
                force: false,
            },
            &ctx,
        )
        .await;
    assert_error_kind(bad_name, ErrorKind::Validation);
}

#[tokio::test]
async fn test_embedded_outside_repository_is_not_found() {
    let dir = TestRepo::new();
    let result = TestRepo::embedded_provider()
        .status(&StatusOptions::default(), &dir.ctx())
        .await;
    assert_error_kind(result, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_embedded_respects_cancellation() {
    let repo = TestRepo::new();
    let token = CancelToken::new();
    token.cancel();
    let ctx = repo.ctx().with_cancellation(token);
    let result = TestRepo::embedded_provider()
        .init(&InitOptions::default(), &ctx)
        .await;
    assert_error_kind(result, ErrorKind::Cancelled);
    assert!(!repo.join(".git").exists());
}

#[tokio::test]
async fn test_providers_agree_on_status_and_log() {
    require_git!();
    let repo = TestRepo::with_initial_commit();
    repo.add_file("README.md", "# edited\n");
    repo.add_file("new.txt", "n\n");
    repo.git(&["add", "new.txt"]);
    repo.add_file("loose.txt", "u\n");

    let cli = TestRepo::cli_provider();
    let embedded = TestRepo::embedded_provider();
    let ctx = repo.ctx();

    let a = cli.status(&StatusOptions::default(), &ctx).await.unwrap();
    let b = embedded.status(&StatusOptions::default(), &ctx).await.unwrap();
    assert_eq!(a, b);

    let a = cli.log(&LogOptions::default(), &ctx).await.unwrap();
    let b = embedded.log(&LogOptions::default(), &ctx).await.unwrap();
    assert_eq!(a.commits.len(), b.commits.len());
    assert_eq!(a.commits[0].hash, b.commits[0].hash);
    assert_eq!(a.commits[0].subject, b.commits[0].subject);
}

// ============================================================================
// Configuration and dispatch
// ============================================================================

#[test]
fn test_config_builds_requested_provider() {
    let config = EngineConfig {
        provider: ProviderKind::Embedded,
        ..EngineConfig::default()
    };
    assert_eq!(config.build_provider().unwrap().kind(), ProviderKind::Embedded);
}

#[tokio::test]
async fn test_dispatch_json_round_trip() {
    require_git!();
    let repo = TestRepo::with_initial_commit();
    let provider = TestRepo::cli_provider();
    let ctx = repo.ctx();

    let created = dispatch(
        &provider,
        Operation::Branch,
        json!({"action": "create", "name": "from-json"}),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(created["result"], "created");
    assert_eq!(created["name"], "from-json");

    let listed = dispatch(&provider, Operation::Branch, serde_json::Value::Null, &ctx)
        .await
        .unwrap();
    assert_eq!(listed["result"], "listed");
    assert_eq!(listed["branches"].as_array().unwrap().len(), 2);

    let status = dispatch(&provider, Operation::Status, serde_json::Value::Null, &ctx)
        .await
        .unwrap();
    assert_eq!(status["is_clean"], true);
    assert_eq!(status["current_branch"], "main");
}

#[tokio::test]
async fn test_dispatch_bad_options_is_validation() {
    let dir = TestRepo::new();
    let result = dispatch(
        &TestRepo::embedded_provider(),
        Operation::Log,
        json!({"max_count": -1}),
        &dir.ctx(),
    )
    .await;
    let err = assert_error_kind(result, ErrorKind::Validation);
    assert_eq!(err.to_json()["kind"], "validation");
}
