use padlock_core::{
    ActionFilter, MemoryRoleStore, PadlockConfig, PadlockError, PadlockOptions, RequestParams,
    ResourceRef, RoleRegistry, RoleRequirements, SubjectRef, UnlockContext, UnlockPredicate,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scope handed to predicates, standing in for a controller.
struct ProjectScope {
    registry: RoleRegistry,
}

fn scope() -> ProjectScope {
    ProjectScope {
        registry: RoleRegistry::new(MemoryRoleStore::new()),
    }
}

fn params(id: &str) -> RequestParams {
    RequestParams::from_pairs([("id", id)])
}

/// Unlocks when the subject owns the project named by the `id` param.
fn is_owner() -> UnlockPredicate<ProjectScope> {
    UnlockPredicate::new(|ctx: UnlockContext<'_, ProjectScope>| {
        Box::pin(async move {
            let project = ResourceRef::new("Project", ctx.param("id").unwrap_or_default());
            ctx.scope
                .registry
                .current_has_role(ctx.subject, "owner", &project)
                .await
        })
    })
}

fn counting(calls: &Arc<AtomicUsize>, result: bool) -> UnlockPredicate<ProjectScope> {
    let calls = calls.clone();
    UnlockPredicate::from_fn(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        result
    })
}

#[tokio::test]
async fn test_empty_rules_allow_everything() {
    let rules = RoleRequirements::<ProjectScope>::new();
    let scope = scope();

    for action in ["index", "show", "destroy", ""] {
        assert!(rules
            .is_authorized(None, action, &RequestParams::new(), &scope)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn test_only_rule_gates_listed_actions() {
    let scope = scope();
    let alice = SubjectRef::new("alice");
    let mut rules = RoleRequirements::<ProjectScope>::new();
    rules.padlock(PadlockOptions::new().only(["edit", "update"]), Some(is_owner()));

    // Not covered by the rule: allowed regardless of ownership.
    assert!(rules
        .is_authorized(Some(&alice), "show", &params("1"), &scope)
        .await
        .unwrap());

    // Covered, not an owner.
    assert!(!rules
        .is_authorized(Some(&alice), "edit", &params("1"), &scope)
        .await
        .unwrap());

    scope
        .registry
        .grant_role(&alice, "owner", &ResourceRef::new("Project", "1"))
        .await
        .unwrap();

    assert!(rules
        .is_authorized(Some(&alice), "edit", &params("1"), &scope)
        .await
        .unwrap());
    assert!(rules
        .is_authorized(Some(&alice), "update", &params("1"), &scope)
        .await
        .unwrap());
    // Ownership of project 1 says nothing about project 2.
    assert!(!rules
        .is_authorized(Some(&alice), "edit", &params("2"), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_first_failing_rule_denies() {
    let scope = scope();
    let rules = RoleRequirements::<ProjectScope>::new()
        .lock_unless(
            PadlockOptions::new().only(["delete"]),
            UnlockPredicate::from_fn(|_| false),
        )
        .lock_unless(
            PadlockOptions::new().only(["show"]),
            UnlockPredicate::from_fn(|_| true),
        );

    assert!(!rules
        .is_authorized(None, "delete", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert!(rules
        .is_authorized(None, "show", &RequestParams::new(), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_rule_without_predicate_always_denies() {
    let scope = scope();
    let alice = SubjectRef::new("alice");
    let rules = RoleRequirements::<ProjectScope>::new().lock(PadlockOptions::new().except(["index"]));

    assert!(rules
        .is_authorized(Some(&alice), "index", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert!(!rules
        .is_authorized(Some(&alice), "destroy", &RequestParams::new(), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_skipped_rule_never_runs_predicate() {
    let scope = scope();
    let calls = Arc::new(AtomicUsize::new(0));
    let rules = RoleRequirements::<ProjectScope>::new().lock_unless(
        PadlockOptions::new().only(["edit"]),
        counting(&calls, true),
    );

    assert!(rules
        .is_authorized(None, "show", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(rules
        .is_authorized(None, "edit", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_evaluation_stops_at_first_denial() {
    let scope = scope();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let rules = RoleRequirements::<ProjectScope>::new()
        .lock_unless(PadlockOptions::new(), counting(&first, false))
        .lock_unless(PadlockOptions::new(), counting(&second, true));

    assert!(!rules
        .is_authorized(None, "show", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_except_rule_skips_listed_actions() {
    let scope = scope();
    let calls = Arc::new(AtomicUsize::new(0));
    let rules = RoleRequirements::<ProjectScope>::new().lock_unless(
        PadlockOptions::new().on_all_except(["index", "show"]),
        counting(&calls, false),
    );

    assert!(rules
        .is_authorized(None, "index", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert!(!rules
        .is_authorized(None, "create", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_on_alias_behaves_like_only() {
    let scope = scope();
    let rules = RoleRequirements::<ProjectScope>::new().lock(PadlockOptions::new().on(["destroy"]));

    assert!(rules
        .is_authorized(None, "show", &RequestParams::new(), &scope)
        .await
        .unwrap());
    assert!(!rules
        .is_authorized(None, "destroy", &RequestParams::new(), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_empty_action_uses_default_action() {
    let scope = scope();
    let rules = RoleRequirements::<ProjectScope>::new().lock(PadlockOptions::new().only(["index"]));
    assert!(!rules
        .is_authorized(None, "", &RequestParams::new(), &scope)
        .await
        .unwrap());

    let config = PadlockConfig::new().with_default_action("list");
    let rules = RoleRequirements::<ProjectScope>::with_config(&config).lock(PadlockOptions::new().only(["index"]));
    assert_eq!(rules.default_action(), "list");
    assert!(rules
        .is_authorized(None, "", &RequestParams::new(), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_anonymous_subject_fails_role_predicate() {
    let scope = scope();
    let alice = SubjectRef::new("alice");
    scope
        .registry
        .grant_role(&alice, "owner", &ResourceRef::new("Project", "1"))
        .await
        .unwrap();
    let rules = RoleRequirements::<ProjectScope>::new().lock_unless(PadlockOptions::new(), is_owner());

    assert!(!rules
        .is_authorized(None, "show", &params("1"), &scope)
        .await
        .unwrap());
    assert!(rules
        .is_authorized(Some(&alice), "show", &params("1"), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_predicate_sees_action_and_params() {
    let scope = scope();
    let rules = RoleRequirements::<ProjectScope>::new().lock_unless(
        PadlockOptions::new(),
        UnlockPredicate::from_fn(|ctx| ctx.action == "show" && ctx.param("id") == Some("42")),
    );

    assert!(rules
        .is_authorized(None, "show", &params("42"), &scope)
        .await
        .unwrap());
    assert!(!rules
        .is_authorized(None, "show", &params("7"), &scope)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_predicate_error_propagates() {
    let scope = scope();
    let rules = RoleRequirements::<ProjectScope>::new().lock_unless(
        PadlockOptions::new(),
        UnlockPredicate::new(|_| {
            Box::pin(async { Err::<bool, _>(PadlockError::Other("store unavailable".into())) })
        }),
    );

    let err = rules
        .is_authorized(None, "show", &RequestParams::new(), &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, PadlockError::Other(_)));
}

#[test]
fn test_padlock_with_pairs_rejects_unknown_option() {
    let mut rules = RoleRequirements::<ProjectScope>::new();

    let err = rules
        .padlock_with_pairs(&[("only", &["edit"]), ("if", &["owner"])], None)
        .unwrap_err();
    assert!(matches!(err, PadlockError::InvalidOption(ref key) if key == "if"));
    assert!(rules.is_empty());

    rules
        .padlock_with_pairs(&[("on", &["edit"]), ("on_all_except", &["show"])], None)
        .unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules.rules()[0].filter,
        ActionFilter {
            only: Some(["edit".to_string()].into()),
            except: Some(["show".to_string()].into()),
        }
    );
}

#[test]
fn test_reset_clears_rules() {
    let mut rules = RoleRequirements::<ProjectScope>::new()
        .lock(PadlockOptions::new().only(["edit"]))
        .lock(PadlockOptions::new().only(["destroy"]));
    assert_eq!(rules.len(), 2);

    rules.reset();
    assert!(rules.is_empty());
}
