//! Declarative guard rules.
//!
//! A [`RoleRequirements`] holds the ordered rule list of one scope (a
//! controller, a router, a group of handlers). Each rule targets a subset of
//! actions through an [`ActionFilter`] and optionally carries an
//! [`UnlockPredicate`]. Evaluation is default-allow:
//!
//! - no rules: allowed;
//! - a rule whose filter does not cover the action is skipped, and its
//!   predicate never runs;
//! - an applicable rule with a predicate returning `true` passes;
//! - an applicable rule whose predicate returns `false`, or that has no
//!   predicate at all, denies immediately.
//!
//! # Example
//!
//! ```ignore
//! use padlock_core::{PadlockOptions, ResourceRef, RoleRequirements, UnlockContext, UnlockPredicate};
//!
//! let mut rules = RoleRequirements::<AppState>::new();
//!
//! // Only owners may edit or update a project.
//! rules.padlock(
//!     PadlockOptions::new().only(["edit", "update"]),
//!     Some(UnlockPredicate::new(|ctx: UnlockContext<'_, AppState>| Box::pin(async move {
//!         let project = ResourceRef::new("Project", ctx.params.get("id").unwrap_or_default());
//!         ctx.scope.registry.current_has_role(ctx.subject, "owner", &project).await
//!     }))),
//! );
//!
//! // Nothing but `index` and `show` is reachable otherwise.
//! rules.padlock(PadlockOptions::new().on_all_except(["index", "show", "edit", "update"]), None);
//! ```

use crate::config::PadlockConfig;
use crate::error::PadlockError;
use crate::model::Subject;
use crate::store::BoxFuture;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Request parameters visible to unlock predicates: path parameters, query
/// parameters, and the `action` / `controller` identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Insert a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Which actions a rule applies to.
///
/// `only: None` means every action; `only: Some(set)` restricts to the set
/// (an empty set matches nothing). Actions in `except` are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilter {
    pub only: Option<BTreeSet<String>>,
    pub except: Option<BTreeSet<String>>,
}

impl ActionFilter {
    /// A filter matching every action.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<S: Into<String>>(actions: impl IntoIterator<Item = S>) -> Self {
        Self {
            only: Some(action_set(actions)),
            except: None,
        }
    }

    pub fn except<S: Into<String>>(actions: impl IntoIterator<Item = S>) -> Self {
        Self {
            only: None,
            except: Some(action_set(actions)),
        }
    }

    /// Whether a rule with this filter must be evaluated for `action`.
    pub fn applies_to(&self, action: &str) -> bool {
        if let Some(only) = &self.only {
            if !only.contains(action) {
                return false;
            }
        }
        if let Some(except) = &self.except {
            if except.contains(action) {
                return false;
            }
        }
        true
    }
}

fn action_set<S: Into<String>>(actions: impl IntoIterator<Item = S>) -> BTreeSet<String> {
    actions
        .into_iter()
        .map(Into::into)
        .filter(|a| !a.is_empty())
        .collect()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|v| match v {
        OneOrMany::One(action) => vec![action],
        OneOrMany::Many(actions) => actions,
    }))
}

/// Registration options of a guard rule.
///
/// `on` is an alias of `only` and `on_all_except` an alias of `except`; the
/// canonical key wins when both are given. Each value may be a single action
/// or a list. Unknown keys are rejected, both when deserializing and in
/// [`from_pairs`](Self::from_pairs).
///
/// ```yaml
/// only: [edit, update]
/// except: destroy
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PadlockOptions {
    #[serde(default, deserialize_with = "one_or_many")]
    pub only: Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub on: Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub except: Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub on_all_except: Option<Vec<String>>,
}

impl PadlockOptions {
    /// Options matching every action.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only<S: Into<String>>(mut self, actions: impl IntoIterator<Item = S>) -> Self {
        self.only = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn on<S: Into<String>>(mut self, actions: impl IntoIterator<Item = S>) -> Self {
        self.on = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn except<S: Into<String>>(mut self, actions: impl IntoIterator<Item = S>) -> Self {
        self.except = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn on_all_except<S: Into<String>>(mut self, actions: impl IntoIterator<Item = S>) -> Self {
        self.on_all_except = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    /// Build options from string keys.
    ///
    /// Fails with [`PadlockError::InvalidOption`] on a key other than `only`,
    /// `on`, `except` or `on_all_except`.
    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Result<Self, PadlockError> {
        let mut options = Self::new();
        for (key, actions) in pairs {
            let actions = actions.iter().map(|a| a.to_string()).collect::<Vec<_>>();
            match *key {
                "only" => options.only = Some(actions),
                "on" => options.on = Some(actions),
                "except" => options.except = Some(actions),
                "on_all_except" => options.on_all_except = Some(actions),
                other => return Err(PadlockError::InvalidOption(other.to_string())),
            }
        }
        Ok(options)
    }

    /// Resolve aliases into an [`ActionFilter`].
    pub fn into_filter(self) -> ActionFilter {
        ActionFilter {
            only: self.only.or(self.on).map(action_set),
            except: self.except.or(self.on_all_except).map(action_set),
        }
    }
}

impl From<PadlockOptions> for ActionFilter {
    fn from(options: PadlockOptions) -> Self {
        options.into_filter()
    }
}

/// Everything an unlock predicate can look at.
pub struct UnlockContext<'a, C> {
    /// Action being authorized (never empty).
    pub action: &'a str,
    pub params: &'a RequestParams,
    /// The scope the rules belong to.
    pub scope: &'a C,
    /// The current subject, `None` for anonymous requests.
    pub subject: Option<&'a dyn Subject>,
}

impl<'a, C> UnlockContext<'a, C> {
    pub fn subject_id(&self) -> Option<&'a str> {
        self.subject.map(|s| s.subject_id())
    }

    pub fn param(&self, key: &str) -> Option<&'a str> {
        self.params.get(key)
    }
}

type UnlockFn<C> =
    dyn for<'a> Fn(UnlockContext<'a, C>) -> BoxFuture<'a, Result<bool, PadlockError>> + Send + Sync;

/// Predicate that, when it returns `true`, lets a request through a rule.
pub struct UnlockPredicate<C>(Arc<UnlockFn<C>>);

impl<C> Clone for UnlockPredicate<C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<C> std::fmt::Debug for UnlockPredicate<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnlockPredicate")
    }
}

impl<C: Send + Sync + 'static> UnlockPredicate<C> {
    /// Wrap an async predicate. Errors it returns (typically store failures)
    /// abort the authorization check.
    ///
    /// The scope type is not known when the closure is checked, so name it
    /// on the parameter before reaching into `ctx.scope`:
    ///
    /// ```ignore
    /// UnlockPredicate::new(|ctx: UnlockContext<'_, AppState>| Box::pin(async move {
    ///     ctx.scope.registry.current_has_role(ctx.subject, "admin", &site).await
    /// }))
    /// ```
    pub fn new<F>(predicate: F) -> Self
    where
        F: for<'a> Fn(UnlockContext<'a, C>) -> BoxFuture<'a, Result<bool, PadlockError>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Wrap a synchronous, infallible predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&UnlockContext<'_, C>) -> bool + Send + Sync + 'static,
    {
        Self::new(move |ctx| {
            let unlocked = predicate(&ctx);
            Box::pin(std::future::ready(Ok(unlocked)))
        })
    }

    pub fn evaluate<'a>(
        &'a self,
        ctx: UnlockContext<'a, C>,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        (self.0)(ctx)
    }
}

/// One registered rule.
pub struct GuardRule<C> {
    pub filter: ActionFilter,
    pub unlock: Option<UnlockPredicate<C>>,
}

impl<C> Clone for GuardRule<C> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            unlock: self.unlock.clone(),
        }
    }
}

impl<C> std::fmt::Debug for GuardRule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardRule")
            .field("filter", &self.filter)
            .field("has_unlock", &self.unlock.is_some())
            .finish()
    }
}

/// Ordered guard rules of one scope.
///
/// Built once at setup and then shared read-only (usually behind an `Arc`
/// inside a [`PadlockGuard`](crate::guards::PadlockGuard)); evaluation takes
/// no lock.
pub struct RoleRequirements<C> {
    rules: Vec<GuardRule<C>>,
    default_action: String,
}

impl<C> Clone for RoleRequirements<C> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            default_action: self.default_action.clone(),
        }
    }
}

impl<C> std::fmt::Debug for RoleRequirements<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRequirements")
            .field("rules", &self.rules)
            .field("default_action", &self.default_action)
            .finish()
    }
}

impl<C: Send + Sync + 'static> Default for RoleRequirements<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> RoleRequirements<C> {
    /// An empty rule list: every action is allowed.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_action: PadlockConfig::default().default_action,
        }
    }

    pub fn with_config(config: &PadlockConfig) -> Self {
        Self::new().with_default_action(config.default_action.clone())
    }

    /// Action assumed when a request carries an empty action identifier.
    pub fn with_default_action(mut self, action: impl Into<String>) -> Self {
        self.default_action = action.into();
        self
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    /// Append a rule built from `options`.
    pub fn padlock(
        &mut self,
        options: PadlockOptions,
        unlock: Option<UnlockPredicate<C>>,
    ) -> &mut Self {
        self.register_rule(options.into_filter(), unlock)
    }

    /// Append a rule built from string-keyed options, rejecting unknown keys.
    pub fn padlock_with_pairs(
        &mut self,
        pairs: &[(&str, &[&str])],
        unlock: Option<UnlockPredicate<C>>,
    ) -> Result<&mut Self, PadlockError> {
        let options = PadlockOptions::from_pairs(pairs)?;
        Ok(self.padlock(options, unlock))
    }

    /// Append a rule.
    pub fn register_rule(
        &mut self,
        filter: ActionFilter,
        unlock: Option<UnlockPredicate<C>>,
    ) -> &mut Self {
        self.rules.push(GuardRule { filter, unlock });
        self
    }

    /// Builder form of [`padlock`](Self::padlock) without a predicate: the
    /// covered actions are always denied.
    pub fn lock(mut self, options: PadlockOptions) -> Self {
        self.padlock(options, None);
        self
    }

    /// Builder form of [`padlock`](Self::padlock) with a predicate.
    pub fn lock_unless(mut self, options: PadlockOptions, unlock: UnlockPredicate<C>) -> Self {
        self.padlock(options, Some(unlock));
        self
    }

    /// Drop every rule.
    pub fn reset(&mut self) {
        self.rules.clear();
    }

    pub fn rules(&self) -> &[GuardRule<C>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide whether `subject` may perform `action`.
    ///
    /// `Ok(false)` is a denial. An `Err` comes from a failing predicate and
    /// means no decision was reached.
    pub async fn is_authorized(
        &self,
        subject: Option<&dyn Subject>,
        action: &str,
        params: &RequestParams,
        scope: &C,
    ) -> Result<bool, PadlockError> {
        let action = if action.is_empty() {
            self.default_action.as_str()
        } else {
            action
        };

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.filter.applies_to(action) {
                tracing::trace!(rule = index, action, "rule does not apply");
                continue;
            }

            let unlocked = match &rule.unlock {
                Some(predicate) => {
                    predicate
                        .evaluate(UnlockContext {
                            action,
                            params,
                            scope,
                            subject,
                        })
                        .await?
                }
                None => false,
            };
            tracing::trace!(rule = index, action, unlocked, "rule evaluated");

            if !unlocked {
                tracing::debug!(
                    rule = index,
                    action,
                    subject = subject.map(|s| s.subject_id()),
                    "access denied by guard rule"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
