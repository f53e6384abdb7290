//! Pre-dispatch hook and the Padlock guard.
//!
//! The dispatch layer builds a [`GuardContext`] for each request and calls
//! [`Guard::check`] before the handler body runs. [`PadlockGuard`] implements
//! the hook on top of a scope's [`RoleRequirements`].

use crate::error::error_response;
use crate::model::Subject;
use crate::rules::{RequestParams, RoleRequirements};
use axum::extract::{FromRef, RawPathParams};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Path parameters extracted from the matched route pattern.
///
/// In production, this borrows Axum's `RawPathParams` with zero copy.
/// For testing, construct via [`PathParams::from_pairs`].
pub struct PathParams<'a>(PathParamsInner<'a>);

enum PathParamsInner<'a> {
    Raw(&'a RawPathParams),
    Pairs(&'a [(&'a str, &'a str)]),
}

impl<'a> PathParams<'a> {
    pub fn from_raw(raw: &'a RawPathParams) -> Self {
        Self(PathParamsInner::Raw(raw))
    }

    /// Create from a slice of `(key, value)` pairs (for testing).
    pub fn from_pairs(pairs: &'a [(&'a str, &'a str)]) -> Self {
        Self(PathParamsInner::Pairs(pairs))
    }

    pub const EMPTY: PathParams<'static> = PathParams(PathParamsInner::Pairs(&[]));

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// All parameters in route order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        match &self.0 {
            PathParamsInner::Raw(raw) => raw.iter().collect(),
            PathParamsInner::Pairs(pairs) => pairs.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

/// Context available to guards before the handler body runs.
pub struct GuardContext<'a, I: Subject> {
    /// Handler identifier, used as the action.
    pub method_name: &'static str,
    pub controller_name: &'static str,
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
    pub path_params: PathParams<'a>,
    /// The authenticated subject, `None` for anonymous requests.
    pub identity: Option<&'a I>,
}

impl<'a, I: Subject> GuardContext<'a, I> {
    pub fn identity_sub(&self) -> Option<&str> {
        self.identity.map(|i| i.subject_id())
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Parameters exposed to unlock predicates.
    ///
    /// Query parameters first, then path parameters (which win on a name
    /// clash), then `action` and `controller`.
    pub fn request_params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        if let Some(query) = self.query_string() {
            for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
                params.insert(k, v);
            }
        }
        for (k, v) in self.path_params.pairs() {
            params.insert(k, v);
        }
        params.insert("action", self.method_name);
        params.insert("controller", self.controller_name);
        params
    }
}

/// Handler-level guard. Runs before the handler body.
/// Returns `Ok(())` to proceed, `Err(Response)` to short-circuit.
///
/// Generic over both the application state `S` and the subject type `I`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Guard<{S}, {I}>`",
    label = "this type cannot be used as a guard",
    note = "implement `Guard<S, I>` for your type, or wrap your rules in `PadlockGuard`"
)]
pub trait Guard<S, I: Subject>: Send + Sync {
    fn check(
        &self,
        state: &S,
        ctx: &GuardContext<'_, I>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send;
}

/// Response sent when a request is denied.
///
/// Anonymous requests get `401 Authentication required`, authenticated ones
/// `403 Access denied`.
pub fn access_denied(authenticated: bool) -> Response {
    if authenticated {
        error_response(StatusCode::FORBIDDEN, "Access denied")
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Authentication required")
    }
}

/// Guard evaluating a scope's [`RoleRequirements`].
///
/// The scope `C` handed to unlock predicates is extracted from the
/// application state with `FromRef`, so it can be the state itself or any
/// part of it (typically something holding a
/// [`RoleRegistry`](crate::RoleRegistry)).
///
/// # Example
///
/// ```ignore
/// let rules = RoleRequirements::<AppState>::new()
///     .lock_unless(PadlockOptions::new().only(["update"]), is_project_owner())
///     .lock(PadlockOptions::new().only(["destroy"]));
///
/// let guard = PadlockGuard::new(rules);
/// guard.check(&state, &ctx).await?;
/// ```
pub struct PadlockGuard<C> {
    requirements: Arc<RoleRequirements<C>>,
}

impl<C> Clone for PadlockGuard<C> {
    fn clone(&self) -> Self {
        Self {
            requirements: self.requirements.clone(),
        }
    }
}

impl<C> PadlockGuard<C> {
    pub fn new(requirements: RoleRequirements<C>) -> Self {
        Self::from_arc(Arc::new(requirements))
    }

    pub fn from_arc(requirements: Arc<RoleRequirements<C>>) -> Self {
        Self { requirements }
    }

    pub fn requirements(&self) -> &RoleRequirements<C> {
        &self.requirements
    }
}

impl<S, I, C> Guard<S, I> for PadlockGuard<C>
where
    S: Send + Sync,
    I: Subject,
    C: FromRef<S> + Send + Sync + 'static,
{
    fn check(
        &self,
        state: &S,
        ctx: &GuardContext<'_, I>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send {
        let scope = C::from_ref(state);
        let params = ctx.request_params();
        let action = ctx.method_name;
        let controller = ctx.controller_name;
        let subject: Option<&dyn Subject> = ctx.identity.map(|i| i as &dyn Subject);
        let requirements = self.requirements.clone();

        async move {
            match requirements
                .is_authorized(subject, action, &params, &scope)
                .await
            {
                Ok(true) => Ok(()),
                Ok(false) => Err(access_denied(subject.is_some())),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        controller,
                        action,
                        subject = subject.map(|s| s.subject_id()),
                        "authorization check failed"
                    );
                    Err(e.into_response())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubjectRef;

    fn ctx<'a>(
        uri: &'a Uri,
        headers: &'a HeaderMap,
        path: &'a [(&'a str, &'a str)],
    ) -> GuardContext<'a, SubjectRef> {
        GuardContext {
            method_name: "show",
            controller_name: "projects",
            headers,
            uri,
            path_params: PathParams::from_pairs(path),
            identity: None,
        }
    }

    #[test]
    fn request_params_merge_query_path_and_action() {
        let uri: Uri = "/projects/7?id=99&tab=members".parse().unwrap();
        let headers = HeaderMap::new();
        let path = [("id", "7")];
        let params = ctx(&uri, &headers, &path).request_params();

        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("tab"), Some("members"));
        assert_eq!(params.get("action"), Some("show"));
        assert_eq!(params.get("controller"), Some("projects"));
    }

    #[test]
    fn empty_path_params() {
        assert_eq!(PathParams::EMPTY.get("id"), None);
        assert!(PathParams::EMPTY.pairs().is_empty());
    }

    #[test]
    fn access_denied_status_depends_on_authentication() {
        assert_eq!(access_denied(true).status(), StatusCode::FORBIDDEN);
        assert_eq!(access_denied(false).status(), StatusCode::UNAUTHORIZED);
    }
}
