use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::{debug, error, info, warn};

use super::{Outcome, Stage};
use crate::api::ApiError;
use crate::auth::SessionStore;
use crate::router::{Navigator, LOGIN_ROUTE};

/// Puts the stored credential in the `Authorization` header, verbatim.
pub struct AttachCredential {
    session: Arc<SessionStore>,
}

impl AttachCredential {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }
}

impl Stage for AttachCredential {
    fn name(&self) -> &'static str {
        "attach-credential"
    }

    fn on_request(&self, request: &mut Request) -> Result<(), ApiError> {
        let Some(credential) = self.session.get() else {
            return Ok(());
        };
        let mut value = HeaderValue::from_str(credential.as_str())
            .map_err(|_| ApiError::InvalidCredential)?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Called once for every 401 the pipeline sees.
pub trait AuthFailureHook: Send + Sync {
    fn on_authentication_failure(&self);
}

impl<F> AuthFailureHook for F
where
    F: Fn() + Send + Sync,
{
    fn on_authentication_failure(&self) {
        self()
    }
}

/// Hook that sends the UI to a named route, `login` by default.
pub struct NavigateTo {
    navigator: Arc<dyn Navigator>,
    route: String,
}

impl NavigateTo {
    pub fn login(navigator: Arc<dyn Navigator>) -> Self {
        Self::route(navigator, LOGIN_ROUTE)
    }

    pub fn route(navigator: Arc<dyn Navigator>, route: impl Into<String>) -> Self {
        Self {
            navigator,
            route: route.into(),
        }
    }
}

impl AuthFailureHook for NavigateTo {
    fn on_authentication_failure(&self) {
        if let Err(e) = self.navigator.navigate(&self.route) {
            error!(error = %e, route = %self.route, "Failed to navigate after authentication failure");
        }
    }
}

/// Drops the session and fires the hook when the server answers 401.
/// Every other failure is logged and left alone.
pub struct RevokeOnUnauthorized {
    session: Arc<SessionStore>,
    hook: Arc<dyn AuthFailureHook>,
}

impl RevokeOnUnauthorized {
    pub fn new(session: Arc<SessionStore>, hook: Arc<dyn AuthFailureHook>) -> Self {
        Self { session, hook }
    }
}

impl Stage for RevokeOnUnauthorized {
    fn name(&self) -> &'static str {
        "revoke-on-unauthorized"
    }

    fn on_outcome(&self, outcome: &Outcome) {
        let Err(err) = outcome else {
            return;
        };
        if !err.is_unauthorized() {
            match err.status() {
                Some(status) => warn!(%status, error = %err, "Request failed"),
                None => warn!(error = %err, "Request failed without a response"),
            }
            return;
        }

        info!("Server rejected the session credential, signing out");
        if let Err(e) = self.session.clear() {
            error!(error = %e, "Failed to wipe persisted session");
        }
        debug!("Running authentication failure hook");
        self.hook.on_authentication_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use crate::pipeline::testing::{get, Scripted, ScriptedTransport};
    use crate::pipeline::Pipeline;
    use crate::router::{RouteTable, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        session: Arc<SessionStore>,
        router: Arc<Router>,
        transport: Arc<ScriptedTransport>,
        pipeline: Pipeline,
    }

    fn harness(transport: ScriptedTransport) -> Harness {
        let session = Arc::new(SessionStore::in_memory());
        let router = Arc::new(Router::new(RouteTable::standard()));
        router.navigate("home").unwrap();
        let transport = Arc::new(transport);
        let pipeline = Pipeline::builder(transport.clone())
            .stage(AttachCredential::new(session.clone()))
            .stage(RevokeOnUnauthorized::new(
                session.clone(),
                Arc::new(NavigateTo::login(router.clone())),
            ))
            .build();
        Harness {
            session,
            router,
            transport,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_credential_sent_verbatim() {
        let h = harness(ScriptedTransport::new());
        h.session.set(Credential::new("tok-abc")).unwrap();

        h.pipeline.execute(get("/user")).await.unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent[0].authorization.as_deref(), Some("tok-abc"));
    }

    #[tokio::test]
    async fn test_no_credential_no_header() {
        let h = harness(ScriptedTransport::new());

        h.pipeline.execute(get("/user")).await.unwrap();

        assert_eq!(h.transport.sent()[0].authorization, None);
    }

    #[tokio::test]
    async fn test_header_follows_current_credential() {
        let h = harness(ScriptedTransport::new());
        h.session.set(Credential::new("first")).unwrap();
        h.pipeline.execute(get("/user")).await.unwrap();
        h.session.set(Credential::new("second")).unwrap();
        h.pipeline.execute(get("/user")).await.unwrap();
        h.session.clear().unwrap();
        h.pipeline.execute(get("/user")).await.unwrap();

        let headers: Vec<_> = h.transport.sent().into_iter().map(|s| s.authorization).collect();
        assert_eq!(headers, vec![Some("first".to_string()), Some("second".to_string()), None]);
    }

    #[tokio::test]
    async fn test_header_marked_sensitive() {
        let session = Arc::new(SessionStore::in_memory());
        session.set(Credential::new("tok-abc")).unwrap();
        let mut request = get("/user");

        AttachCredential::new(session).on_request(&mut request).unwrap();

        assert!(request.headers()[AUTHORIZATION].is_sensitive());
    }

    #[tokio::test]
    async fn test_invalid_credential_rejects_without_sending() {
        let h = harness(ScriptedTransport::new());
        h.session.set(Credential::new("bad\ntoken")).unwrap();

        let err = h.pipeline.execute(get("/user")).await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidCredential));
        assert!(h.transport.sent().is_empty());
        // Not an authentication failure: session stays as it was
        assert!(h.session.is_authenticated());
        assert_eq!(h.router.current().name, "home");
    }

    #[tokio::test]
    async fn test_401_revokes_and_navigates_once() {
        let h = harness(ScriptedTransport::new().respond("/user", Scripted::Status(401, "expired")));
        h.session.set(Credential::new("tok-abc")).unwrap();
        h.session.set_value("email_id", "ann@example.com").unwrap();
        let before = h.router.navigation_count();

        let err = h.pipeline.execute(get("/user")).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(h.session.get(), None);
        assert_eq!(h.session.email(), None);
        assert_eq!(h.router.current().name, "login");
        assert_eq!(h.router.navigation_count() - before, 1);
    }

    #[tokio::test]
    async fn test_each_401_fires_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let session = Arc::new(SessionStore::in_memory());
        let hook: Arc<dyn AuthFailureHook> = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let pipeline = Pipeline::builder(ScriptedTransport::new().respond("/user", Scripted::Status(401, "")))
            .stage(AttachCredential::new(session.clone()))
            .stage(RevokeOnUnauthorized::new(session.clone(), hook))
            .build();

        session.set(Credential::new("tok")).unwrap();
        assert!(pipeline.execute(get("/user")).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Already signed out: still revoked and redirected
        assert!(pipeline.execute(get("/user")).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.get(), None);
    }

    #[tokio::test]
    async fn test_other_failures_leave_session_alone() {
        let h = harness(
            ScriptedTransport::new()
                .respond("/ok", Scripted::Status(200, "{}"))
                .respond("/forbidden", Scripted::Status(403, ""))
                .respond("/broken", Scripted::Status(500, ""))
                .respond("/offline", Scripted::NetworkFailure),
        );
        h.session.set(Credential::new("tok-abc")).unwrap();
        let before = h.router.navigation_count();

        assert!(h.pipeline.execute(get("/ok")).await.is_ok());
        for path in ["/forbidden", "/broken", "/offline"] {
            assert!(h.pipeline.execute(get(path)).await.is_err());
        }

        assert_eq!(h.session.get(), Some(Credential::new("tok-abc")));
        assert_eq!(h.router.navigation_count(), before);
        assert_eq!(h.router.current().name, "home");
    }

    #[tokio::test]
    async fn test_in_flight_request_keeps_stale_credential() {
        let h = harness(
            ScriptedTransport::new()
                .respond("/slow", Scripted::Gated(200, "{}"))
                .respond("/expired", Scripted::Status(401, "")),
        );
        h.session.set(Credential::new("tok-abc")).unwrap();

        let (slow, expired) = tokio::join!(h.pipeline.execute(get("/slow")), async {
            let outcome = h.pipeline.execute(get("/expired")).await;
            h.transport.open_gate();
            outcome
        });

        assert!(slow.is_ok());
        assert!(matches!(expired, Err(ApiError::Unauthorized)));
        assert_eq!(h.transport.sent()[0].authorization.as_deref(), Some("tok-abc"));
        assert_eq!(h.session.get(), None);
        assert_eq!(h.router.current().name, "login");
    }
}
