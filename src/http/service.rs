//! Request dispatch for one listener.
//!
//! `RouterService` is what a listener serves: it resolves the request's
//! protocol and host, asks the [`Router`] for a decision, and turns that
//! decision into a response or hands the request to the mounted application.
//! Forwarded requests carry the resolved [`RequestInfo`] as an extension.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::future::{BoxFuture, FutureExt};
use tower::Service;

use crate::http::request::RequestInfo;
use crate::http::response::{self, ErrorResponder};
use crate::observability::metrics;
use crate::routing::{Outcome, Router};
use crate::security::TrustProxy;

/// Dispatching `tower::Service` over a frozen [`Router`].
#[derive(Clone)]
pub struct RouterService {
    router: Arc<Router>,
    errors: ErrorResponder,
    trust: TrustProxy,
}

impl RouterService {
    pub fn new(router: Arc<Router>, errors: ErrorResponder, trust: TrustProxy) -> Self {
        Self { router, errors, trust }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Dispatch one request.
    pub fn dispatch(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        let start = Instant::now();
        let info = RequestInfo::resolve(&req, &self.trust);
        let protocol = info.protocol.as_str();

        let outcome = match self.router.route(&info) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    listener = %self.router.binding(),
                    hostname = %info.hostname,
                    error = %e,
                    "Rejecting request"
                );
                metrics::record_dispatch("error", protocol, start);
                let res = (self.errors)(e.status());
                return async move { res }.boxed();
            }
        };

        tracing::debug!(
            listener = %self.router.binding(),
            hostname = %info.hostname,
            protocol = protocol,
            path = %info.path_and_query,
            outcome = outcome.label(),
            "Dispatching request"
        );

        let label = outcome.label();
        match outcome {
            Outcome::Forward(app) => {
                let mut req = req;
                req.extensions_mut().insert(info);
                let fut = app.call(req);
                async move {
                    let res = fut.await;
                    metrics::record_dispatch(label, protocol, start);
                    res
                }
                .boxed()
            }
            Outcome::Redirect { code, location } | Outcome::SecureRedirect { code, location } => {
                let res = match response::redirect(code, &location) {
                    Ok(res) => res,
                    Err(e) => {
                        tracing::warn!(location = %location, error = %e, "Redirect location is not a valid header");
                        metrics::record_dispatch("error", protocol, start);
                        let res = (self.errors)(StatusCode::BAD_REQUEST);
                        return async move { res }.boxed();
                    }
                };
                metrics::record_dispatch(label, protocol, start);
                async move { res }.boxed()
            }
            Outcome::NotFound => {
                metrics::record_dispatch(label, protocol, start);
                let res = (self.errors)(StatusCode::NOT_FOUND);
                async move { res }.boxed()
            }
        }
    }
}

impl Service<Request<Body>> for RouterService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.dispatch(req).map(Ok).boxed()
    }
}

impl std::fmt::Debug for RouterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterService")
            .field("router", &self.router)
            .field("trust", &self.trust)
            .finish_non_exhaustive()
    }
}
