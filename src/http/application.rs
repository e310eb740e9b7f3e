//! Mounted applications.
//!
//! The router treats every mounted application as an opaque request handler.
//! Anything that is a `tower::Service` over axum requests (an `axum::Router`,
//! a handler service, a `tower` stack) or a plain async fn can be mounted.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};
use tower::{Service, ServiceExt};

type Handler = dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync;

/// Cheaply clonable handle to a mounted request handler.
#[derive(Clone)]
pub struct Application {
    inner: Arc<Handler>,
}

impl Application {
    /// Wrap a `tower::Service`. The service is cloned for every request.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request<Body>, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Response: IntoResponse,
        S::Future: Send + 'static,
    {
        Self {
            inner: Arc::new(move |req: Request<Body>| {
                let service = service.clone();
                async move {
                    match service.oneshot(req).await {
                        Ok(res) => res.into_response(),
                        Err(never) => match never {},
                    }
                }
                .boxed()
            }),
        }
    }

    /// Wrap an async function.
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self {
            inner: Arc::new(move |req: Request<Body>| {
                let fut = f(req);
                async move { fut.await.into_response() }.boxed()
            }),
        }
    }

    /// Hand the request to the application.
    pub fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        (self.inner)(req)
    }

    /// Whether two handles point at the same application.
    pub fn ptr_eq(&self, other: &Application) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application").finish_non_exhaustive()
    }
}
