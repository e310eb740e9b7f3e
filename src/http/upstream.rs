//! Upstream forwarding application.
//!
//! # Responsibilities
//! - Rewrite scheme/authority to the configured backend
//! - Set `X-Forwarded-Host` and `X-Forwarded-Proto` from the resolved request,
//!   overwriting whatever the client sent
//! - Extend `X-Forwarded-For` only when the peer is a trusted proxy
//! - Stream request and response bodies through unchanged
//! - Answer 502 when the backend cannot be reached

use std::net::SocketAddr;
use std::str::FromStr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderValue, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::http::application::Application;
use crate::http::request::{RequestInfo, X_FORWARDED_FOR, X_FORWARDED_HOST, X_FORWARDED_PROTO};
use crate::routing::error::{RouteError, RouteResult};
use crate::security::TrustProxy;

/// Backend a request is forwarded to.
#[derive(Debug, Clone)]
pub struct Upstream {
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl Upstream {
    /// `url` must be an absolute `http://host[:port]` URL.
    pub fn new(url: &str) -> RouteResult<Self> {
        let invalid = |reason: &str| RouteError::InvalidArgument(format!("upstream {url:?}: {reason}"));

        let uri = Uri::from_str(url).map_err(|e| invalid(&e.to_string()))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid("only http upstreams are supported"));
        }
        let authority = uri.authority().cloned().ok_or_else(|| invalid("host required"))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { authority, client })
    }

    /// Mountable application forwarding every request here.
    pub fn into_application(self) -> Application {
        Application::from_fn(move |req: Request<Body>| {
            let upstream = self.clone();
            async move { upstream.forward(req).await }
        })
    }

    pub async fn forward(&self, req: Request<Body>) -> Response {
        // Mounted behind a router the request carries its resolved view.
        let info = match req.extensions().get::<RequestInfo>() {
            Some(info) => info.clone(),
            None => RequestInfo::resolve(&req, &TrustProxy::none()),
        };
        let (mut parts, body) = req.into_parts();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build upstream URI");
                return StatusCode::BAD_GATEWAY.into_response();
            }
        };

        let headers = &mut parts.headers;
        match HeaderValue::from_str(&info.host) {
            Ok(host) if !info.host.is_empty() => {
                headers.insert(X_FORWARDED_HOST, host);
            }
            _ => {
                headers.remove(X_FORWARDED_HOST);
            }
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(info.protocol.as_str()));

        let prior = info
            .trusted_proxy
            .then(|| headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()))
            .flatten();
        let chain = match (prior, peer) {
            (Some(prior), Some(ip)) => Some(format!("{prior}, {ip}")),
            (Some(prior), None) => Some(prior.to_string()),
            (None, Some(ip)) => Some(ip.to_string()),
            (None, None) => None,
        };
        match chain.map(|chain| HeaderValue::from_str(&chain)) {
            Some(Ok(value)) => {
                headers.insert(X_FORWARDED_FOR, value);
            }
            _ => {
                headers.remove(X_FORWARDED_FOR);
            }
        }
        headers.remove(header::HOST);

        let target = parts.uri.clone();
        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(res) => into_response(res),
            Err(e) => {
                tracing::warn!(upstream = %target, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

fn into_response(res: hyper::Response<Incoming>) -> Response {
    let (parts, body) = res.into_parts();
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_urls_only() {
        assert!(Upstream::new("http://127.0.0.1:3000").is_ok());
        assert!(Upstream::new("http://backend").is_ok());
        assert!(Upstream::new("https://127.0.0.1:3000").is_err());
        assert!(Upstream::new("127.0.0.1:3000").is_err());
        assert!(Upstream::new("not a url").is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let upstream = Upstream::new(&format!("http://127.0.0.1:{port}")).unwrap();
        let req = Request::builder()
            .uri("/x")
            .header("host", "example.com")
            .body(Body::empty())
            .unwrap();

        let res = upstream.into_application().call(req).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
