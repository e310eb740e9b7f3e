//! End-to-end dispatch tests over real sockets.

use std::net::SocketAddr;

use axum::http::StatusCode;
use reqwest::header::LOCATION;
use vhost_router::http::{Application, MountOptions, RedirectOptions, Upstream, VirtualHosts};
use vhost_router::net::ListenerError;
use vhost_router::TrustProxy;

mod common;

fn no_content() -> Application {
    Application::from_fn(|_req| async { StatusCode::NO_CONTENT })
}

fn text(body: &'static str) -> Application {
    Application::from_fn(move |_req| async move { body })
}

#[tokio::test]
async fn catch_all_mount_serves_requests_without_host() {
    let mut hosts = VirtualHosts::new();
    hosts
        .add(no_content(), "http://127.0.0.1:28301", MountOptions::default())
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let addr = handle.local_addr().unwrap();

    let response = common::raw_request(addr, "GET / HTTP/1.0\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1."), "unexpected response: {response}");
    assert!(response.contains(" 204 "), "unexpected response: {response}");

    handle.close().await.unwrap();
}

#[tokio::test]
async fn unmatched_hostname_is_not_found() {
    let mut hosts = VirtualHosts::new();
    hosts
        .add(no_content(), "http://127.0.0.1:28302", MountOptions::hostnames(["example.com"]))
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let url = format!("http://{}/", handle.local_addr().unwrap());
    let client = common::client();

    let res = client.get(&url).header("host", "example.org").send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client.get(&url).header("host", "example.com").send().await.unwrap();
    assert_eq!(res.status(), 204);

    handle.close().await.unwrap();
}

#[tokio::test]
async fn force_tls_redirects_insecure_requests() {
    let mut hosts = VirtualHosts::new();
    hosts
        .add(no_content(), "https://127.0.0.1:28303", MountOptions::default().force_tls(true))
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let addr = handle.local_addr().unwrap();

    let res = common::client()
        .get(format!("http://{addr}/foo?bar=baz"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()[LOCATION], format!("https://{addr}/foo?bar=baz"));

    handle.close().await.unwrap();
}

#[tokio::test]
async fn force_tls_trusts_forwarded_headers_from_trusted_proxy() {
    let mut hosts = VirtualHosts::new().with_trust_proxy(TrustProxy::all());
    hosts
        .add(no_content(), "https://127.0.0.1:28304", MountOptions::default().force_tls(true))
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let url = format!("http://{}/a/b?c=d", handle.local_addr().unwrap());
    let client = common::client();

    let res = client
        .get(&url)
        .header("x-forwarded-host", "public.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()[LOCATION], "https://public.example.com/a/b?c=d");

    // TLS already terminated at the proxy.
    let res = client
        .get(&url)
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    handle.close().await.unwrap();
}

#[tokio::test]
async fn forwarded_headers_ignored_without_trust() {
    let mut hosts = VirtualHosts::new();
    hosts
        .add(no_content(), "https://127.0.0.1:28305", MountOptions::default().force_tls(true))
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let addr = handle.local_addr().unwrap();

    let res = common::client()
        .get(format!("http://{addr}/"))
        .header("x-forwarded-host", "evil.example.com")
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()[LOCATION], format!("https://{addr}/"));

    handle.close().await.unwrap();
}

#[tokio::test]
async fn hostname_alias_redirects_to_target() {
    let mut hosts = VirtualHosts::new();
    hosts
        .redirect("http://127.0.0.1:28306", ("example.org", "example.com"), RedirectOptions::default())
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let addr = handle.local_addr().unwrap();
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/"))
        .header("host", "example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()[LOCATION], "http://example.com/");

    let res = client
        .get(format!("http://{addr}/x/y?z=1&z=2"))
        .header("host", "example.org:28306")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[LOCATION], "http://example.com/x/y?z=1&z=2");

    handle.close().await.unwrap();
}

#[tokio::test]
async fn mount_aliases_use_configured_code() {
    let mut hosts = VirtualHosts::new().with_redirect_code(301).unwrap();
    hosts
        .add(
            text("primary"),
            "http://127.0.0.1:28307",
            MountOptions::hostnames(["example.com"]).aliases(["www.example.com", "example.net"]),
        )
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let url = format!("http://{}/p", handle.local_addr().unwrap());
    let client = common::client();

    for alias in ["www.example.com", "example.net"] {
        let res = client.get(&url).header("host", alias).send().await.unwrap();
        assert_eq!(res.status(), 301);
        assert_eq!(res.headers()[LOCATION], "http://example.com/p");
    }

    let res = client.get(&url).header("host", "example.com").send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "primary");

    handle.close().await.unwrap();
}

#[tokio::test]
async fn apps_on_one_address_stay_isolated() {
    let mut hosts = VirtualHosts::new();
    hosts
        .add(text("com"), "http://127.0.0.1:28308", MountOptions::hostnames(["example.com"]))
        .unwrap()
        .add(text("org"), "http://127.0.0.1:28308", MountOptions::hostnames(["example.org"]))
        .unwrap();

    let listeners = hosts.listeners();
    assert_eq!(listeners.len(), 1);
    let handle = listeners.into_iter().next().unwrap().listen().await.unwrap();
    let url = format!("http://{}/", handle.local_addr().unwrap());
    let client = common::client();

    for (host, body) in [("example.com", "com"), ("EXAMPLE.ORG", "org"), ("example.com:28308", "com")] {
        let res = client.get(&url).header("host", host).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), body, "host {host}");
    }

    handle.close().await.unwrap();
}

#[tokio::test]
async fn wildcard_subdomains_fall_back_by_specificity() {
    let mut hosts = VirtualHosts::new();
    let address = "http://127.0.0.1:28309";
    hosts
        .add(text("any"), address, MountOptions::hostnames(["*"]))
        .unwrap()
        .add(text("example"), address, MountOptions::hostnames(["*.example.com"]))
        .unwrap()
        .add(text("apex"), address, MountOptions::hostnames(["example.com"]))
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let url = format!("http://{}/", handle.local_addr().unwrap());
    let client = common::client();

    for (host, body) in [
        ("a.b.example.com", "example"),
        ("example.com", "apex"),
        ("example.org", "any"),
    ] {
        let res = client.get(&url).header("host", host).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), body, "host {host}");
    }

    handle.close().await.unwrap();
}

#[tokio::test]
async fn upstream_app_forwards_with_headers() {
    let backend: SocketAddr = "127.0.0.1:28311".parse().unwrap();
    common::start_mock_backend(backend, "from-backend").await;

    let mut hosts = VirtualHosts::new();
    hosts
        .add(
            Upstream::new(&format!("http://{backend}")).unwrap().into_application(),
            "http://127.0.0.1:28310",
            MountOptions::hostnames(["api.example.com"]),
        )
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let addr = handle.local_addr().unwrap();

    let res = common::client()
        .get(format!("http://{addr}/v1/items?id=7"))
        .header("host", "api.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let head = res.headers()["x-request-head"].to_str().unwrap().to_ascii_lowercase();
    assert!(head.starts_with("get /v1/items?id=7 http/1.1"), "head: {head}");
    assert!(head.contains("x-forwarded-host: api.example.com"), "head: {head}");
    assert!(head.contains("x-forwarded-proto: http"), "head: {head}");
    assert!(head.contains("x-forwarded-for: 127.0.0.1"), "head: {head}");
    assert_eq!(res.text().await.unwrap(), "from-backend");

    handle.close().await.unwrap();
}

#[tokio::test]
async fn listen_rejects_port_in_use() {
    let _taken = tokio::net::TcpListener::bind("127.0.0.1:28312").await.unwrap();

    let mut hosts = VirtualHosts::new();
    hosts
        .add(no_content(), "http://127.0.0.1:28312", MountOptions::default())
        .unwrap();
    let err = hosts.listeners().remove(0).listen().await.unwrap_err();
    assert!(matches!(err, ListenerError::Bind { .. }), "unexpected error: {err}");
}

#[cfg(unix)]
#[tokio::test]
async fn serves_unix_domain_socket() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let path = std::env::temp_dir().join(format!("vhost-router-it-{}.sock", std::process::id()));
    let mut hosts = VirtualHosts::new();
    hosts
        .add(
            text("unix"),
            &format!("http://unix:{}", path.display()),
            MountOptions::hostnames(["example.com"]),
        )
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    assert!(handle.local_addr().is_none());

    let mut stream = tokio::net::UnixStream::connect(&path).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n")
        .await
        .unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    assert!(out.contains(" 200 "), "unexpected response: {out}");
    assert!(out.ends_with("unix"), "unexpected response: {out}");

    handle.close().await.unwrap();
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn upstream_overwrites_spoofed_forwarded_headers() {
    let backend: SocketAddr = "127.0.0.1:28313".parse().unwrap();
    common::start_mock_backend(backend, "from-backend").await;

    let mut hosts = VirtualHosts::new();
    hosts
        .add(
            Upstream::new(&format!("http://{backend}")).unwrap().into_application(),
            "http://127.0.0.1:28314",
            MountOptions::hostnames(["api.example.com"]),
        )
        .unwrap();
    let handle = hosts.listeners().remove(0).listen().await.unwrap();
    let addr = handle.local_addr().unwrap();

    let res = common::client()
        .get(format!("http://{addr}/"))
        .header("host", "api.example.com")
        .header("x-forwarded-proto", "https")
        .header("x-forwarded-host", "evil.example.com")
        .header("x-forwarded-for", "10.9.8.7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let head = res.headers()["x-request-head"].to_str().unwrap().to_ascii_lowercase();
    let lines: Vec<&str> = head.split('|').collect();
    assert!(lines.contains(&"x-forwarded-proto: http"), "head: {head}");
    assert!(lines.contains(&"x-forwarded-host: api.example.com"), "head: {head}");
    assert!(lines.contains(&"x-forwarded-for: 127.0.0.1"), "head: {head}");
    assert!(!head.contains("evil.example.com"), "head: {head}");
    assert!(!head.contains("10.9.8.7"), "head: {head}");

    handle.close().await.unwrap();
}
