//! End-to-end resolution runs against a mock hosting site

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::StreamExt;
use link_resolver::config::{parse_config, ResolverConfig};
use link_resolver::{LinkMode, Resolved, Resolver, SourceReference};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Hosts on the mock server are told apart by path, since they share 127.0.0.1
fn site_config(base_url: &str) -> ResolverConfig {
    let toml = format!(
        r#"
[resolver]
max-hops = 5
per-hop-timeout-ms = 2000
overall-timeout-ms = 5000

[aliases]
remote-url = "{base}/aliases.json"

[[host]]
name = "index"
path-markers = ["/post/"]
strategy = {{ kind = "aggregator", button-texts = ["download"] }}

[[host]]
name = "gate"
alias = "gate"
path-markers = ["/go/"]
strategy = {{ kind = "redirect" }}

[[host]]
name = "vault"
path-markers = ["/embed/"]
allows-streaming = true
referer-header = true
strategy = {{ kind = "cipher", payload-pattern = 'data-payload="([^"]+)"', decode = [{{ op = "base64" }}], url-pointer = "/file", subtitles-pointer = "/tracks" }}
"#,
        base = base_url
    );

    parse_config(&toml).expect("Failed to parse config")
}

async fn mount_redirect(server: &MockServer, from: &str, to: &str) {
    Mock::given(method("GET"))
        .and(path(from))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", to))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_aliases(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/aliases.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_redirect_chain_resolves_to_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_aliases(&mock_server, format!(r#"{{"gate": "{}"}}"#, base_url)).await;
    mount_redirect(&mock_server, "/go/a", "/go/a2").await;
    mount_redirect(&mock_server, "/go/a2", "/files/movie.720p.mkv").await;

    let resolver = Resolver::from_config(site_config(&base_url)).unwrap();
    let ranked = resolver
        .collect_ranked(
            SourceReference::new(format!("{}/go/a", base_url)),
            LinkMode::DownloadOnly,
        )
        .await;

    assert_eq!(ranked.links.len(), 1);
    let best = ranked.best().unwrap();
    assert_eq!(best.link.url, format!("{}/files/movie.720p.mkv", base_url));
    assert_eq!(best.link.source_tag, "gate");
}

#[tokio::test]
async fn test_alias_rewrites_dead_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_aliases(&mock_server, format!(r#"{{"gate": "{}"}}"#, base_url)).await;
    mount_redirect(&mock_server, "/go/old", "/files/show.s01e01.1080p.mkv").await;

    let resolver = Resolver::from_config(site_config(&base_url)).unwrap();

    // The reference still points at a domain the host abandoned
    let ranked = resolver
        .collect_ranked(
            SourceReference::new("http://gate-retired.invalid/go/old"),
            LinkMode::DownloadOnly,
        )
        .await;

    assert_eq!(ranked.links.len(), 1);
    assert_eq!(
        ranked.links[0].link.url,
        format!("{}/files/show.s01e01.1080p.mkv", base_url)
    );
    assert!(resolver.aliases().fetched_at().is_some());
}

#[tokio::test]
async fn test_index_page_fans_out_and_ranks() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_aliases(&mock_server, format!(r#"{{"gate": "{}"}}"#, base_url)).await;

    mount_page(
        &mock_server,
        "/post/42",
        r#"<html><head><title>Movie (2023)</title></head><body>
            <a href="/go/720">Download 720p</a>
            <a href="/embed/x1">Download 1080p</a>
            <a href="/about">About</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_redirect(&mock_server, "/go/720", "/files/movie.720p.mkv").await;

    let payload = STANDARD.encode(format!(
        r#"{{"file": "{base}/files/movie.1080p.x265.mkv", "tracks": [{{"label": "English", "file": "{base}/subs/en.vtt"}}]}}"#,
        base = base_url
    ));
    mount_page(
        &mock_server,
        "/embed/x1",
        format!(
            r#"<html><head><title>Movie 1080p</title></head><body><div data-payload="{}"></div></body></html>"#,
            payload
        ),
    )
    .await;

    let resolver = Resolver::from_config(site_config(&base_url)).unwrap();
    let ranked = resolver
        .collect_ranked(
            SourceReference::new(format!("{}/post/42", base_url)),
            LinkMode::DownloadOnly,
        )
        .await;

    let urls: Vec<&str> = ranked.links.iter().map(|l| l.link.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/files/movie.1080p.x265.mkv", base_url).as_str(),
            format!("{}/files/movie.720p.mkv", base_url).as_str(),
        ]
    );
    assert!(ranked.links[0].score > ranked.links[1].score);

    let vault = &ranked.links[0].link;
    assert_eq!(vault.source_tag, "vault");
    assert_eq!(
        vault.headers.get("Referer").map(String::as_str),
        Some(format!("{}/embed/x1", base_url).as_str())
    );

    assert_eq!(ranked.subtitles.len(), 1);
    assert_eq!(ranked.subtitles[0].language, "English");
}

#[tokio::test]
async fn test_failing_button_does_not_abort_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_aliases(&mock_server, format!(r#"{{"gate": "{}"}}"#, base_url)).await;

    mount_page(
        &mock_server,
        "/post/7",
        r#"<a href="/go/ok">Download</a> <a href="/embed/broken">Download mirror</a>"#.to_string(),
    )
    .await;
    mount_redirect(&mock_server, "/go/ok", "/files/clip.mp4").await;

    // The cipher host has no payload on its page
    mount_page(&mock_server, "/embed/broken", "<html>gone</html>".to_string()).await;

    let resolver = Resolver::from_config(site_config(&base_url)).unwrap();
    let items: Vec<Resolved> = resolver
        .resolve_all(
            SourceReference::new(format!("{}/post/7", base_url)),
            LinkMode::DownloadOnly,
        )
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    match &items[0] {
        Resolved::Link(scored) => {
            assert_eq!(scored.link.url, format!("{}/files/clip.mp4", base_url));
        }
        other => panic!("unexpected item {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_loop_yields_nothing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_aliases(&mock_server, format!(r#"{{"gate": "{}"}}"#, base_url)).await;
    mount_redirect(&mock_server, "/go/ping", "/go/pong").await;
    mount_redirect(&mock_server, "/go/pong", "/go/ping").await;

    let resolver = Resolver::from_config(site_config(&base_url)).unwrap();
    let ranked = resolver
        .collect_ranked(
            SourceReference::new(format!("{}/go/ping", base_url)),
            LinkMode::DownloadOnly,
        )
        .await;

    assert!(ranked.is_empty());
}
