//! End-to-end dispatch through router trees built by hand.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use vhost_dispatch::fs::{ByteSource, FileKind, Filesystem, TokioFs};
use vhost_dispatch::handler::{Build, BuildResult, Cached, Dynamic, Process};
use vhost_dispatch::response::{send_data, Payload};
use vhost_dispatch::routing::{normalize, DispatchContext, Domain, Raw, Router, RouteError, Simple, Subdomain};
use vhost_dispatch::statics::Static;

mod common;
use common::{read, request, request_accepting, text, RecordingFs, Site};

fn serve(dir: &Path) -> Router {
    Static::new(dir).into()
}

fn domain(children: Vec<(&str, Router)>) -> Router {
    let children: HashMap<String, Router> = children
        .into_iter()
        .map(|(label, router)| (label.to_string(), router))
        .collect();
    Domain::new(children).into()
}

struct Fixed(&'static str);

impl Process for Fixed {
    fn process<'a>(&'a self, _router: &'a Static, ctx: DispatchContext) -> BoxFuture<'a, Response> {
        futures_util::future::ready(send_data(&ctx, Payload::text(self.0))).boxed()
    }
}

/// Counts builds; each takes a little while so concurrent callers overlap.
#[derive(Clone, Default)]
struct SlowBuilder {
    builds: Arc<AtomicUsize>,
    fail: bool,
}

impl Build for SlowBuilder {
    fn build<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, BuildResult> {
        async move {
            self.builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                Err(RouteError::failure(std::io::Error::other("broken template")))
            } else {
                Ok(Arc::new(Fixed("built")) as Arc<dyn Process>)
            }
        }
        .boxed()
    }
}

/// Builds a handler that answers with a fixed label.
struct Labelled(&'static str);

impl Build for Labelled {
    fn build<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, BuildResult> {
        futures_util::future::ready(Ok(Arc::new(Fixed(self.0)) as Arc<dyn Process>)).boxed()
    }
}

/// Disk access where chosen paths are neither files nor directories.
struct SpecialFs {
    disk: TokioFs,
    special: Vec<std::path::PathBuf>,
}

impl Filesystem for SpecialFs {
    fn stat<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, std::io::Result<FileKind>> {
        if self.special.iter().any(|p| p == path) {
            return futures_util::future::ready(Ok(FileKind::Other)).boxed();
        }
        self.disk.stat(path)
    }

    fn read_dir<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, std::io::Result<Vec<String>>> {
        self.disk.read_dir(path)
    }

    fn open<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, std::io::Result<ByteSource>> {
        self.disk.open(path)
    }
}

#[tokio::test]
async fn same_request_same_response() {
    let site = Site::new();
    site.file("docs/a.txt", "alpha").file("docs/index.html", "<h1>docs</h1>");
    let root = serve(site.path());

    for uri in ["/docs/a.txt", "/docs/", "/docs/../docs/./a.txt", "/nope", "/%64ocs/a.txt"] {
        let first = text(root.dispatch(request("localhost", uri)).await).await;
        let second = text(root.dispatch(request("localhost", uri)).await).await;
        assert_eq!(first, second, "{uri}");
    }

    for raw in ["/a/../b/./c", "/%2e%2e/x", "/a//b/", "/x?y#z"] {
        let once = normalize(raw);
        assert_eq!(normalize(&once), once, "{raw}");
    }
}

#[tokio::test]
async fn build_runs_once_per_path() {
    let site = Site::new();
    site.file("page.tpl", "x").file("other.tpl", "y");

    let builder = SlowBuilder::default();
    let builds = builder.builds.clone();
    let root: Router = Static::new(site.path()).ext("tpl", Cached::new(builder)).into();

    let responses =
        futures_util::future::join_all((0..8).map(|_| root.dispatch(request("localhost", "/page.tpl")))).await;
    for res in responses {
        assert_eq!(text(res).await, (StatusCode::OK, "built".to_string()));
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let (status, body) = text(root.dispatch(request("localhost", "/page.tpl")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "built"));
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    text(root.dispatch(request("localhost", "/other.tpl")).await).await;
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_builds_are_retried() {
    let site = Site::new();
    site.file("page.tpl", "x");

    let builder = SlowBuilder {
        fail: true,
        ..Default::default()
    };
    let builds = builder.builds.clone();
    let root: Router = Static::new(site.path()).ext("tpl", Cached::new(builder)).into();

    let (status, body) = text(root.dispatch(request("localhost", "/page.tpl")).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("broken template"));

    let (status, _) = text(root.dispatch(request("localhost", "/page.tpl")).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn traversal_never_leaves_base() {
    let outer = Site::new();
    outer.file("secret.txt", "top secret");
    let base = outer.path().join("public");
    std::fs::create_dir(&base).unwrap();
    std::fs::write(base.join("ok.txt"), "fine").unwrap();

    let fs = RecordingFs::new();
    let root: Router = Static::new(&base).filesystem(fs.clone()).into();

    for uri in [
        "/../secret.txt",
        "/../../../../etc/passwd",
        "/%2e%2e/secret.txt",
        "/a/..%2f..%2fsecret.txt",
        "/..%5csecret.txt",
        "/ok.txt/../../secret.txt",
    ] {
        let (status, body) = text(root.dispatch(request("localhost", uri)).await).await;
        assert_ne!(body, "top secret", "{uri}");
        assert_ne!(status, StatusCode::OK, "{uri}");
    }

    let stats = fs.stats();
    assert!(!stats.is_empty());
    for path in stats.iter().chain(fs.opens().iter()) {
        assert!(path.starts_with(&base), "{} escaped {}", path.display(), base.display());
    }
}

#[tokio::test]
async fn hidden_paths_rejected_without_disk_access() {
    let site = Site::new();
    site.file(".env", "SECRET=1").file("app/.git/config", "[core]");

    let fs = RecordingFs::new();
    let root: Router = Static::new(site.path()).filesystem(fs.clone()).into();

    for uri in ["/.env", "/app/.git/config", "/app/.git/", "/%2eenv"] {
        let (status, _) = text(root.dispatch(request("localhost", uri)).await).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
    assert!(fs.stats().is_empty());
    assert!(fs.opens().is_empty());

    let fs = RecordingFs::new();
    let all: Router = Static::new(site.path()).all(true).filesystem(fs.clone()).into();
    let (status, body) = text(all.dispatch(request("localhost", "/.env")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "SECRET=1"));
    assert_eq!(fs.stats(), vec![site.path().join(".env")]);
}

#[tokio::test]
async fn hidden_check_ignores_base_itself() {
    let site = Site::new();
    site.file(".config/site/hello.txt", "hi");
    let root = serve(&site.path().join(".config/site"));

    let (status, body) = text(root.dispatch(request("localhost", "/hello.txt")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "hi"));
}

#[tokio::test]
async fn encoding_preference_is_fixed() {
    let site = Site::new();
    site.file("a.txt", "compress me please");
    let root = serve(site.path());

    let (_, headers, body) = read(root.dispatch(request_accepting("h", "/a.txt", "deflate;q=1, gzip;q=0.1")).await).await;
    assert_eq!(headers[header::CONTENT_ENCODING], "gzip");
    let mut out = String::new();
    flate2::read::GzDecoder::new(&body[..]).read_to_string(&mut out).unwrap();
    assert_eq!(out, "compress me please");

    let (_, headers, body) = read(root.dispatch(request_accepting("h", "/a.txt", "GZIP;q=0, Deflate")).await).await;
    assert_eq!(headers[header::CONTENT_ENCODING], "deflate");
    let mut out = String::new();
    flate2::read::ZlibDecoder::new(&body[..]).read_to_string(&mut out).unwrap();
    assert_eq!(out, "compress me please");

    let (_, headers, body) = read(root.dispatch(request_accepting("h", "/a.txt", "br")).await).await;
    assert!(!headers.contains_key(header::CONTENT_ENCODING));
    assert_eq!(body, b"compress me please");

    let (_, headers, body) = read(root.dispatch(request("h", "/a.txt")).await).await;
    assert!(!headers.contains_key(header::CONTENT_ENCODING));
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body, b"compress me please");
}

#[tokio::test]
async fn domain_falls_back_to_wildcard() {
    let docs = Site::new();
    docs.file("who.txt", "docs");
    let main = Site::new();
    main.file("who.txt", "main");

    let strict = domain(vec![("docs", serve(docs.path()))]);
    let (status, _) = text(strict.dispatch(request("blog.example.com", "/who.txt")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = text(strict.dispatch(request("DOCS.example.com:8080", "/who.txt")).await).await;
    assert_eq!(body, "docs");

    let open = domain(vec![("docs", serve(docs.path())), ("*", serve(main.path()))]);
    for host in ["blog.example.com", "example.com", "127.0.0.1", "localhost"] {
        let (_, body) = text(open.dispatch(request(host, "/who.txt")).await).await;
        assert_eq!(body, "main", "{host}");
    }
}

#[tokio::test]
async fn domain_chain_ends_in_its_own_not_found() {
    let passthrough = Raw::new(|_root, ctx, next| next.run(ctx));
    let root = domain(vec![("*", passthrough.into())]);

    let (status, body) = text(root.dispatch(request("example.com", "/x")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("404"));
}

#[tokio::test]
async fn nested_subdomains_consume_labels() {
    let v1 = Site::new();
    v1.file("who.txt", "v1");
    let docs = Site::new();
    docs.file("who.txt", "docs");

    let mut versions = HashMap::new();
    versions.insert("v1".to_string(), serve(v1.path()));
    versions.insert(String::new(), serve(docs.path()));
    let root = domain(vec![("docs", Subdomain::new(versions).into())]);

    let (_, body) = text(root.dispatch(request("docs.example.com", "/who.txt")).await).await;
    assert_eq!(body, "docs");
    let (_, body) = text(root.dispatch(request("docs.v1.example.com", "/who.txt")).await).await;
    assert_eq!(body, "v1");
    let (status, _) = text(root.dispatch(request("docs.v9.example.com", "/who.txt")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = text(root.dispatch(request("v1.docs.example.com", "/who.txt")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn domain_routes_on_leftmost_label() {
    let a = Site::new();
    a.file("who.txt", "a");
    let b = Site::new();
    b.file("who.txt", "b");

    let root = domain(vec![("a", serve(a.path())), ("b", serve(b.path()))]);
    let (_, body) = text(root.dispatch(request("a.b.example.com", "/who.txt")).await).await;
    assert_eq!(body, "a");
    let (_, body) = text(root.dispatch(request("b.a.example.com", "/who.txt")).await).await;
    assert_eq!(body, "b");
}

#[tokio::test]
async fn index_follows_listing_order() {
    let site = Site::new();
    site.file("both/index.txt", "text index").file("both/index.html", "html index");
    site.file("one/readme.md", "readme").file("one/index.htm", "only index");
    let root = serve(site.path());

    let (_, body) = text(root.dispatch(request("h", "/one/")).await).await;
    assert_eq!(body, "only index");

    let order = TokioFs.read_dir(&site.path().join("both")).await.unwrap();
    let expected = if order[0] == "index.txt" { "text index" } else { "html index" };
    let (_, body) = text(root.dispatch(request("h", "/both")).await).await;
    assert_eq!(body, expected);
}

#[tokio::test]
async fn listing_receives_exact_entries() {
    let site = Site::new();
    site.file("dir/b.txt", "b").file("dir/.hidden", "h").file("dir/indexes", "not an index");
    site.mkdir("dir/sub");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = seen.clone();
    let root: Router = Static::new(site.path())
        .listing(Arc::new(move |ctx: &DispatchContext, _dir: &Path, entries: &[String]| {
            captured.lock().unwrap().extend_from_slice(entries);
            send_data(ctx, Payload::text("listed"))
        }))
        .into();

    let (status, body) = text(root.dispatch(request("h", "/dir/")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "listed"));

    let mut entries = seen.lock().unwrap().clone();
    entries.sort();
    assert_eq!(entries, vec![".hidden", "b.txt", "indexes", "sub"]);
}

#[tokio::test]
async fn default_listing_links_entries() {
    let site = Site::new();
    site.file("files/a b.txt", "a");
    let root = serve(site.path());

    let (status, headers, body) = read(root.dispatch(request("h", "/files/")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(r#"href="/files/a%20b.txt""#));

    let (status, _) = text(Router::from(Static::new(site.path()).without_listing())
        .dispatch(request("h", "/files/"))
        .await)
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pre_filters_run_before_resolution() {
    let site = Site::new();
    site.file("status", "from disk");

    let health = Simple::new("/status", |_root, ctx, _next| {
        futures_util::future::ready(send_data(&ctx, Payload::text("ok"))).boxed()
    });
    let root: Router = Static::new(site.path()).handler(Router::from(health)).into();

    let (_, body) = text(root.dispatch(request("h", "/status")).await).await;
    assert_eq!(body, "ok");
    let (status, _) = text(root.dispatch(request("h", "/missing")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dynamic_manifests_are_evaluated_once() {
    let site = Site::new();
    site.file(
        "api/hello!",
        "status = 201\ncontent_type = \"application/json\"\nbody = '{\"hello\":true}'\n\n[headers]\ncache-control = \"no-store\"\n",
    );
    site.file("api/data!", "file = \"data.json\"\n").file("api/data.json", "[1,2]");
    site.file("api/escape!", "file = \"../outside.txt\"\n");

    let fs: Arc<dyn Filesystem> = Arc::new(TokioFs);
    let root: Router = Static::new(site.path()).handler(Dynamic::new(fs)).into();

    let (status, headers, body) = read(root.dispatch(request("h", "/api/hello!")).await).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(body, br#"{"hello":true}"#);

    site.file("api/hello!", "status = 500\n");
    let (status, _) = text(root.dispatch(request("h", "/api/hello!")).await).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, headers, body) = read(root.dispatch(request("h", "/api/data!")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(body, b"[1,2]");

    let (status, body) = text(root.dispatch(request("h", "/api/escape!")).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("leaves the manifest directory"));

    let (status, _) = text(root.dispatch(request("h", "/api/missing!")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dynamic_resources_follow_hidden_rule() {
    let site = Site::new();
    site.file(".private/report!", "body = 'internal'\n");
    site.file("api/env!", "file = \".env\"\n").file("api/.env", "TOKEN=1");

    let recording = RecordingFs::new();
    let strict: Router = Static::new(site.path())
        .handler(Dynamic::new(recording.clone()))
        .filesystem(recording.clone())
        .into();

    let (status, _) = text(strict.dispatch(request("h", "/.private/report!")).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(recording.stats().is_empty());
    let (status, _) = text(strict.dispatch(request("h", "/api/env!")).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let fs: Arc<dyn Filesystem> = Arc::new(TokioFs);
    let open: Router = Static::new(site.path()).all(true).handler(Dynamic::new(fs)).into();
    let (status, body) = text(open.dispatch(request("h", "/.private/report!")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "internal"));
    let (status, body) = text(open.dispatch(request("h", "/api/env!")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "TOKEN=1"));
}

#[tokio::test]
async fn exact_extension_wins_over_wildcard() {
    let site = Site::new();
    site.file("notes.txt", "raw text").file("page.md", "# raw").file("Makefile", "all:");

    let root: Router = Static::new(site.path())
        .ext("*", Cached::new(Labelled("any")))
        .ext("txt", Cached::new(Labelled("text")))
        .into();

    let (_, body) = text(root.dispatch(request("localhost", "/notes.txt")).await).await;
    assert_eq!(body, "text");
    let (_, body) = text(root.dispatch(request("localhost", "/page.md")).await).await;
    assert_eq!(body, "any");
    let (_, body) = text(root.dispatch(request("localhost", "/Makefile")).await).await;
    assert_eq!(body, "any");

    let plain: Router = Static::new(site.path()).ext("txt", Cached::new(Labelled("text"))).into();
    let (_, body) = text(plain.dispatch(request("localhost", "/page.md")).await).await;
    assert_eq!(body, "# raw");
}

#[tokio::test]
async fn special_entries_are_not_found() {
    let site = Site::new();
    site.file("pipe", "").file("real.txt", "real");

    let fs = Arc::new(SpecialFs {
        disk: TokioFs,
        special: vec![site.path().join("pipe")],
    });
    let root: Router = Static::new(site.path())
        .ext("*", Cached::new(Labelled("any")))
        .filesystem(fs)
        .into();

    let (status, _) = text(root.dispatch(request("localhost", "/pipe")).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = text(root.dispatch(request("localhost", "/real.txt")).await).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "any"));
}
