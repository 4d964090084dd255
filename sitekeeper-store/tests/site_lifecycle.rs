//! End-to-end store behaviour against the simulated `hugo` and `git`.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use sitekeeper_core::{Lookup, NewSite, Settings, SiteId, SiteMetadata, ThemeName};
use sitekeeper_runner::fake::FakeRunner;
use sitekeeper_runner::CancellationToken;
use sitekeeper_store::{open_stores_with, SiteStore, StoreError};

const ANANKE_URL: &str = "https://github.com/theNewDynamic/gohugo-theme-ananke.git";

fn settings(tmp: &TempDir) -> Settings {
    Settings {
        sites_root: tmp.path().join("sites"),
        themes_root: tmp.path().join("themes"),
        ..Settings::default()
    }
}

fn open(tmp: &TempDir, runner: Arc<FakeRunner>) -> SiteStore {
    open_stores_with(&settings(tmp), runner)
}

fn new_site(id: &str, theme: &str, url: Option<&str>) -> NewSite {
    NewSite {
        id: SiteId::new(id).expect("site id"),
        theme: ThemeName::new(theme).expect("theme name"),
        theme_url: url.map(str::to_owned),
        metadata: SiteMetadata {
            base_url: "https://acme.example.com/".into(),
            language_code: "en-us".into(),
            title: "Acme Corp".into(),
        },
    }
}

fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[tokio::test]
async fn acme_with_remote_ananke() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git());
    let store = open(&tmp, runner.clone());
    let cancel = CancellationToken::new();

    tmp.child("themes/ananke").assert(predicate::path::missing());
    store
        .create(new_site("acme", "ananke", Some(ANANKE_URL)), &cancel)
        .await
        .expect("create acme");

    assert_eq!(runner.calls_to("git").len(), 1, "exactly one fetch");
    let acme = tmp.child("sites/acme");
    acme.child("content").assert(predicate::path::is_dir());
    acme.child("layout").assert(predicate::path::is_dir());
    acme.child("public").assert(predicate::path::is_dir());
    acme.child("config.toml")
        .assert(predicate::str::contains("theme = \"ananke\""));

    let site = match store.find(&SiteId::new("acme").unwrap()).await {
        Lookup::Found(site) => site,
        other => panic!("expected acme to be found, got {:?}", other.detail()),
    };
    site.build(&cancel).await.expect("build");

    let builds: Vec<_> = runner
        .calls_to("hugo")
        .into_iter()
        .filter(|inv| inv.args.is_empty())
        .collect();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].working_dir, acme.path());
}

#[tokio::test]
async fn scaffolded_hugo_toml_does_not_shadow_site_config() {
    let tmp = TempDir::new().unwrap();
    // Current hugo writes hugo.toml on `new site`, and prefers it over config.toml.
    let runner = Arc::new(FakeRunner::new(|inv| {
        let out = sitekeeper_runner::fake::simulate(inv);
        let args = inv.args_lossy();
        if inv.program == "hugo" && args.len() > 2 && args[0] == "new" {
            let site = inv.working_dir.join(&args[2]);
            fs::write(site.join("hugo.toml"), "baseURL = 'https://example.org/'\n").unwrap();
        }
        out
    }));
    let store = open(&tmp, runner.clone());
    let cancel = CancellationToken::new();
    store
        .create(new_site("acme", "ananke", Some(ANANKE_URL)), &cancel)
        .await
        .expect("create acme");

    let acme = tmp.child("sites/acme");
    acme.child("hugo.toml").assert(predicate::path::missing());
    acme.child("config.toml")
        .assert(predicate::str::contains("theme = \"ananke\""))
        .assert(predicate::str::contains("https://acme.example.com/"));

    store
        .build(&SiteId::new("acme").unwrap(), &cancel)
        .await
        .expect("build");
    acme.child("public/index.html").assert(predicate::path::is_file());
}

#[tokio::test]
async fn find_after_create_matches_request() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, Arc::new(FakeRunner::hugo_and_git()));
    let request = new_site("acme", "ananke", Some(ANANKE_URL));
    store
        .create(request.clone(), &CancellationToken::new())
        .await
        .expect("create");

    let site = store
        .find(&request.id)
        .await
        .found()
        .expect("site present");
    let config = site.config();
    assert_eq!(config.metadata, request.metadata);
    assert_eq!(config.theme, request.theme);

    let sites_root = tmp.path().join("sites");
    assert!(config.root.starts_with(&sites_root));
    for dir in config.layout.site_dirs() {
        assert!(dir.starts_with(&config.root), "{} outside site root", dir.display());
    }
    assert_eq!(config.layout.themes_dir, tmp.path().join("themes"));
}

#[tokio::test]
async fn missing_theme_without_url_leaves_nothing() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git());
    let store = open(&tmp, runner.clone());

    for url in [None, Some("")] {
        let err = store
            .create(new_site("acme", "ananke", url), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingThemeSource { .. }), "got: {err}");
    }
    assert!(runner.calls().is_empty());
    assert!(dir_is_empty(&tmp.path().join("sites")));
    assert!(matches!(
        store.find(&SiteId::new("acme").unwrap()).await,
        Lookup::NotFound
    ));
}

#[tokio::test]
async fn failed_fetch_fails_create_and_leaves_nothing() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git());
    let store = open(&tmp, runner.clone());

    let err = store
        .create(
            new_site("acme", "ananke", Some("https://example.com/missing.git")),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("repository not found"), "got: {err}");
    assert!(runner.calls_to("hugo").is_empty(), "no scaffold after failed fetch");
    assert!(dir_is_empty(&tmp.path().join("sites")));
    assert!(dir_is_empty(&tmp.path().join("themes")));
}

#[tokio::test]
async fn fetched_theme_is_reused_by_next_site() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git());
    let store = open(&tmp, runner.clone());
    let cancel = CancellationToken::new();

    store
        .create(new_site("acme", "ananke", Some(ANANKE_URL)), &cancel)
        .await
        .expect("acme");
    store
        .create(new_site("globex", "ananke", Some(ANANKE_URL)), &cancel)
        .await
        .expect("globex");

    assert_eq!(runner.calls_to("git").len(), 1);
    let ids: Vec<String> = store.list().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(ids, ["acme", "globex"]);
}

#[tokio::test]
async fn local_theme_needs_no_url() {
    let tmp = TempDir::new().unwrap();
    tmp.child("themes/hyde/theme.toml").write_str("").unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git());
    let store = open(&tmp, runner.clone());

    store
        .create(new_site("acme", "hyde", None), &CancellationToken::new())
        .await
        .expect("create with local theme");
    assert!(runner.calls_to("git").is_empty());
}

#[tokio::test]
async fn failed_scaffold_leaves_no_site_and_no_staged_config() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::new(|inv| {
        if inv.program == "hugo" {
            sitekeeper_runner::CommandOutput::failed(255, "Error: bad config\n")
        } else {
            sitekeeper_runner::fake::simulate(inv)
        }
    }));
    let store = open(&tmp, runner);

    let err = store
        .create(new_site("acme", "ananke", Some(ANANKE_URL)), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        StoreError::Engine {
            operation, stderr, ..
        } => {
            assert_eq!(operation, "scaffold");
            assert!(stderr.contains("bad config"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(dir_is_empty(&tmp.path().join("sites")));
    // The theme fetch itself succeeded and stays.
    tmp.child("themes/ananke").assert(predicate::path::is_dir());
}

#[tokio::test]
async fn cancelled_create_leaves_nothing() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git().with_delay(Duration::from_millis(200)));
    let store = Arc::new(open(&tmp, runner));
    let cancel = CancellationToken::new();

    let task = {
        let store = store.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            store
                .create(new_site("acme", "ananke", Some(ANANKE_URL)), &cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, StoreError::Runner(_)), "got: {err}");
    assert!(dir_is_empty(&tmp.path().join("sites")));
    assert!(dir_is_empty(&tmp.path().join("themes")));
}

#[tokio::test]
async fn concurrent_creates_share_one_fetch() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git().with_delay(Duration::from_millis(50)));
    let store = Arc::new(open(&tmp, runner.clone()));

    let handles: Vec<_> = ["acme", "globex", "initech"]
        .into_iter()
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create(new_site(id, "ananke", Some(ANANKE_URL)), &CancellationToken::new())
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().expect("create");
    }
    assert_eq!(runner.calls_to("git").len(), 1);
    assert_eq!(store.list().unwrap().len(), 3);
}

#[tokio::test]
async fn find_missing_id_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, Arc::new(FakeRunner::hugo_and_git()));
    assert!(matches!(
        store.find(&SiteId::new("nobody").unwrap()).await,
        Lookup::NotFound
    ));
}

#[tokio::test]
async fn undecodable_config_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    tmp.child("sites/acme/config.toml")
        .write_str("this is = = not toml")
        .unwrap();
    let store = open(&tmp, Arc::new(FakeRunner::hugo_and_git()));
    let found = store.find(&SiteId::new("acme").unwrap()).await;
    assert!(matches!(found, Lookup::Corrupt(_)), "got {:?}", found.detail());
}

#[tokio::test]
async fn stored_directories_are_recomputed_on_find() {
    let tmp = TempDir::new().unwrap();
    tmp.child("sites/acme/config.toml")
        .write_str(
            "themesDir = \"/elsewhere/themes\"\n\
             contentDir = \"/elsewhere/content\"\n\
             layoutDir = \"/elsewhere/layout\"\n\
             publishDir = \"/elsewhere/public\"\n\
             baseURL = \"https://acme.example.com/\"\n\
             languageCode = \"en-us\"\n\
             title = \"Acme Corp\"\n\
             theme = \"ananke\"\n",
        )
        .unwrap();
    let store = open(&tmp, Arc::new(FakeRunner::hugo_and_git()));
    let site = store
        .find(&SiteId::new("acme").unwrap())
        .await
        .found()
        .expect("acme");
    let layout = &site.config().layout;
    assert_eq!(layout.publish_dir, tmp.path().join("sites/acme/public"));
    assert_eq!(layout.content_dir, tmp.path().join("sites/acme/content"));
    assert_eq!(layout.themes_dir, tmp.path().join("themes"));
    assert_eq!(site.config().metadata.title, "Acme Corp");
}

#[tokio::test]
async fn render_then_bundle() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::hugo_and_git());
    let store = open(&tmp, runner.clone());
    let cancel = CancellationToken::new();
    let id = SiteId::new("acme").unwrap();
    store
        .create(new_site("acme", "ananke", Some(ANANKE_URL)), &cancel)
        .await
        .expect("create");

    let report = store.render(&id, &cancel).await.expect("render");
    assert!(report.build.is_some());
    assert_eq!(report.pages.len(), 2);

    let site = store.find(&id).await.found().expect("acme");
    let first = site.generate_bundle().expect("bundle");
    let second = site.generate_bundle().expect("bundle again");
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.file_count, 2);

    let out = tmp.child("acme.tar.zst");
    first.write_to(out.path()).expect("write bundle");
    out.assert(predicate::path::is_file());
}
