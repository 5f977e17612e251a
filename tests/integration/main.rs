//! Integration tests for cachegate

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Unroutable origin so nothing ever leaves the machine
    const OFFLINE_ORIGIN: &str = "http://127.0.0.1:9";

    fn cachegate() -> Command {
        cargo_bin_cmd!("cachegate")
    }

    /// Config file in `dir` using on-disk storage under `dir/generations`
    fn write_config(dir: &Path, manifest: Option<&str>) -> PathBuf {
        let mut config = format!(
            "[origin]\nurl = \"{}\"\n\n[storage]\nbackend = \"fs\"\npath = \"{}\"\n\n[transport]\ntimeout_secs = 2\n",
            OFFLINE_ORIGIN,
            dir.join("generations").display()
        );
        if let Some(assets) = manifest {
            fs::write(dir.join("assets.toml"), assets).unwrap();
            config.push_str("\n[manifest]\npath = \"assets.toml\"\nidentity_prefix = \"shop\"\n");
        }
        let path = dir.join("config.toml");
        fs::write(&path, config).unwrap();
        path
    }

    fn with_config(config: &Path) -> Command {
        let mut cmd = cachegate();
        cmd.env("CACHEGATE_CONFIG", config);
        cmd
    }

    #[test]
    fn help_displays() {
        cachegate()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("versioned read-through cache"));
    }

    #[test]
    fn version_displays() {
        cachegate()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cachegate"));
    }

    #[test]
    fn config_path_honours_flag() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");
        cachegate()
            .arg("--config")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_prints_sections() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), None);
        with_config(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[origin]"))
            .stdout(predicate::str::contains(OFFLINE_ORIGIN));
    }

    #[test]
    fn config_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("nested").join("config.toml");
        with_config(&config)
            .args(["config", "init"])
            .assert()
            .success();
        let written = fs::read_to_string(&config).unwrap();
        assert!(written.contains("[storage]"));
    }

    #[test]
    fn config_init_force_replaces_broken_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "[origin\nnot toml").unwrap();

        with_config(&config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
        with_config(&config)
            .args(["config", "init", "--force"])
            .assert()
            .success();
        with_config(&config).args(["config", "show"]).assert().success();
    }

    #[test]
    fn identity_follows_manifest() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            Some("version = \"7\"\nassets = [\"/\", \"/app.js\"]\n"),
        );

        let first = with_config(&config)
            .arg("identity")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("shop-7-"))
            .get_output()
            .stdout
            .clone();

        fs::write(
            dir.path().join("assets.toml"),
            "version = \"7\"\nassets = [\"/\", \"/app.js\", \"/app.wasm\"]\n",
        )
        .unwrap();
        let second = with_config(&config)
            .arg("identity")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        assert_ne!(first, second);
    }

    #[test]
    fn identity_without_manifest_is_build_identity() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), None);
        with_config(&config)
            .arg("identity")
            .assert()
            .success()
            .stdout(predicate::str::contains(concat!(
                "cachegate-",
                env!("CARGO_PKG_VERSION")
            )));
    }

    #[test]
    fn wildcard_manifest_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), Some("version = \"1\"\nassets = [\"/*\"]\n"));
        with_config(&config)
            .arg("identity")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Wildcard"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn generations_empty() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), None);
        with_config(&config)
            .args(["generations", "-f", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn install_failure_leaves_no_generation() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), Some("version = \"1\"\nassets = [\"/app.js\"]\n"));

        with_config(&config)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Provisioning"))
            .stderr(predicate::str::contains("Hint:"));
        with_config(&config)
            .args(["generations", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn activate_requires_install() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), None);
        with_config(&config)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("has not been provisioned"));
    }

    #[test]
    fn deploy_empty_manifest_then_list() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), None);

        with_config(&config).arg("deploy").assert().success();
        with_config(&config)
            .args(["generations", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(concat!(
                "cachegate-",
                env!("CARGO_PKG_VERSION")
            )));
    }

    #[test]
    fn install_then_activate_retires_stale_generation() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("generations").join("shop-0-old");
        fs::create_dir_all(&stale).unwrap();
        fs::write(
            stale.join("generation.json"),
            "{\"name\":\"shop-0-old\",\"created_at\":\"2024-01-01T00:00:00Z\"}",
        )
        .unwrap();
        let config = write_config(dir.path(), None);

        with_config(&config).arg("install").assert().success();
        with_config(&config)
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("shop-0-old"));
        with_config(&config)
            .args(["generations", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("shop-0-old").not());
    }

    #[test]
    fn fetch_offline_miss_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), None);
        with_config(&config)
            .args(["fetch", "/missing.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network unavailable"));
    }
}

mod lifecycle_tests {
    use async_trait::async_trait;
    use cachegate::cache::{AssetManifest, CacheIdentity};
    use cachegate::controller::{Controller, ControllerState, Host, Registration};
    use cachegate::fetch::{Headers, Request, Response, ResponseType, Served, Transport};
    use cachegate::storage::{CacheStorage, FsStorage, MemoryStorage};
    use cachegate::{CachegateError, CachegateResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const ORIGIN: &str = "https://game.example.com";

    /// Serves a fixed set of same-origin pages and counts every call
    struct StaticSite {
        pages: HashMap<String, &'static str>,
        calls: AtomicUsize,
    }

    impl StaticSite {
        fn new(pages: &[(&str, &'static str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(path, body)| (format!("{}{}", ORIGIN, path), *body))
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for StaticSite {
        async fn fetch(&self, request: Request) -> CachegateResult<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(request.url()) {
                Some(body) => Ok(Response::new(
                    200,
                    request.url(),
                    ResponseType::Basic,
                    Headers::new(),
                    body.as_bytes().to_vec(),
                )),
                None => Err(CachegateError::network(request.url(), "no route")),
            }
        }

        fn transport_name(&self) -> &'static str {
            "static"
        }
    }

    fn controller(
        name: &'static str,
        assets: &[&str],
        storage: &Arc<dyn CacheStorage>,
        site: &Arc<StaticSite>,
    ) -> Controller {
        Controller::new(
            CacheIdentity::from_static(name),
            AssetManifest::new(name, ORIGIN, assets.iter().copied()).unwrap(),
            storage.clone(),
            site.clone(),
        )
    }

    #[tokio::test]
    async fn two_deploys_leave_one_generation() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let site = StaticSite::new(&[("/", "<html>"), ("/v1.js", "one"), ("/v2.js", "two")]);
        let host = Host::new(site.clone());

        host.register(controller("game-1", &["/", "/v1.js"], &storage, &site))
            .await
            .unwrap();
        let second = host
            .register(controller("game-2", &["/", "/v2.js"], &storage, &site))
            .await
            .unwrap();

        match second {
            Registration::Active { retired, .. } => {
                assert_eq!(retired.deleted, vec!["game-1"]);
                assert!(retired.failures.is_empty());
            }
            other => panic!("expected active registration, got {:?}", other),
        }
        assert_eq!(storage.names().await.unwrap(), vec!["game-2"]);
        assert!(host.clients_claimed());
    }

    #[tokio::test]
    async fn provisioned_assets_serve_offline() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let site = StaticSite::new(&[("/", "<html>"), ("/app.js", "main()")]);
        let host = Host::new(site.clone());
        host.register(controller("game-1", &["/", "/app.js"], &storage, &site))
            .await
            .unwrap();
        let provisioning_calls = site.calls();

        for _ in 0..2 {
            let mut response = host
                .fetch(Request::get(format!("{}/app.js", ORIGIN)))
                .await
                .unwrap();
            assert_eq!(response.served(), Served::Cache);
            assert_eq!(response.text().unwrap(), "main()");
        }
        assert_eq!(site.calls(), provisioning_calls);
    }

    #[tokio::test]
    async fn failed_redeploy_keeps_serving_previous_generation() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let site = StaticSite::new(&[("/", "<html>")]);
        let host = Host::new(site.clone());
        host.register(controller("game-1", &["/"], &storage, &site))
            .await
            .unwrap();
        let first = host.active().unwrap();

        let err = host
            .register(controller("game-2", &["/", "/missing.js"], &storage, &site))
            .await
            .unwrap_err();
        assert!(matches!(err, CachegateError::Provision { .. }));
        assert_eq!(first.state(), ControllerState::Activated);
        assert_eq!(storage.names().await.unwrap(), vec!["game-1"]);
    }

    #[tokio::test]
    async fn write_behind_persists_across_storage_instances() {
        let dir = TempDir::new().unwrap();
        let site = StaticSite::new(&[("/", "<html>"), ("/level-2.json", "{\"boss\":true}")]);

        {
            let storage: Arc<dyn CacheStorage> = Arc::new(FsStorage::new(dir.path().to_path_buf()));
            let host = Host::new(site.clone());
            host.register(controller("game-1", &["/"], &storage, &site))
                .await
                .unwrap();
            host.fetch(Request::get(format!("{}/level-2.json", ORIGIN)))
                .await
                .unwrap();
            host.settle().await;
        }

        let storage: Arc<dyn CacheStorage> = Arc::new(FsStorage::new(dir.path().to_path_buf()));
        let c = controller("game-1", &["/"], &storage, &site);
        c.adopt().await.unwrap();
        let calls = site.calls();

        let mut response = c
            .on_fetch(Request::get(format!("{}/level-2.json", ORIGIN)))
            .await
            .unwrap();
        assert_eq!(response.served(), Served::Cache);
        assert_eq!(response.text().unwrap(), "{\"boss\":true}");
        assert_eq!(site.calls(), calls);
    }
}
