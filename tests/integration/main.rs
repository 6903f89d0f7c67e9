//! Integration tests for layerforge

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Command isolated from the user's config and the build environment
    fn layerforge(temp: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("layerforge");
        cmd.env("LAYERFORGE_CONFIG", temp.join("config.toml"))
            .env_remove("CNB_LAYERS_DIR")
            .env_remove("CNB_BUILDPACK_DIR")
            .env_remove("LAYERFORGE_BUILDPACK_VERSION")
            .env("CI", "1");
        cmd
    }

    struct Workspace {
        temp: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            for dir in ["layers", "cnb/config", "cnb/scripts", "app"] {
                fs::create_dir_all(temp.path().join(dir)).unwrap();
            }
            fs::write(
                temp.path().join("cnb/scripts/agent.sh"),
                "#!/bin/sh\nexec sleep infinity\n",
            )
            .unwrap();
            fs::write(temp.path().join("cnb/config/Caddyfile"), ":8080 {\n}\n").unwrap();
            Self { temp }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }

        fn cmd(&self) -> Command {
            layerforge(self.temp.path())
        }

        fn build(&self, installer: &str) -> Command {
            let mut cmd = self.cmd();
            cmd.arg("build")
                .arg(installer)
                .arg("--layers")
                .arg(self.path("layers"))
                .arg("--cnb-path")
                .arg(self.path("cnb"))
                .arg("--working-dir")
                .arg(self.path("app"))
                .args(["--buildpack-version", "9.9.9"]);
            cmd
        }

        fn key(&self) -> String {
            let output = self.cmd().arg("key").output().unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap().trim().to_string()
        }
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        layerforge(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build-time installers"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        layerforge(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("layerforge"));
    }

    #[test]
    fn detect_always_passes() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["detect", "pkgx"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgx detected"));
    }

    #[test]
    fn unknown_installer_is_rejected() {
        let ws = Workspace::new();
        ws.build("nginx").assert().failure();
    }

    #[test]
    fn key_is_hex_sha256() {
        let ws = Workspace::new();
        let key = ws.key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_ignores_plugin_order() {
        let ws = Workspace::new();
        fs::write(
            ws.path("config.toml"),
            "[caddy]\nplugins = [\"github.com/a/one\", \"github.com/b/two\"]\n",
        )
        .unwrap();
        let first = ws.key();

        fs::write(
            ws.path("config.toml"),
            "[caddy]\nplugins = [\"github.com/b/two\", \"github.com/a/one\"]\n",
        )
        .unwrap();
        assert_eq!(ws.key(), first);
    }

    #[test]
    fn invalid_config_fails() {
        let ws = Workspace::new();
        fs::write(ws.path("config.toml"), "[caddy\n").unwrap();
        ws.cmd()
            .arg("key")
            .assert()
            .failure()
            .stderr(predicate::str::contains("config"));
    }

    #[test]
    fn runtime_build_writes_layer() {
        let ws = Workspace::new();
        fs::write(ws.path("app/Procfile"), "dev: npm run dev\n").unwrap();

        ws.build("runtime").assert().success();

        let compose = fs::read_to_string(ws.path("layers/runtime/config/process-compose.yaml"))
            .unwrap();
        assert!(compose.contains("npm run dev"));
        assert!(compose.contains("agent.sh"));
        assert!(ws.path("layers/runtime/bin/agent.sh").is_file());
        assert!(ws.path("layers/runtime/env.launch/TERM.default").is_file());

        let launch = fs::read_to_string(ws.path("layers/launch.toml")).unwrap();
        assert!(launch.contains("process-compose"));

        let metadata = fs::read_to_string(ws.path("layers/runtime.toml")).unwrap();
        assert!(metadata.contains("dev_command = \"npm run dev\""));
    }

    #[test]
    fn relative_layers_dir_is_recorded_absolute() {
        let ws = Workspace::new();
        ws.cmd()
            .current_dir(ws.path(""))
            .args(["build", "runtime", "--layers", "layers"])
            .args(["--cnb-path", "cnb", "--working-dir", "app"])
            .args(["--buildpack-version", "9.9.9"])
            .assert()
            .success();

        let compose_path = ws.path("layers/runtime/config/process-compose.yaml");
        let launch = fs::read_to_string(ws.path("layers/launch.toml")).unwrap();
        assert!(launch.contains(&compose_path.display().to_string()));

        let home = fs::read_to_string(
            ws.path("layers/runtime/env.launch/PROCESS_COMPOSE_HOME.default"),
        )
        .unwrap();
        assert!(Path::new(home.trim()).is_absolute());

        let compose = fs::read_to_string(&compose_path).unwrap();
        assert!(compose.contains(&ws.path("layers/runtime/bin/agent.sh").display().to_string()));
    }

    #[test]
    fn inspect_after_build() {
        let ws = Workspace::new();
        ws.build("runtime").assert().success();

        ws.cmd()
            .args(["inspect", "runtime", "--format", "json", "--layers"])
            .arg(ws.path("layers"))
            .assert()
            .success()
            .stdout(predicate::str::contains("\"dev_command\""));

        ws.cmd()
            .args(["inspect", "runtime", "--layers"])
            .arg(ws.path("layers"))
            .assert()
            .success()
            .stdout(predicate::str::contains("launch, build"));
    }

    #[test]
    fn inspect_missing_layer() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["inspect", "caddy", "--layers"])
            .arg(ws.path("layers"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Layer not found"));
    }

    #[test]
    fn caddy_cache_hit_needs_no_network() {
        let ws = Workspace::new();
        let key = ws.key();

        // A previous build's result, matching the current inputs.
        fs::create_dir_all(ws.path("layers/caddy/bin")).unwrap();
        fs::write(ws.path("layers/caddy/bin/caddy"), "binary").unwrap();
        fs::write(
            ws.path("layers/caddy.toml"),
            format!(
                "[types]\nlaunch = true\nbuild = true\ncache = true\n\n[metadata]\n\
                 build_hash = \"{key}\"\nxcaddy_version = \"v0.4.5\"\n\
                 plugins = \"github.com/ggicci/caddy-jwt\"\ncaddy_version = \"v2.8.4\"\n\
                 buildpack_version = \"9.9.9\"\nuri = \"https://example.invalid/xcaddy.tar.gz\"\n"
            ),
        )
        .unwrap();
        // Any download attempt would fail against this base.
        fs::write(
            ws.path("config.toml"),
            "[caddy]\nrelease_base_url = \"http://127.0.0.1:9/unreachable\"\n",
        )
        .unwrap();

        ws.build("caddy").assert().success();

        assert_eq!(
            fs::read_to_string(ws.path("layers/caddy/bin/caddy")).unwrap(),
            "binary"
        );
        assert_eq!(
            fs::read_to_string(ws.path("layers/caddy/config/Caddyfile")).unwrap(),
            ":8080 {\n}\n"
        );
        let sbom = fs::read_to_string(ws.path("layers/caddy/sbom.json")).unwrap();
        assert!(sbom.contains(&key));
        assert!(sbom.contains("v2.8.4"));
    }

    #[test]
    fn caddy_miss_reports_fetch_stage() {
        let ws = Workspace::new();
        fs::write(
            ws.path("config.toml"),
            "[caddy]\nrelease_base_url = \"http://127.0.0.1:9/unreachable\"\n",
        )
        .unwrap();

        ws.build("caddy")
            .assert()
            .failure()
            .stderr(predicate::str::contains("fetch"));
    }
}
