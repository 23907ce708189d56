//! Integration tests for modlayer

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn modlayer() -> Command {
        cargo_bin_cmd!("modlayer")
    }

    #[test]
    fn help_displays() {
        modlayer()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Dependency installation"));
    }

    #[test]
    fn version_displays() {
        modlayer()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("modlayer"));
    }

    #[test]
    fn config_show() {
        let temp = tempfile::TempDir::new().unwrap();
        modlayer()
            .args(["--config"])
            .arg(temp.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[package_manager]"));
    }

    #[test]
    fn config_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        modlayer()
            .arg("--config")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn sum_prints_fingerprint() {
        let temp = tempfile::TempDir::new().unwrap();
        let lockfile = temp.path().join("package-lock.json");
        std::fs::write(&lockfile, "").unwrap();

        modlayer()
            .arg("sum")
            .arg(&lockfile)
            .assert()
            .success()
            .stdout("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n");
    }

    #[test]
    fn sum_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        modlayer()
            .arg("sum")
            .arg(temp.path().join("package-lock.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read manifest"));
    }
}

#[cfg(unix)]
mod build_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const INSTALLING_NPM: &str = r#"
echo "$*" >> "$(dirname "$0")/calls.log"
echo "added 1 package"
mkdir -p node_modules/left-pad
echo "module.exports = 1" > node_modules/left-pad/index.js
echo "$NPM_CONFIG_PRODUCTION $NPM_CONFIG_LOGLEVEL" > node_modules/.seen-env
"#;

    const FAILING_NPM: &str = r#"
echo "$*" >> "$(dirname "$0")/calls.log"
echo "npm ERR! code E404" >&2
exit 1
"#;

    const SWITCHABLE_NPM: &str = r#"
tools="$(dirname "$0")"
echo "$*" >> "$tools/calls.log"
if [ -f "$tools/fail" ]; then
  rm -rf node_modules/left-pad
  echo "npm ERR! ERESOLVE" >&2
  exit 1
fi
mkdir -p node_modules/left-pad
echo "module.exports = 1" > node_modules/left-pad/index.js
"#;

    /// Project, layers and a shell script standing in for npm
    struct Project {
        root: TempDir,
    }

    impl Project {
        fn new(script: &str) -> Self {
            let root = TempDir::new().unwrap();
            fs::create_dir(root.path().join("app")).unwrap();
            fs::create_dir(root.path().join("tools")).unwrap();

            let script_path = root.path().join("tools").join("fake-npm.sh");
            fs::write(&script_path, script).unwrap();
            let config = format!(
                "[package_manager]\ncommand = [\"sh\", \"{}\"]\n",
                script_path.display()
            );
            fs::write(root.path().join("config.toml"), config).unwrap();

            Self { root }
        }

        fn app(&self) -> PathBuf {
            self.root.path().join("app")
        }

        fn layers(&self) -> PathBuf {
            self.root.path().join("layers")
        }

        fn calls(&self) -> Vec<String> {
            fs::read_to_string(self.root.path().join("tools").join("calls.log"))
                .map(|s| s.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }

        fn build(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("modlayer");
            cmd.arg("--config")
                .arg(self.root.path().join("config.toml"))
                .arg("build")
                .arg("--working-dir")
                .arg(self.app())
                .arg("--layers-dir")
                .arg(self.layers());
            cmd
        }
    }

    impl Project {
        fn set_failing(&self, failing: bool) {
            let marker = self.root.path().join("tools").join("fail");
            if failing {
                fs::write(marker, "").unwrap();
            } else {
                fs::remove_file(marker).unwrap();
            }
        }
    }

    fn is_symlink(path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[test]
    fn lockfile_build_then_cache_hit() {
        let project = Project::new(INSTALLING_NPM);
        fs::write(project.app().join("package-lock.json"), "{\"lockfileVersion\": 3}").unwrap();

        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("package-lock.json -> \"Found\""))
            .stdout(predicate::str::contains(
                "Selected NPM build process: 'npm ci'",
            ))
            .stdout(predicate::str::contains("Completed in"))
            .stdout(predicate::str::contains("Configuring environment"));

        let link = project.app().join("node_modules");
        assert!(is_symlink(&link));
        assert_eq!(
            fs::read_link(&link).unwrap(),
            project.layers().join("modules").join("node_modules")
        );
        assert!(link.join("left-pad/index.js").is_file());
        assert_eq!(
            fs::read_to_string(link.join(".seen-env")).unwrap().trim(),
            "true error"
        );

        let record = fs::read_to_string(project.layers().join("modules.toml")).unwrap();
        assert!(record.contains("cache_sha"));
        assert!(record.contains("built_at"));

        let calls = project.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("ci --unsafe-perm --cache "));
        assert!(calls[0].ends_with("npm-cache"));

        // Second build with an identical lockfile reuses the layer
        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Reusing cached layer"));
        assert_eq!(project.calls().len(), 1);
        assert!(link.join("left-pad/index.js").is_file());
    }

    #[test]
    fn changed_lockfile_reinstalls() {
        let project = Project::new(INSTALLING_NPM);
        fs::write(project.app().join("package-lock.json"), "{}").unwrap();
        project.build().assert().success();

        fs::write(project.app().join("package-lock.json"), "{\"v\": 2}").unwrap();
        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Running 'npm ci"));

        assert_eq!(project.calls().len(), 2);
    }

    #[test]
    fn no_lockfile_runs_install() {
        let project = Project::new(INSTALLING_NPM);

        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("package-lock.json -> \"Not found\""))
            .stdout(predicate::str::contains(
                "Selected NPM build process: 'npm install'",
            ));

        assert!(project.calls()[0].starts_with("install "));
    }

    #[test]
    fn vendored_modules_are_reused() {
        let project = Project::new(INSTALLING_NPM);
        fs::create_dir_all(project.app().join("node_modules/lodash")).unwrap();

        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("node_modules      -> \"Found\""));

        assert!(project.calls().is_empty());
        assert!(is_symlink(&project.app().join("node_modules")));
        assert!(project
            .layers()
            .join("modules/node_modules/lodash")
            .is_dir());
    }

    #[test]
    fn failing_install_reports_output() {
        let project = Project::new(FAILING_NPM);
        fs::write(project.app().join("package-lock.json"), "{}").unwrap();

        project
            .build()
            .assert()
            .failure()
            .stdout(predicate::str::contains("npm ERR! code E404"))
            .stderr(predicate::str::contains("npm ci failed"))
            .stderr(predicate::str::contains("npm ERR! code E404"));

        assert!(is_symlink(&project.app().join("node_modules")));
        assert!(!project.layers().join("modules.toml").exists());
    }

    #[test]
    fn relative_layers_dir_links_absolute_target() {
        let project = Project::new(INSTALLING_NPM);
        fs::write(project.app().join("package-lock.json"), "{}").unwrap();

        cargo_bin_cmd!("modlayer")
            .current_dir(project.root.path())
            .arg("--config")
            .arg("config.toml")
            .arg("build")
            .args(["--working-dir", "app", "--layers-dir", "layers"])
            .assert()
            .success();

        let link = project.app().join("node_modules");
        let target = fs::read_link(&link).unwrap();
        assert!(target.is_absolute());
        assert_eq!(
            target.canonicalize().unwrap(),
            project
                .layers()
                .join("modules/node_modules")
                .canonicalize()
                .unwrap()
        );
        assert!(link.join("left-pad/index.js").is_file());
    }

    #[test]
    fn failed_install_is_not_reused_later() {
        let project = Project::new(SWITCHABLE_NPM);
        let lockfile = project.app().join("package-lock.json");
        fs::write(&lockfile, "{\"v\": 1}").unwrap();
        project.build().assert().success();

        fs::write(&lockfile, "{\"v\": 2}").unwrap();
        project.set_failing(true);
        project
            .build()
            .assert()
            .failure()
            .stderr(predicate::str::contains("npm ERR! ERESOLVE"));
        let record = fs::read_to_string(project.layers().join("modules.toml")).unwrap();
        assert!(!record.contains("cache_sha"));

        fs::write(&lockfile, "{\"v\": 1}").unwrap();
        project.set_failing(false);
        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Running 'npm ci"));

        assert_eq!(project.calls().len(), 3);
        assert!(project.app().join("node_modules/left-pad/index.js").is_file());
    }

    #[test]
    fn vendored_layer_survives_second_build() {
        let project = Project::new(INSTALLING_NPM);
        fs::create_dir_all(project.app().join("node_modules/lodash")).unwrap();

        project.build().assert().success();
        project
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("node_modules      -> \"Found\""))
            .stdout(predicate::str::contains("Reusing cached layer"));

        assert!(project.calls().is_empty());
        let record = fs::read_to_string(project.layers().join("modules.toml")).unwrap();
        assert!(record.contains("reuse-in-place"));
    }

    #[test]
    fn resolve_only_reports() {
        let project = Project::new(INSTALLING_NPM);
        fs::write(project.app().join("package-lock.json"), "{}").unwrap();

        cargo_bin_cmd!("modlayer")
            .arg("--config")
            .arg(project.root.path().join("config.toml"))
            .arg("resolve")
            .arg("--working-dir")
            .arg(project.app())
            .assert()
            .success()
            .stdout(predicate::str::contains("Process inputs:"))
            .stdout(predicate::str::contains("'npm ci'"));

        assert!(project.calls().is_empty());
        assert!(!project.app().join("node_modules").exists());
    }
}

mod resolve_json_tests {
    use assert_cmd::cargo::cargo_bin_cmd;
    use predicates::prelude::*;

    #[test]
    fn resolve_json_reports_unpinned_install() {
        let temp = tempfile::TempDir::new().unwrap();

        cargo_bin_cmd!("modlayer")
            .arg("--config")
            .arg(temp.path().join("missing.toml"))
            .arg("resolve")
            .arg("--working-dir")
            .arg(temp.path())
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"strategy\": \"install\""))
            .stdout(predicate::str::contains("\"reproducible\": false"))
            .stdout(predicate::str::contains("Process inputs").not());
    }
}
