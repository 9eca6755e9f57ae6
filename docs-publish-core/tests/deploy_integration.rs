use std::fs::{create_dir_all, read_to_string, write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docs_publish_core::config::{
    CloudConfig, DeployConfig, GeneratorConfig, PagesConfig, Platform, RepoSlug,
};
use docs_publish_core::contract::{
    CommandError, CommandSpec, MockCommandRunner, MockObjectStore, MockStoreConnector,
    ObjectStore, StoredObject, UploadError,
};
use docs_publish_core::deploy::{deploy, deploy_to_cloud, stage_output, DeployError};
use docs_publish_core::publish::{CachePolicy, PublishError};
use tempfile::tempdir;

const CREDENTIALS: &str = r#"{"type":"service_account","client_email":"ci@example.iam.gserviceaccount.com"}"#;

fn cloud_config(ignore: &[&str]) -> CloudConfig {
    CloudConfig {
        bucket: "docs.example.com".into(),
        credentials: CREDENTIALS.into(),
        destination_folder: "widgets".into(),
        cache_policy: CachePolicy::LongLived,
        upload_timeout: Duration::from_secs(30),
        ignore: ignore.iter().map(|s| s.to_string()).collect(),
    }
}

fn accepting_store(expected_uploads: usize) -> MockObjectStore {
    let mut store = MockObjectStore::new();
    store.expect_upload().times(expected_uploads).returning(|req| {
        Ok(StoredObject {
            bucket: req.bucket,
            name: req.destination_key,
            generation: None,
            size: None,
        })
    });
    store
}

#[test]
fn stage_output_replaces_previous_staging_contents() {
    let source = tempdir().unwrap();
    let staging_root = tempdir().unwrap();
    let staging = staging_root.path().join(".docs");

    create_dir_all(source.path().join("Classes")).unwrap();
    write(source.path().join("index.html"), "index").unwrap();
    write(source.path().join("Classes/Widget.html"), "widget").unwrap();
    create_dir_all(&staging).unwrap();
    write(staging.join("stale.html"), "old").unwrap();

    let copied = stage_output(source.path(), &staging).unwrap();

    assert_eq!(copied, 2);
    assert_eq!(read_to_string(staging.join("index.html")).unwrap(), "index");
    assert_eq!(read_to_string(staging.join("Classes/Widget.html")).unwrap(), "widget");
    assert!(!staging.join("stale.html").exists());
}

#[test]
fn stage_output_refuses_overlapping_directories() {
    let source = tempdir().unwrap();
    write(source.path().join("index.html"), "index").unwrap();
    let nested = source.path().join("staging");
    create_dir_all(&nested).unwrap();

    assert!(matches!(
        stage_output(source.path(), &nested),
        Err(DeployError::Stage { .. })
    ));
    assert!(source.path().join("index.html").exists());
}

#[test]
fn stage_output_refuses_staging_not_yet_created_inside_source() {
    let source = tempdir().unwrap();
    write(source.path().join("index.html"), "index").unwrap();
    let nested = source.path().join("nested-stage").join("docs");

    assert!(matches!(
        stage_output(source.path(), &nested),
        Err(DeployError::Stage { .. })
    ));
    assert!(!source.path().join("nested-stage").exists());
    assert!(source.path().join("index.html").exists());
}

#[test]
fn stage_output_refuses_staging_that_contains_source() {
    let staging_parent = tempdir().unwrap();
    let source = staging_parent.path().join("site").join("docs");
    create_dir_all(&source).unwrap();
    write(source.join("index.html"), "index").unwrap();

    assert!(matches!(
        stage_output(&source, &staging_parent.path().join("site")),
        Err(DeployError::Stage { .. })
    ));
    assert!(source.join("index.html").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn stage_output_rejects_non_utf8_names_without_copying() {
    use docs_publish_core::enumerate::EnumerateError;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let source = tempdir().unwrap();
    let staging_root = tempdir().unwrap();
    let staging = staging_root.path().join(".docs");
    write(source.path().join(OsStr::from_bytes(b"caf\xe9.html")), "menu").unwrap();

    assert!(matches!(
        stage_output(source.path(), &staging),
        Err(DeployError::Enumerate(EnumerateError::NonUtf8Path(_)))
    ));
    assert!(!staging.exists());
}

#[test]
fn stage_output_fails_for_missing_source() {
    let staging = tempdir().unwrap();
    let missing = staging.path().join("no-docs");
    assert!(matches!(
        stage_output(&missing, &staging.path().join("out")),
        Err(DeployError::Enumerate(_))
    ));
}

#[tokio::test]
async fn cloud_deploy_uploads_everything_and_cleans_up_credentials() {
    let dir = tempdir().unwrap();
    write(dir.path().join("index.html"), "index").unwrap();
    write(dir.path().join("search.json"), "[]").unwrap();
    write(dir.path().join(".DS_Store"), "junk").unwrap();

    let seen_credentials: Arc<Mutex<Option<(PathBuf, String)>>> = Arc::default();
    let sink = seen_credentials.clone();
    let store = accepting_store(2);
    let mut connector = MockStoreConnector::new();
    connector.expect_connect().times(1).return_once(move |path| {
        let content = read_to_string(path).expect("credentials readable while connecting");
        *sink.lock().unwrap() = Some((path.to_path_buf(), content));
        Ok(Box::new(store) as Box<dyn ObjectStore>)
    });

    let result = deploy_to_cloud(&cloud_config(&[".DS_Store"]), dir.path(), &connector)
        .await
        .expect("cloud deploy should succeed");

    let keys: Vec<_> = result.records.iter().map(|r| r.destination_key.as_str()).collect();
    assert_eq!(keys, vec!["widgets/index.html", "widgets/search.json"]);

    let (path, content) = seen_credentials.lock().unwrap().clone().unwrap();
    assert_eq!(content, CREDENTIALS);
    assert!(!path.starts_with(dir.path()), "credentials must not land in the upload tree");
    assert!(!path.exists(), "credentials file should be removed after publishing");
}

#[tokio::test]
async fn cloud_deploy_reports_partial_failure_after_full_batch() {
    let dir = tempdir().unwrap();
    for name in ["a.html", "b.html", "c.html"] {
        write(dir.path().join(name), name).unwrap();
    }

    let mut store = MockObjectStore::new();
    store.expect_upload().times(3).returning(|req| {
        if req.destination_key.ends_with("b.html") {
            Err(UploadError::Status {
                status: 403,
                body: "forbidden".into(),
            })
        } else {
            Ok(StoredObject {
                bucket: req.bucket,
                name: req.destination_key,
                generation: None,
                size: None,
            })
        }
    });
    let mut connector = MockStoreConnector::new();
    connector
        .expect_connect()
        .return_once(move |_| Ok(Box::new(store) as Box<dyn ObjectStore>));

    let err = deploy_to_cloud(&cloud_config(&[]), dir.path(), &connector)
        .await
        .unwrap_err();
    match err {
        DeployError::Publish(PublishError::PartialFailure {
            failed, attempted, ..
        }) => {
            assert_eq!(failed, 1);
            assert_eq!(attempted, 3);
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
}

#[tokio::test]
async fn connector_failure_is_fatal() {
    let dir = tempdir().unwrap();
    write(dir.path().join("index.html"), "index").unwrap();
    let mut connector = MockStoreConnector::new();
    connector
        .expect_connect()
        .return_once(|_| Err(UploadError::Auth("invalid key".into())));

    let err = deploy_to_cloud(&cloud_config(&[]), dir.path(), &connector)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Connect(UploadError::Auth(_))));
}

fn deploy_config(workspace: PathBuf, staging_dir: PathBuf, platform: Platform) -> DeployConfig {
    DeployConfig {
        generator: GeneratorConfig {
            version: Some("0.14.4".into()),
            args: Some("--output build/docs".into()),
            ..GeneratorConfig::default()
        },
        platform,
        pages: Some(PagesConfig {
            token: "ghp_token".into(),
            repository: RepoSlug {
                owner: "octo".into(),
                name: "widgets".into(),
            },
            actor: "monalisa".into(),
            branch: "gh-pages".into(),
            commit_message: "Deploying Updated Jazzy Docs".into(),
        }),
        cloud: Some(cloud_config(&[])),
        workspace,
        staging_dir,
    }
}

#[tokio::test]
async fn pages_deploy_generates_stages_and_pushes() {
    let workspace = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let staging = scratch.path().join(".docs");
    let config = deploy_config(workspace.path().to_path_buf(), staging.clone(), Platform::GithubPages);

    let calls: Arc<Mutex<Vec<CommandSpec>>> = Arc::default();
    let sink = calls.clone();
    let output = workspace.path().join("build/docs");
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |spec| {
        if spec.program == "jazzy" {
            create_dir_all(&output).unwrap();
            write(output.join("index.html"), "generated").unwrap();
        }
        sink.lock().unwrap().push(spec.clone());
        Ok(())
    });
    let mut connector = MockStoreConnector::new();
    connector.expect_connect().never();

    let report = deploy(&config, &runner, &connector).await.expect("deploy should succeed");

    assert_eq!(report.platform, Platform::GithubPages);
    assert_eq!(report.staged_files, 1);
    assert_eq!(report.output_dir, workspace.path().join("build/docs"));
    assert!(report.published.is_none());
    assert_eq!(read_to_string(staging.join("index.html")).unwrap(), "generated");

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].display(), "sudo gem install jazzy -v 0.14.4");
    assert_eq!(calls[1].display(), "jazzy --output build/docs");
    assert_eq!(calls[0].cwd.as_deref(), Some(workspace.path()));
    assert_eq!(calls[1].cwd.as_deref(), Some(workspace.path()));
    let git_calls = &calls[2..];
    assert_eq!(git_calls.len(), 7);
    assert!(git_calls
        .iter()
        .all(|c| c.program == "git" && c.cwd.as_deref() == Some(staging.as_path())));
}

#[tokio::test]
async fn cloud_platform_publishes_staged_output() {
    let workspace = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let mut config = deploy_config(
        workspace.path().to_path_buf(),
        scratch.path().join(".docs"),
        Platform::GoogleCloud,
    );
    config.generator.skip_install = true;

    let output = workspace.path().join("build/docs");
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .times(1)
        .withf(|spec| spec.program == "jazzy")
        .returning(move |_| {
            create_dir_all(output.join("css")).unwrap();
            write(output.join("index.html"), "index").unwrap();
            write(output.join("css/jazzy.css"), "css").unwrap();
            Ok(())
        });
    let store = accepting_store(2);
    let mut connector = MockStoreConnector::new();
    connector
        .expect_connect()
        .return_once(move |_| Ok(Box::new(store) as Box<dyn ObjectStore>));

    let report = deploy(&config, &runner, &connector).await.unwrap();
    let published = report.published.expect("cloud deploy reports uploads");
    assert_eq!(published.success_count(), 2);
    assert_eq!(published.records[0].destination_key, "widgets/css/jazzy.css");
}

#[tokio::test]
async fn generator_failure_stops_before_publishing() {
    let workspace = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let config = deploy_config(
        workspace.path().to_path_buf(),
        scratch.path().join(".docs"),
        Platform::GithubPages,
    );

    let mut runner = MockCommandRunner::new();
    runner.expect_run().times(2).returning(|spec| {
        if spec.program == "jazzy" {
            Err(CommandError::Failed {
                command: spec.display(),
                status: "exit status: 1".into(),
            })
        } else {
            Ok(())
        }
    });
    let connector = MockStoreConnector::new();

    let err = deploy(&config, &runner, &connector).await.unwrap_err();
    assert!(matches!(err, DeployError::Generate(_)));
    assert!(!scratch.path().join(".docs").exists());
}

#[tokio::test]
async fn missing_platform_settings_are_reported() {
    let workspace = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let mut config = deploy_config(
        workspace.path().to_path_buf(),
        scratch.path().join(".docs"),
        Platform::GoogleCloud,
    );
    config.generator.skip_install = true;
    config.cloud = None;

    let output = workspace.path().join("build/docs");
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |_| {
        create_dir_all(&output).unwrap();
        write(output.join("index.html"), "index").unwrap();
        Ok(())
    });
    let connector = MockStoreConnector::new();

    let err = deploy(&config, &runner, &connector).await.unwrap_err();
    assert!(matches!(
        err,
        DeployError::MissingPlatformConfig(Platform::GoogleCloud)
    ));
}
