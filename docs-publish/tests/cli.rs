use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("docs-publish").expect("Binary exists");
    for key in [
        "INPUT_SETTINGS",
        "INPUT_PLATFORM",
        "INPUT_PERSONAL_ACCESS_TOKEN",
        "GITHUB_REPOSITORY",
        "GITHUB_ACTOR",
        "GITHUB_WORKSPACE",
        "GITHUB_ACTIONS",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn help_lists_subcommands() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy").and(predicate::str::contains("publish")));
}

#[test]
fn unknown_platform_fails_before_running_anything() {
    bin()
        .args(["deploy", "--platform", "netlify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown platform"));
}

#[test]
fn failure_is_annotated_inside_github_actions() {
    bin()
        .env("GITHUB_ACTIONS", "true")
        .args(["deploy", "--platform", "netlify"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("::error::unknown platform 'netlify'"));
}

#[test]
fn publish_requires_bucket() {
    let dir = tempfile::tempdir().unwrap();
    bin()
        .env_remove("INPUT_BUCKET_NAME")
        .args(["publish", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("bucket"));
}

#[test]
fn workflow_error_escapes_newlines() {
    let err = anyhow::anyhow!("first line\nsecond 100%").context("deploy failed");
    assert_eq!(
        docs_publish::cli::workflow_error(&err),
        "::error::deploy failed: first line%0Asecond 100%25"
    );
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use docs_publish::cli::{run, Cli, CloudArgs, Commands, PublishArgs};

    // Missing bucket: fails during config loading, after the first event.
    let cli = Cli {
        command: Commands::Publish(PublishArgs {
            dir: PathBuf::from("does-not-exist"),
            settings: None,
            cloud: CloudArgs::default(),
        }),
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
