use anyhow::Result;
use clap::Parser;
use docs_publish::cli::{run, workflow_error, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
                println!("{}", workflow_error(e));
            }
        }
    }
    result
}
