use loadlab_runtime::{LabRuntime, DEFAULT_LOG_FILTER};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();

    let summary = LabRuntime::new().with_args()?.run().await?;
    println!("{summary}");

    if summary.any_failed() {
        std::process::exit(1);
    }
    Ok(())
}
