use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug,tower_http=debug")
        .init();

    PrometheusBuilder::new()
        .with_http_listener("0.0.0.0:9002".parse::<SocketAddr>()?)
        .install()?;

    let addr: SocketAddr = "0.0.0.0:8002".parse()?;
    tracing::info!("Mock service listening on {addr}");
    mock_service::run(addr).await
}
