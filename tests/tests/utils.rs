use loadlab::prelude::*;
use mock_service::MockService;
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter("loadlab=debug,loadlab_runtime=debug,mock_service=debug")
            .try_init();
    });
}

#[allow(unused)]
pub async fn mock() -> MockService {
    init();
    mock_service::spawn().await.unwrap()
}

#[allow(unused)]
pub fn fixed_probe() -> Arc<dyn ResourceProbe> {
    Arc::new(ResourceSnapshot {
        cpu_percent: 25.,
        memory_percent: 50.,
        memory_available_bytes: 4 << 30,
        disk_percent: 60.,
    })
}

#[allow(unused)]
pub fn nonzero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

/// A localhost URL nothing listens on.
#[allow(unused)]
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    format!("http://127.0.0.1:{port}/")
}
