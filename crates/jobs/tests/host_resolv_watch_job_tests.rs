use nsresolv_domain::EngineConfig;
use nsresolv_jobs::HostResolvWatchJob;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::watcher_with_namespace;

#[tokio::test]
async fn test_host_resolv_watch_job_starts_without_panic() {
    let (watcher, _, _) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    let job = Arc::new(HostResolvWatchJob::new(watcher));

    job.start();

    sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_host_resolv_watch_job_checks_on_first_tick() {
    let (watcher, source, _) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    let captures_before = source.capture_count();
    let job = Arc::new(HostResolvWatchJob::new(watcher).with_interval(3600));

    job.start();
    sleep(Duration::from_millis(100)).await;

    assert!(source.capture_count() > captures_before);
}

#[tokio::test]
async fn test_host_resolv_watch_job_applies_host_change() {
    let (watcher, source, store) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    assert!(store.content().contains("# ExtServers: [192.0.2.1]"));

    let job = Arc::new(HostResolvWatchJob::new(Arc::clone(&watcher)).with_interval(1));
    job.start();

    source.set_content("nameserver 192.0.2.2\n");
    sleep(Duration::from_millis(1200)).await;

    assert!(
        store.content().contains("# ExtServers: [192.0.2.2]"),
        "Container file should follow the host change"
    );
    assert_eq!(
        watcher.current_snapshot().await.nameservers(),
        &["192.0.2.2".parse::<std::net::IpAddr>().unwrap()]
    );
}

#[tokio::test]
async fn test_host_resolv_watch_job_stops_on_cancellation() {
    let (watcher, source, _) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    let token = CancellationToken::new();
    let job = Arc::new(
        HostResolvWatchJob::new(watcher)
            .with_interval(1)
            .with_cancellation(token.clone()),
    );

    job.start();
    sleep(Duration::from_millis(50)).await;
    token.cancel();
    sleep(Duration::from_millis(50)).await;

    let captures = source.capture_count();
    sleep(Duration::from_millis(1200)).await;
    assert_eq!(source.capture_count(), captures);
}

#[tokio::test]
async fn test_host_resolv_watch_job_zero_interval_is_clamped() {
    let (watcher, _, _) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    let job = HostResolvWatchJob::new(watcher).with_interval(0);

    assert_eq!(job.interval_secs(), 1);
}

#[tokio::test]
async fn test_host_resolv_watch_job_uses_configured_interval() {
    let (watcher, _, _) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    let config = EngineConfig::from_toml("[host]\npoll_interval_secs = 30\n").unwrap();

    let job = HostResolvWatchJob::from_config(watcher, &config.host);

    assert_eq!(job.interval_secs(), 30);
}

#[tokio::test]
async fn test_host_resolv_watch_job_handle_finishes_on_cancellation() {
    let (watcher, _, _) = watcher_with_namespace("nameserver 192.0.2.1\n").await;
    let token = CancellationToken::new();
    let job = Arc::new(
        HostResolvWatchJob::new(watcher)
            .with_interval(3600)
            .with_cancellation(token.clone()),
    );

    let handle = job.start();
    token.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("job did not stop")
        .unwrap();
}
