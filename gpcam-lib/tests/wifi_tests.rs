//! Tests for the bounded connection-wait helper.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use gpcam_lib::GpError;
use gpcam_lib::wifi::wait_for_connection;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn resolves_once_the_probe_reports_established() {
    let polls = Arc::new(AtomicU32::new(0));
    let counter = polls.clone();
    let result = wait_for_connection(Duration::from_millis(5000), || {
        let counter = counter.clone();
        async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 3) }
    })
    .await;
    assert!(result.is_ok());
    assert_eq!(polls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn a_probe_stuck_on_false_times_out_instead_of_hanging() {
    let start = Instant::now();
    let result = wait_for_connection(Duration::from_millis(5000), || async { Ok(false) }).await;
    assert!(matches!(result, Err(GpError::Timeout)));
    assert_eq!(start.elapsed(), Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn probe_errors_propagate_immediately() {
    let result = wait_for_connection(Duration::from_millis(5000), || async {
        Err(GpError::Transport("no wifi device".to_string()))
    })
    .await;
    assert!(matches!(result, Err(GpError::Transport(_))));
}
