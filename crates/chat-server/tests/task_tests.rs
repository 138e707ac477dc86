use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chat_server::AbortOnDrop;
use tokio::time::sleep;

#[tokio::test]
async fn awaiting_yields_the_inner_result() {
    let task = AbortOnDrop::new(tokio::spawn(async { 7 }));
    assert_eq!(task.await.unwrap(), 7);
}

#[tokio::test]
async fn inner_task_dies_with_its_owner() {
    let finished = Arc::new(AtomicBool::new(false));

    let inner = {
        let finished = finished.clone();
        async move {
            sleep(Duration::from_millis(200)).await;
            finished.store(true, Ordering::SeqCst);
        }
    };
    let outer = tokio::spawn(async move {
        let _ = AbortOnDrop::new(tokio::spawn(inner)).await;
    });

    sleep(Duration::from_millis(20)).await;
    outer.abort();
    assert!(outer.await.unwrap_err().is_cancelled());

    sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn panic_in_inner_task_is_reported_to_owner() {
    let task = AbortOnDrop::new(tokio::spawn(async {
        panic!("session blew up");
    }));
    assert!(task.await.unwrap_err().is_panic());
}
