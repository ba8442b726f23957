//! Tests for background work handles.

use std::time::Duration;
use ticketdeck::tui::task::{TaskHandle, TaskState};
use tokio::sync::oneshot;

async fn settle<T: Send + 'static>(handle: &mut TaskHandle<T>) {
    for _ in 0..100 {
        if !handle.is_running() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_start_is_refused_while_running() {
    let mut handle: TaskHandle<u32> = TaskHandle::new();
    let (release, gate) = oneshot::channel::<()>();

    assert!(handle.start(async move {
        gate.await?;
        Ok::<_, anyhow::Error>(7)
    }));
    assert!(handle.is_running());
    assert!(!handle.start(async { Ok(8) }));

    release.send(()).unwrap();
    settle(&mut handle).await;

    assert_eq!(handle.take_finished(), Some(Ok(7)));
    assert_eq!(handle.poll(), &TaskState::NotStarted);
    assert!(handle.start(async { Ok(9) }));
}

#[tokio::test]
async fn test_failure_is_reported_as_text() {
    let mut handle: TaskHandle<u32> = TaskHandle::new();
    handle.start(async { Err(anyhow::anyhow!("sprint not found")) });
    settle(&mut handle).await;

    assert_eq!(handle.take_finished(), Some(Err("sprint not found".to_string())));
    assert_eq!(handle.take_finished(), None);
}

#[test]
fn test_new_handle_has_nothing_to_report() {
    let mut handle: TaskHandle<()> = TaskHandle::default();
    assert_eq!(handle.poll(), &TaskState::NotStarted);
    assert!(!handle.is_running());
    assert_eq!(handle.take_finished(), None);
}
