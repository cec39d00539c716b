mod common;

use common::{settings, track, MockBackend, MockSink};
use mobify_player::error::AppError;
use mobify_player::events::{self, PlaybackState, PlayerEvent};
use mobify_player::media_session::{MediaSessionBridge, NoopSurface};
use mobify_player::session::{SessionController, SessionRuntime};
use mobify_player::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

async fn wait_for(
    events: &mut broadcast::Receiver<PlayerEvent>,
    pred: impl Fn(&PlayerEvent) -> bool,
) -> PlayerEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn spawn_session(
    backend: MockBackend,
    sink: MockSink,
) -> (
    mobify_player::commands::SessionHandle,
    tokio::task::JoinHandle<()>,
) {
    let (events, _) = events::channel();
    let (controller, completions) = SessionController::new(
        settings(None),
        Arc::new(backend),
        Box::new(sink),
        SessionStore::in_memory(),
        MediaSessionBridge::new(Box::new(NoopSurface)),
        events.clone(),
    );
    let (runtime, handle) =
        SessionRuntime::new(controller, completions, events, Duration::from_millis(20));
    (handle, runtime.spawn())
}

#[tokio::test]
async fn plays_through_the_handle_and_shuts_down() {
    let a = track("a", 120.0);
    let sink = MockSink::default();
    let (handle, task) = spawn_session(MockBackend::with_tracks(&[a.clone()]), sink.clone());
    let mut events = handle.subscribe();

    handle.play_track(a, Vec::new()).unwrap();
    wait_for(&mut events, |e| {
        matches!(e, PlayerEvent::StateChanged(PlaybackState::Playing))
    })
    .await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state.current_track.unwrap().id, "a");
    assert!(snapshot.state.is_playing);
    assert_eq!(snapshot.volume, 0.8);

    handle.shutdown().unwrap();
    task.await.unwrap();
    assert!(sink.state.lock().unwrap().disposed);
    assert!(handle.is_closed());
    assert!(matches!(handle.play(), Err(AppError::SessionClosed)));
}

#[tokio::test]
async fn poll_timer_advances_to_the_next_track() {
    let list = vec![track("a", 10.0), track("b", 10.0)];
    let sink = MockSink::default();
    let (handle, task) = spawn_session(MockBackend::with_tracks(&list), sink.clone());
    let mut events = handle.subscribe();

    handle.play_track(list[0].clone(), list.clone()).unwrap();
    wait_for(&mut events, |e| {
        matches!(e, PlayerEvent::StateChanged(PlaybackState::Playing))
    })
    .await;

    // The mock sink never reports an end; only the poll can notice it.
    sink.set_position(9.7);
    wait_for(&mut events, |e| matches!(e, PlayerEvent::TrackEnded)).await;
    let changed = wait_for(&mut events, |e| matches!(e, PlayerEvent::TrackChanged(_))).await;
    match changed {
        PlayerEvent::TrackChanged(track) => assert_eq!(track.track_id, "b"),
        other => panic!("unexpected {:?}", other),
    }

    handle.shutdown().unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn dropping_every_handle_ends_the_session() {
    let sink = MockSink::default();
    let (handle, task) = spawn_session(MockBackend::default(), sink.clone());
    drop(handle);
    task.await.unwrap();
    assert!(sink.state.lock().unwrap().disposed);
}
