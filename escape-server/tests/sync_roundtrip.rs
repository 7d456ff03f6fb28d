//! The client's HTTP progress store against a live server on an ephemeral port.

use std::time::Duration;

use escape::check::{VerdictSource, fetch_saved_manifest, run_check};
use escape::core::rubric::PASSING_MANIFEST;
use escape::core::types::{Level, TASK_LOGS, TASK_PULL, TaskSignal};
use escape::io::progress::{HttpProgressStore, ProgressStore};
use escape_server::state::AppState;

async fn serve(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, escape_server::app(state))
            .await
            .expect("serve");
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> HttpProgressStore {
    HttpProgressStore::new(base_url, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn updates_round_trip_through_the_server() {
    let state = AppState::in_memory();
    let store = client(&serve(state.clone()).await);

    store.register("player-1").await.expect("register");
    assert!(state.db.read().await.is_registered("player-1"));

    store
        .update("player-1", Level::Docker, &TaskSignal::done(TASK_PULL))
        .await
        .expect("update");
    let progress = store.fetch("player-1", Level::Docker).await.expect("fetch");
    assert!(progress.tasks.is_done(TASK_PULL));
    assert!(!progress.tasks.is_done(TASK_LOGS));
    assert!(!progress.done);
}

#[tokio::test]
async fn short_player_id_is_an_error() {
    let store = client(&serve(AppState::in_memory()).await);
    assert!(store.register("ab").await.is_err());
}

#[tokio::test]
async fn remote_check_completes_level_two() {
    let state = AppState::in_memory();
    let store = client(&serve(state.clone()).await);

    let report = run_check(Some(&store), "player-1", PASSING_MANIFEST).await;
    assert_eq!(report.source, VerdictSource::Remote);
    assert!(report.verdict.ok);
    assert!(report.celebrate);

    let progress = store.fetch("player-1", Level::Manifest).await.expect("fetch");
    assert!(progress.done);
    assert_eq!(progress.manifest.as_deref(), Some(PASSING_MANIFEST));

    let saved = fetch_saved_manifest(&store, "player-1").await.expect("saved");
    assert_eq!(saved.as_deref(), Some(PASSING_MANIFEST));
}

#[tokio::test]
async fn unreachable_server_falls_back_to_local_rules() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let store = client(&format!("http://{addr}"));
    let report = run_check(Some(&store), "player-1", PASSING_MANIFEST).await;
    assert_eq!(report.source, VerdictSource::Local);
    assert!(report.verdict.ok);
}
