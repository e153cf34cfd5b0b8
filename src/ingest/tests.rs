use super::*;
use crate::backend::{PlayerState, SearchMode};
use crate::backend::memory::MemoryBackend;
use crate::config::IngestSettings;
use crate::config::PlayerSettings;
use crate::error::Operation;
use crate::session::{RequestContext, SessionHandle, SessionRegistry};
use crate::track::{SourceSystem, TrackDescriptor, TrackResolver};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const GUILD: u64 = 1;

fn ctx() -> RequestContext {
    RequestContext {
        guild: GUILD,
        user_id: 7,
        user_name: "dana".into(),
        voice_channel: Some(10),
        text_channel: Some(20),
    }
}

fn descriptors(refs: &[&str]) -> Vec<TrackDescriptor> {
    refs.iter()
        .map(|r| TrackDescriptor::new(*r, SourceSystem::Plex).with_title(*r))
        .collect()
}

fn refs(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{prefix}{i}")).collect()
}

async fn setup(backend: &Arc<MemoryBackend>) -> (SessionHandle, Ingestor) {
    let registry = SessionRegistry::new(backend.clone(), PlayerSettings::default());
    let session = registry.acquire(&ctx(), true, Operation::Queue).await.unwrap();
    let ingestor = Ingestor::new(
        TrackResolver::new(backend.clone()),
        &IngestSettings::default(),
    );
    (session, ingestor)
}

fn queued(backend: &MemoryBackend) -> Vec<String> {
    backend.snapshot(GUILD).map(|v| v.queued).unwrap_or_default()
}

#[test]
fn summary_lines() {
    let report = IngestReport {
        added: 3,
        total: 5,
        ..IngestReport::default()
    };
    assert_eq!(report.to_string(), "Added 3 of 5 tracks to the queue");
    assert_eq!(
        IngestReport::default().summary(),
        "No tracks were added to the queue."
    );
}

#[test]
fn fixed_pacing_keeps_base_delay() {
    let base = Duration::from_millis(500);
    assert_eq!(RetryPacing::Fixed.delay(base, 0), base);
    assert_eq!(RetryPacing::Fixed.delay(base, 5), base);
}

#[test]
fn exponential_pacing_doubles_and_clamps() {
    let pacing = RetryPacing::Exponential {
        max: Duration::from_millis(3_000),
        jitter: Duration::ZERO,
    };
    let base = Duration::from_millis(500);
    assert_eq!(pacing.delay(base, 0), Duration::from_millis(500));
    assert_eq!(pacing.delay(base, 1), Duration::from_millis(1_000));
    assert_eq!(pacing.delay(base, 2), Duration::from_millis(2_000));
    assert_eq!(pacing.delay(base, 3), Duration::from_millis(3_000));
    assert_eq!(pacing.delay(base, 40), Duration::from_millis(3_000));
}

#[test]
fn exponential_jitter_stays_within_bounds() {
    let pacing = RetryPacing::Exponential {
        max: Duration::from_millis(1_000),
        jitter: Duration::from_millis(250),
    };
    for _ in 0..100 {
        let d = pacing.delay(Duration::from_millis(500), 0);
        assert!(d >= Duration::from_millis(500));
        assert!(d <= Duration::from_millis(750));
    }
}

#[test]
fn pacing_follows_settings() {
    let mut settings = IngestSettings::default();
    assert_eq!(RetryPacing::from_settings(&settings), RetryPacing::Fixed);

    settings.retry_pacing = crate::config::RetryPacingSetting::Exponential;
    assert_eq!(
        RetryPacing::from_settings(&settings),
        RetryPacing::Exponential {
            max: Duration::from_millis(4_000),
            jitter: Duration::from_millis(250),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn idle_session_starts_first_item_and_appends_the_rest() {
    let names = refs("t", 5);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    assert_eq!(report.added, 5);
    assert_eq!(report.total, 5);
    assert!(report.started);
    assert!(report.dropped.is_empty());
    assert!(!report.cancelled);

    let view = backend.snapshot(GUILD).unwrap();
    assert_eq!(view.current.as_deref(), Some("t1"));
    assert_eq!(view.queued, vec!["t2", "t3", "t4", "t5"]);
    // Queue growth is `added` minus the started item.
    assert_eq!(view.queued.len(), report.added - 1);
}

#[tokio::test(start_paused = true)]
async fn busy_session_keeps_input_order_across_batches() {
    let names = refs("b", 7);
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tracks(["already"])
            .with_tracks(names.iter().map(String::as_str)),
    );
    let (session, ingestor) = setup(&backend).await;
    session
        .play_or_enqueue(
            crate::track::build_queue_item(
                &TrackDescriptor::new("already", SourceSystem::Plex),
                &crate::backend::memory::stub_track("already"),
                "dana",
            ),
            Operation::Play,
        )
        .await
        .unwrap();

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    assert!(!report.started);
    assert_eq!(report.added, 7);
    assert!(report.added <= report.total);
    assert_eq!(queued(&backend), names);
    assert_eq!(backend.snapshot(GUILD).unwrap().current.as_deref(), Some("already"));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_recovered_in_one_pass() {
    let backend = Arc::new(MemoryBackend::new().with_tracks(["a", "b", "c", "d"]));
    backend.miss_loads("b", 1);
    backend.miss_loads("c", 1);
    let (session, ingestor) = setup(&backend).await;

    let report = ingestor
        .enqueue(
            &session,
            &descriptors(&["a", "b", "c", "d"]),
            "dana",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.added, 4);
    assert!(report.dropped.is_empty());
    let view = backend.snapshot(GUILD).unwrap();
    assert_eq!(view.current.as_deref(), Some("a"));
    // Recovered items land after the ones that loaded first time.
    assert_eq!(view.queued, vec!["d", "b", "c"]);
    assert_eq!(backend.load_calls().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn total_failure_skips_the_recovery_pass() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, ingestor) = setup(&backend).await;

    let report = ingestor
        .enqueue(
            &session,
            &descriptors(&["x", "y", "z", "w"]),
            "dana",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.added, 0);
    assert!(!report.started);
    assert_eq!(report.dropped, vec!["x", "y", "z", "w"]);
    assert_eq!(report.summary(), "No tracks were added to the queue.");
    // One direct load each, nothing retried.
    assert_eq!(backend.load_calls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn permanently_missing_item_is_dropped_after_retry() {
    let backend = Arc::new(MemoryBackend::new().with_tracks(["a", "c"]));
    let (session, ingestor) = setup(&backend).await;

    let report = ingestor
        .enqueue(
            &session,
            &descriptors(&["a", "gone", "c"]),
            "dana",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.added, 2);
    assert_eq!(report.dropped, vec!["gone"]);
    assert_eq!(report.summary(), "Added 2 of 3 tracks to the queue");
    let gone_loads = backend
        .load_calls()
        .into_iter()
        .filter(|(r, _)| r == "gone")
        .count();
    assert_eq!(gone_loads, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_insertion_is_retried() {
    let backend = Arc::new(MemoryBackend::new().with_tracks(["a", "b", "c"]));
    let (session, ingestor) = setup(&backend).await;
    // "a" starts playback; the first append ("b") is lost.
    backend.fail_queue_adds(GUILD, 1);

    let report = ingestor
        .enqueue(
            &session,
            &descriptors(&["a", "b", "c"]),
            "dana",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.added, 3);
    assert_eq!(queued(&backend), vec!["c", "b"]);
}

#[tokio::test(start_paused = true)]
async fn youtube_items_fall_back_to_search_during_import() {
    let backend = Arc::new(MemoryBackend::new().with_tracks(["a"]));
    backend.add_search_result("old video", crate::backend::memory::stub_track("found"));
    let (session, ingestor) = setup(&backend).await;

    let input = vec![
        TrackDescriptor::new("a", SourceSystem::Plex),
        TrackDescriptor::new("old video", SourceSystem::YouTube),
    ];
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    assert_eq!(report.added, 2);
    let searches = backend
        .load_calls()
        .into_iter()
        .filter(|(_, mode)| *mode == SearchMode::KeywordSearch)
        .count();
    assert_eq!(searches, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_input_is_a_no_op() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, ingestor) = setup(&backend).await;

    let report = ingestor
        .enqueue(&session, &[], "dana", &CancellationToken::new())
        .await;

    assert_eq!(report, IngestReport::default());
    assert!(backend.load_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delays_follow_batch_layout() {
    let names = refs("t", 5);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let start = Instant::now();
    ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    // Five item delays plus one gap between the two batches.
    assert_eq!(start.elapsed(), Duration::from_millis(5 * 100 + 300));
}

#[tokio::test(start_paused = true)]
async fn recovery_waits_before_each_attempt_and_after_success() {
    let backend = Arc::new(MemoryBackend::new().with_tracks(["a", "b"]));
    backend.miss_loads("b", 1);
    let (session, ingestor) = setup(&backend).await;

    let start = Instant::now();
    let report = ingestor
        .enqueue(
            &session,
            &descriptors(&["a", "b"]),
            "dana",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.added, 2);
    assert_eq!(start.elapsed(), Duration::from_millis(2 * 100 + 500 + 300));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_run_and_keeps_inserted_items() {
    let names = refs("t", 6);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.cancel();
    });

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let report = ingestor.enqueue(&session, &input, "dana", &cancel).await;

    // Cancelled during the delay after the third item.
    assert!(report.cancelled);
    assert_eq!(report.added, 3);
    assert_eq!(backend.load_calls().len(), 3);
    assert_eq!(queued(&backend), vec!["t2", "t3"]);
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_token_inserts_nothing() {
    let backend = Arc::new(MemoryBackend::new().with_tracks(["a"]));
    let (session, ingestor) = setup(&backend).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = ingestor
        .enqueue(&session, &descriptors(&["a"]), "dana", &cancel)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.added, 0);
    assert!(backend.load_calls().is_empty());
    assert!(backend.snapshot(GUILD).unwrap().current.is_none());
}


#[tokio::test(start_paused = true)]
async fn disconnect_mid_run_ends_the_import() {
    let names = refs("t", 9);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let other = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        other.stop(true).await.unwrap();
    });

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    assert!(report.session_closed);
    assert!(!report.cancelled);
    assert_eq!(report.added, 2);
    assert_eq!(report.dropped, names[2..].to_vec());
    // Nothing is resolved once the session is gone, and no recovery runs.
    assert_eq!(backend.load_calls().len(), 2);
    assert!(!backend.snapshot(GUILD).unwrap().connected);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_stops_at_the_failed_insert() {
    let names = refs("t", 9);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let remote = backend.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        remote.drop_connection(GUILD);
    });

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let start = Instant::now();
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    assert!(report.session_closed);
    assert_eq!(report.added, 2);
    assert_eq!(report.dropped, names[2..].to_vec());
    // The third item was resolved before its insert hit the dead player.
    assert_eq!(backend.load_calls().len(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(200));
    assert!(session.is_closed());
}

#[tokio::test(start_paused = true)]
async fn skip_and_pause_during_import_keep_input_order() {
    let names = refs("t", 6);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let other = session.clone();
    let commands = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let skipped = other.skip().await.unwrap();
        // Lands inside the gap between the two batches.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let toggle = other.toggle_pause().await.unwrap();
        (skipped.map(|i| i.title().to_string()), toggle)
    });

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;
    let (skipped, toggle) = commands.await.unwrap();

    assert_eq!(skipped.as_deref(), Some("t1"));
    assert_eq!(toggle, crate::session::PauseToggle::Paused);
    assert_eq!(report.added, 6);
    assert!(report.dropped.is_empty());

    let view = backend.snapshot(GUILD).unwrap();
    assert_eq!(view.state, PlayerState::Paused);
    assert_eq!(view.current.as_deref(), Some("t2"));
    assert_eq!(view.queued, vec!["t3", "t4", "t5", "t6"]);
}

#[tokio::test(start_paused = true)]
async fn stop_during_import_keeps_appending_in_order() {
    let names = refs("t", 6);
    let backend = Arc::new(MemoryBackend::new().with_tracks(names.iter().map(String::as_str)));
    let (session, ingestor) = setup(&backend).await;

    let other = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        other.stop(false).await.unwrap();
    });

    let input = descriptors(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let report = ingestor
        .enqueue(&session, &input, "dana", &CancellationToken::new())
        .await;

    assert!(!report.session_closed);
    assert_eq!(report.added, 6);
    let view = backend.snapshot(GUILD).unwrap();
    assert_eq!(view.state, PlayerState::Idle);
    assert!(view.current.is_none());
    // "t1" and "t2" were cleared by the stop; the run only ever appends after starting.
    assert_eq!(view.queued, vec!["t3", "t4", "t5", "t6"]);
}
