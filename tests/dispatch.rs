//! Dispatcher and lifecycle behavior on a scripted engine.
//!
//! These run on a paused clock, so the timing assertions are exact:
//! sleeps resolve instantly in test time while preserving ordering.

mod common;

use common::{EngineCall, MockEngine, PageScript};
use quarry::config::ExtractorConfig;
use quarry::dispatch;
use quarry::error::SubmitError;
use quarry::job::ExtractMode;
use quarry::lifecycle::{LOAD_FAILURE_ERROR, TIMEOUT_ERROR};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;

fn config_with_timeout(ms: u64) -> ExtractorConfig {
    ExtractorConfig {
        timeout: Duration::from_millis(ms),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_page_extraction_happy_path() {
    let engine = MockEngine::single(PageScript::default());
    let log = engine.call_log();
    let (handle, dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let started = Instant::now();
    let result = handle
        .submit("https://example.com/a", ExtractMode::Page)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.url, "https://example.com/a");
    assert_eq!(result.title, "A Page");
    assert_eq!(result.text, "body text");
    assert!(result.html.contains("body text"));
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);

    // 100ms load plus the full 2s settle window.
    assert!(
        elapsed >= Duration::from_millis(2_100) && elapsed < Duration::from_millis(2_600),
        "unexpected elapsed: {elapsed:?}"
    );

    handle.shutdown();
    dispatcher.await.unwrap();

    let calls = log.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            EngineCall::NewPage,
            EngineCall::Load("https://example.com/a".into()),
            EngineCall::Text("https://example.com/a".into()),
            EngineCall::Html("https://example.com/a".into()),
            EngineCall::Close("https://example.com/a".into()),
            EngineCall::Shutdown,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_settle_delay_before_extraction() {
    let engine = MockEngine::single(PageScript {
        load_delay: Some(Duration::from_millis(500)),
        ..Default::default()
    });
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let started = Instant::now();
    let result = handle
        .submit("https://example.com", ExtractMode::Page)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(result.error.is_none());
    // Extraction never happens sooner than load + settle.
    assert!(
        elapsed >= Duration::from_millis(2_500) && elapsed < Duration::from_millis(3_000),
        "unexpected elapsed: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_load_timeout_extracts_partial_content() {
    // The load signal never fires; a 500ms timeout must force extraction
    // at 500ms, not at the 30s default.
    let engine = MockEngine::single(PageScript {
        load_delay: None,
        ..Default::default()
    });
    let log = engine.call_log();
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(500));

    let started = Instant::now();
    let result = handle
        .submit("https://slow.example.com", ExtractMode::Page)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.error.as_deref(), Some(TIMEOUT_ERROR));
    // Whatever the DOM held at the deadline is still scraped.
    assert_eq!(result.text, "body text");
    assert!(
        elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(1_000),
        "unexpected elapsed: {elapsed:?}"
    );

    let calls = log.lock().unwrap();
    assert!(calls.contains(&EngineCall::Text("https://slow.example.com".into())));
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_is_advisory() {
    let engine = MockEngine::single(PageScript {
        load_delay: Some(Duration::from_millis(50)),
        load_ok: false,
        ..Default::default()
    });
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let started = Instant::now();
    let result = handle
        .submit("https://example.com", ExtractMode::Page)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // A failed load still settles and extracts; the failure is a warning.
    assert_eq!(result.error.as_deref(), Some(LOAD_FAILURE_ERROR));
    assert_eq!(result.text, "body text");
    assert!(elapsed >= Duration::from_millis(2_050), "settle was skipped: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_during_settle_takes_precedence() {
    // Load reports failure at 500ms, the deadline lands at 1s, mid-settle.
    // The timeout error wins over the load-failure error.
    let engine = MockEngine::single(PageScript {
        load_delay: Some(Duration::from_millis(500)),
        load_ok: false,
        ..Default::default()
    });
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(1_000));

    let started = Instant::now();
    let result = handle
        .submit("https://example.com", ExtractMode::Page)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.error.as_deref(), Some(TIMEOUT_ERROR));
    assert!(
        elapsed >= Duration::from_millis(1_000) && elapsed < Duration::from_millis(1_500),
        "settle should have been cut short: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_extraction_failure_is_advisory() {
    let engine = MockEngine::single(PageScript {
        fail_extract: true,
        ..Default::default()
    });
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let result = handle
        .submit("https://example.com", ExtractMode::Page)
        .await
        .unwrap();

    let error = result.error.expect("expected an advisory error");
    assert!(error.starts_with("Extraction failed:"), "got: {error}");
    assert!(result.text.is_empty());
    // Title capture happens before the failing calls.
    assert_eq!(result.title, "A Page");
}

#[tokio::test(start_paused = true)]
async fn test_jobs_run_in_submission_order() {
    let engine = MockEngine::new(vec![PageScript::default(), PageScript::default()]);
    let log = engine.call_log();
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let (first, second) = tokio::join!(
        handle.submit("https://example.com/first", ExtractMode::Page),
        handle.submit("https://example.com/second", ExtractMode::Page),
    );
    assert_ok!(first);
    assert_ok!(second);

    // The second page opens only after the first is fully torn down, and
    // each page sees exactly one text and one HTML request.
    let calls = log.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            EngineCall::NewPage,
            EngineCall::Load("https://example.com/first".into()),
            EngineCall::Text("https://example.com/first".into()),
            EngineCall::Html("https://example.com/first".into()),
            EngineCall::Close("https://example.com/first".into()),
            EngineCall::NewPage,
            EngineCall::Load("https://example.com/second".into()),
            EngineCall::Text("https://example.com/second".into()),
            EngineCall::Html("https://example.com/second".into()),
            EngineCall::Close("https://example.com/second".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_outer_timeout_when_dispatcher_wedges() {
    // Text extraction hangs forever. The submit wait gives up at
    // timeout + grace and reports the distinct outer failure.
    let engine = MockEngine::single(PageScript {
        hang_extract: true,
        ..Default::default()
    });
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(500));

    let started = Instant::now();
    let err = handle
        .submit("https://example.com", ExtractMode::Page)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, SubmitError::Timeout));
    assert_eq!(err.to_string(), "extraction timed out");
    assert!(
        elapsed >= Duration::from_millis(10_500),
        "gave up before the grace period: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_sentinel_stops_dispatcher() {
    let engine = MockEngine::single(PageScript::default());
    let log = engine.call_log();
    let (handle, dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let result = handle
        .submit("https://example.com", ExtractMode::Page)
        .await
        .unwrap();
    assert!(result.error.is_none());

    handle.shutdown();
    dispatcher.await.unwrap();

    {
        let calls = log.lock().unwrap();
        assert_eq!(calls.last(), Some(&EngineCall::Shutdown));
    }

    // After the dispatcher is gone a submit fails immediately.
    let err = handle
        .submit("https://example.com/late", ExtractMode::Page)
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::WorkerGone));
    assert_eq!(err.to_string(), "extraction failed");
}

#[tokio::test(start_paused = true)]
async fn test_jobs_behind_sentinel_never_run() {
    let engine = MockEngine::single(PageScript::default());
    let log = engine.call_log();
    let (handle, dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let before = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.submit("https://example.com/before", ExtractMode::Page).await })
    };
    tokio::task::yield_now().await;

    handle.shutdown();

    let behind = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.submit("https://example.com/behind", ExtractMode::Page).await })
    };
    tokio::task::yield_now().await;

    let before = before.await.unwrap().unwrap();
    assert!(before.error.is_none());

    let err = behind.await.unwrap().unwrap_err();
    assert!(matches!(err, SubmitError::WorkerGone));

    dispatcher.await.unwrap();

    let calls = log.lock().unwrap();
    assert!(calls.contains(&EngineCall::Load("https://example.com/before".into())));
    assert!(!calls.contains(&EngineCall::Load("https://example.com/behind".into())));
    assert_eq!(calls.last(), Some(&EngineCall::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn test_pdf_mode_bypasses_engine() {
    let engine = MockEngine::new(vec![]);
    let log = engine.call_log();
    let (handle, dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(30_000));

    let result = handle
        .submit("/nonexistent/dir/report.pdf", ExtractMode::Pdf)
        .await
        .unwrap();

    let error = result.error.expect("missing file should be advisory");
    assert!(error.starts_with("Failed to load PDF:"), "got: {error}");
    assert_eq!(result.title, "report.pdf");
    assert!(result.text.is_empty());

    handle.shutdown();
    dispatcher.await.unwrap();

    // The rendering engine was never touched.
    let calls = log.lock().unwrap();
    assert_eq!(*calls, vec![EngineCall::Shutdown]);
}

#[tokio::test(start_paused = true)]
async fn test_queue_depth_tracks_backlog() {
    let engine = MockEngine::new(vec![PageScript {
        load_delay: None,
        ..Default::default()
    }]);
    let (handle, _dispatcher) = dispatch::spawn(Box::new(engine), config_with_timeout(60_000));

    assert_eq!(handle.queue_depth(), 0);

    for i in 0..3 {
        let handle = handle.clone();
        tokio::spawn(async move {
            let _ = handle
                .submit(&format!("https://example.com/{i}"), ExtractMode::Page)
                .await;
        });
    }
    tokio::time::sleep(Duration::from_millis(1)).await;

    // One job is in flight (stuck loading); the other two are queued.
    assert_eq!(handle.queue_depth(), 2);
}
