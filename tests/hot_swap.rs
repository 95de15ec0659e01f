//! End-to-end tests for the execution backend: batch dispatch through the
//! public API, the hot swap of the runner under load, and the per-family
//! error surfacing policies. External scripts are stubbed with `/bin/sh`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use imageflow_backend::core::types::{ConvertRequest, WatermarkRequest};
use imageflow_backend::{App, AppSettings, FlowError};

const SH: &str = "/bin/sh";

fn temp_scripts_dir(label: &str) -> PathBuf {
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "imageflow-e2e-{label}-{}-{}",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).expect("failed to create temp scripts dir");
    dir
}

/// Converter stub: optional fixed delay, inputs containing "missing" report
/// a domain failure, everything else succeeds and echoes its paths back.
fn write_converter_script(dir: &Path, delay: &str) {
    let body = format!(
        r#"#!/bin/sh
in=$(cat)
inp=$(printf '%s' "$in" | sed -n 's/.*"input_path":"\([^"]*\)".*/\1/p')
out=$(printf '%s' "$in" | sed -n 's/.*"output_path":"\([^"]*\)".*/\1/p')
{sleep}
case "$inp" in
*missing*)
    printf '{{"success":false,"input_path":"%s","output_path":"%s","error":"input file not found: %s"}}' "$inp" "$out" "$inp"
    ;;
*)
    printf '{{"success":true,"input_path":"%s","output_path":"%s"}}' "$inp" "$out"
    ;;
esac
"#,
        sleep = if delay.is_empty() {
            String::new()
        } else {
            format!("sleep {delay}")
        }
    );
    std::fs::write(dir.join("converter.py"), body).expect("failed to write converter stub");
}

fn write_watermark_script(dir: &Path) {
    let body = r#"#!/bin/sh
in=$(cat)
inp=$(printf '%s' "$in" | sed -n 's/.*"input_path":"\([^"]*\)".*/\1/p')
out=$(printf '%s' "$in" | sed -n 's/.*"output_path":"\([^"]*\)".*/\1/p')
case "$inp" in
*missing*)
    printf '{"success":false,"input_path":"%s","output_path":"%s","error":"input file not found: %s"}' "$inp" "$out" "$inp"
    ;;
*)
    printf '{"success":true,"input_path":"%s","output_path":"%s"}' "$inp" "$out"
    ;;
esac
"#;
    std::fs::write(dir.join("watermark.py"), body).expect("failed to write watermark stub");
}

fn settings(max_concurrency: usize) -> AppSettings {
    AppSettings {
        max_concurrency,
        script_timeout_secs: 30,
    }
}

fn convert_request(input: &str) -> ConvertRequest {
    ConvertRequest {
        input_path: input.to_string(),
        output_path: format!("{input}.out.png"),
        format: "png".into(),
        quality: 90,
        ..ConvertRequest::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn hot_swap_mid_batch_drains_the_old_runner() {
    let dir = temp_scripts_dir("swap");
    write_converter_script(&dir, "0.15");

    let app = Arc::new(App::with_interpreter(SH, &dir, settings(2)).unwrap());

    // 10 jobs at 150 ms each over 2 workers: at least ~750 ms of work.
    let batch = {
        let app = app.clone();
        tokio::spawn(async move {
            let requests: Vec<ConvertRequest> =
                (0..10).map(|i| convert_request(&format!("img-{i}.jpg"))).collect();
            app.convert_batch(requests).await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    let before_swap = Instant::now();
    let swapped = app.apply_settings(settings(1)).await.unwrap();
    assert_eq!(swapped.max_concurrency, 1);

    // apply_settings stops the old runner, which must wait for the whole
    // in-flight batch before returning.
    assert!(
        before_swap.elapsed() >= Duration::from_millis(400),
        "swap returned while the batch was still running"
    );

    let (results, aggregate) = batch.await.unwrap();
    assert_eq!(results.len(), 10);
    assert!(aggregate.is_none(), "got {aggregate:?}");
    for (i, result) in results.iter().enumerate() {
        assert!(result.success, "item {i} failed after the swap");
        assert_eq!(result.input_path, format!("img-{i}.jpg"));
    }

    // New calls run against the swapped-in runner.
    let result = app.convert(convert_request("after-swap.jpg")).await.unwrap();
    assert!(result.success);
    assert_eq!(app.settings().await.max_concurrency, 1);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_failures_return_full_results_and_an_aggregate() {
    let dir = temp_scripts_dir("aggregate");
    write_converter_script(&dir, "");

    let app = App::with_interpreter(SH, &dir, settings(2)).unwrap();

    let inputs = ["a.jpg", "missing-b.jpg", "c.jpg", "missing-d.jpg", "e.jpg"];
    let requests: Vec<ConvertRequest> = inputs.iter().map(|i| convert_request(i)).collect();
    let (results, aggregate) = app.convert_batch(requests).await;

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        if i == 1 || i == 3 {
            assert!(!result.success, "item {i} should have failed");
            assert!(!result.error.as_deref().unwrap_or_default().is_empty());
        } else {
            assert!(result.success, "item {i} should have succeeded");
        }
        assert_eq!(result.input_path, inputs[i]);
    }

    let aggregate = aggregate.expect("convert batches surface an aggregate error");
    assert!(matches!(aggregate, FlowError::Batch(_)));
    let text = aggregate.to_string();
    assert!(text.contains("convert[1]"), "got {text}");
    assert!(text.contains("convert[3]"), "got {text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn watermark_batch_reports_failures_per_item_only() {
    let dir = temp_scripts_dir("watermark");
    write_watermark_script(&dir);

    let app = App::with_interpreter(SH, &dir, settings(2)).unwrap();

    let requests: Vec<WatermarkRequest> = ["a.jpg", "missing-b.jpg", "c.jpg"]
        .iter()
        .map(|input| WatermarkRequest {
            input_path: input.to_string(),
            output_path: format!("{input}.out.png"),
            watermark_type: "text".into(),
            text: "draft".into(),
            position: "br".into(),
            opacity: 0.5,
            ..WatermarkRequest::default()
        })
        .collect();

    // No aggregate error in this family: failures only live in the results.
    let results = app.add_watermark_batch(requests).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(!results[1].error.as_deref().unwrap_or_default().is_empty());
    assert!(results[2].success);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_swap_leaves_the_active_engine_untouched() {
    let dir = temp_scripts_dir("swap-fail");
    write_converter_script(&dir, "");

    let app = App::with_interpreter(SH, &dir, settings(2)).unwrap();
    assert!(app.convert(convert_request("a.jpg")).await.unwrap().success);

    // Break engine construction, then attempt a swap.
    std::fs::remove_dir_all(&dir).unwrap();
    let err = app.apply_settings(settings(4)).await.unwrap_err();
    assert!(matches!(err, FlowError::Settings(_)), "got {err:?}");
    assert_eq!(app.settings().await.max_concurrency, 2);

    // The previous engine is still the active one and keeps working once
    // the scripts reappear.
    std::fs::create_dir_all(&dir).unwrap();
    write_converter_script(&dir, "");
    assert!(app.convert(convert_request("b.jpg")).await.unwrap().success);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_fails_pending_items_without_protocol_errors() {
    let dir = temp_scripts_dir("cancel");
    write_converter_script(&dir, "0.2");

    let app = Arc::new(App::with_interpreter(SH, &dir, settings(1)).unwrap());

    let batch = {
        let app = app.clone();
        tokio::spawn(async move {
            let requests: Vec<ConvertRequest> =
                (0..6).map(|i| convert_request(&format!("img-{i}.jpg"))).collect();
            app.convert_batch(requests).await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    app.cancel_processing();

    let (results, aggregate) = batch.await.unwrap();
    assert_eq!(results.len(), 6);
    assert!(results[0].success, "first item was already running");
    let cancelled = results
        .iter()
        .filter(|r| r.error.as_deref() == Some("operation cancelled"))
        .count();
    assert!(cancelled >= 1, "no item observed the cancellation");
    assert!(aggregate.is_some());
}
