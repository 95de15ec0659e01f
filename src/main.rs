//! Headless integration driver for the ImageFlow backend.
//!
//! Exercises the Rust-to-Python boundary against the real scripts: resolves
//! the interpreter and scripts directory, runs a single conversion, a batch
//! with the configured concurrency, and a hot swap of the runner. Useful for
//! verifying an environment without starting the desktop shell.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use imageflow_backend::core::types::{ConvertRequest, InfoRequest};
use imageflow_backend::utils::resolve_scripts_dir;
use imageflow_backend::{App, AppSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    println!("Testing ImageFlow Rust-Python integration");
    println!("=========================================");

    let scripts_dir = resolve_scripts_dir().context("failed to resolve scripts directory")?;
    info!("python scripts directory: {}", scripts_dir.display());

    let app = App::new(&scripts_dir).context("failed to initialize backend")?;
    let settings = app.settings().await;
    println!(
        "\n[1] Backend initialized (concurrency: {})",
        settings.max_concurrency
    );

    println!("\n[2] Single conversion (nonexistent input, domain failure expected)");
    let result = app
        .convert(ConvertRequest {
            input_path: "nonexistent.jpg".into(),
            output_path: "output.png".into(),
            format: "png".into(),
            quality: 90,
            ..ConvertRequest::default()
        })
        .await?;
    println!("    success={} error={:?}", result.success, result.error);

    println!("\n[3] Batch conversion of 3 requests");
    let requests: Vec<ConvertRequest> = (0..3)
        .map(|i| ConvertRequest {
            input_path: format!("nonexistent-{i}.jpg"),
            output_path: format!("output-{i}.png"),
            format: "png".into(),
            quality: 90,
            ..ConvertRequest::default()
        })
        .collect();
    let (results, aggregate) = app.convert_batch(requests).await;
    for (i, result) in results.iter().enumerate() {
        println!("    [{i}] success={} error={:?}", result.success, result.error);
    }
    if let Some(err) = aggregate {
        println!("    aggregate: {err}");
    }

    println!("\n[4] Hot swap to single-executor mode");
    let swapped = app
        .apply_settings(AppSettings {
            max_concurrency: 1,
            ..settings
        })
        .await?;
    println!("    active concurrency: {}", swapped.max_concurrency);

    println!("\n[5] Info request through the swapped-in runner");
    match app
        .get_image_info(InfoRequest {
            input_path: "nonexistent.jpg".into(),
        })
        .await
    {
        Ok(info) => println!("    success={} error={:?}", info.success, info.error),
        Err(err) => println!("    protocol error: {err}"),
    }

    app.shutdown().await;
    println!("\n=========================================");
    println!("Integration check completed.");
    Ok(())
}
