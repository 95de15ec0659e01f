//! Application state: the active engine snapshot and its hot swap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::core::settings::AppSettings;
use crate::core::types::*;
use crate::processing::runner::Runner;
use crate::services::{
    AdjusterService, CompressorService, ConverterService, FilterService, GifSplitterService,
    InfoViewerService, MetadataService, PdfGeneratorService, WatermarkService,
};
use crate::utils::{FlowError, FlowResult};

/// One immutable generation of the execution backend: the runner plus every
/// handler bound to it. Built fully before it becomes visible, replaced as a
/// whole, never mutated in place, so no caller can observe a mix of old and
/// new handlers.
struct Engine {
    runner: Arc<Runner>,
    converter: ConverterService,
    compressor: CompressorService,
    pdf_generator: PdfGeneratorService,
    gif_splitter: GifSplitterService,
    info_viewer: InfoViewerService,
    metadata: MetadataService,
    watermark: WatermarkService,
    adjuster: AdjusterService,
    filter: FilterService,
}

impl Engine {
    fn build(
        interpreter: Option<&Path>,
        scripts_dir: &Path,
        settings: &AppSettings,
        cancel: Arc<AtomicBool>,
    ) -> FlowResult<Self> {
        let mut runner = match interpreter {
            Some(interpreter) => {
                Runner::with_interpreter(interpreter, scripts_dir, settings.max_concurrency)?
            }
            None => Runner::new(scripts_dir, settings.max_concurrency)?,
        };
        runner.set_timeout(settings.script_timeout());
        let runner = Arc::new(runner);
        let workers = settings.max_concurrency;

        Ok(Self {
            converter: ConverterService::new(runner.clone(), workers, cancel.clone()),
            compressor: CompressorService::new(runner.clone(), workers, cancel.clone()),
            pdf_generator: PdfGeneratorService::new(runner.clone()),
            gif_splitter: GifSplitterService::new(runner.clone()),
            info_viewer: InfoViewerService::new(runner.clone()),
            metadata: MetadataService::new(runner.clone()),
            watermark: WatermarkService::new(runner.clone(), workers, cancel.clone()),
            adjuster: AdjusterService::new(runner.clone(), workers, cancel.clone()),
            filter: FilterService::new(runner.clone(), workers, cancel),
            runner,
        })
    }
}

/// The backend application facade.
///
/// Routes every operation to the handler set of the current engine snapshot.
/// Callers capture the snapshot once per API call, so a configuration change
/// mid-call never mixes generations: in-flight work completes against the
/// runner it started on while new calls pick up the replacement.
pub struct App {
    scripts_dir: PathBuf,
    interpreter: Option<PathBuf>,
    cancel: Arc<AtomicBool>,
    settings: RwLock<AppSettings>,
    engine: RwLock<Arc<Engine>>,
}

impl App {
    /// Creates the app with default settings, resolving the interpreter from
    /// the environment.
    pub fn new(scripts_dir: impl Into<PathBuf>) -> FlowResult<Self> {
        Self::init(None, scripts_dir.into(), AppSettings::default())
    }

    /// Creates the app with explicit settings.
    pub fn with_settings(scripts_dir: impl Into<PathBuf>, settings: AppSettings) -> FlowResult<Self> {
        Self::init(None, scripts_dir.into(), settings)
    }

    /// Creates the app with an explicit interpreter (integration harnesses).
    pub fn with_interpreter(
        interpreter: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
        settings: AppSettings,
    ) -> FlowResult<Self> {
        Self::init(Some(interpreter.into()), scripts_dir.into(), settings)
    }

    fn init(
        interpreter: Option<PathBuf>,
        scripts_dir: PathBuf,
        settings: AppSettings,
    ) -> FlowResult<Self> {
        let settings = settings.normalized();
        let cancel = Arc::new(AtomicBool::new(false));
        let engine = Engine::build(
            interpreter.as_deref(),
            &scripts_dir,
            &settings,
            cancel.clone(),
        )?;
        info!(
            "backend initialized (concurrency: {}, scripts: {})",
            settings.max_concurrency,
            scripts_dir.display()
        );
        Ok(Self {
            scripts_dir,
            interpreter,
            cancel,
            settings: RwLock::new(settings),
            engine: RwLock::new(Arc::new(engine)),
        })
    }

    /// Snapshot of the current settings.
    pub async fn settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    /// Applies new settings, hot-swapping the execution backend when the
    /// concurrency limit or script timeout changed.
    ///
    /// The replacement engine is built completely before it becomes visible;
    /// if construction fails the previous engine stays in effect and the
    /// error is returned. Only after the swap is visible is the old runner
    /// stopped, which waits for calls already dispatched against it.
    pub async fn apply_settings(&self, settings: AppSettings) -> FlowResult<AppSettings> {
        let settings = settings.normalized();
        let current = self.settings.read().await.clone();

        if settings != current {
            let engine = Engine::build(
                self.interpreter.as_deref(),
                &self.scripts_dir,
                &settings,
                self.cancel.clone(),
            )?;
            let old = {
                let mut active = self.engine.write().await;
                std::mem::replace(&mut *active, Arc::new(engine))
            };
            info!(
                "runner hot-swapped: concurrency {} -> {}",
                current.max_concurrency, settings.max_concurrency
            );
            old.runner.stop().await;
        }

        *self.settings.write().await = settings.clone();
        Ok(settings)
    }

    /// Requests cancellation of the operation currently in flight. Items not
    /// yet dispatched complete with an "operation cancelled" failure.
    pub fn cancel_processing(&self) {
        warn!("cancellation requested");
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Stops the active runner, draining in-flight work.
    pub async fn shutdown(&self) {
        info!("backend shutting down");
        let engine = self.engine.read().await.clone();
        engine.runner.stop().await;
    }

    async fn engine(&self) -> Arc<Engine> {
        self.engine.read().await.clone()
    }

    /// Resets the cancel flag at the start of a cancelable operation.
    fn begin_cancelable(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    /// Maps a protocol error to [`FlowError::Cancelled`] when the user
    /// cancelled mid-call.
    fn fold_cancel(&self, error: FlowError) -> FlowError {
        if self.cancel.load(Ordering::SeqCst) {
            FlowError::Cancelled
        } else {
            error
        }
    }

    pub async fn convert(&self, req: ConvertRequest) -> FlowResult<ConvertResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .converter
            .convert(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn convert_batch(
        &self,
        requests: Vec<ConvertRequest>,
    ) -> (Vec<ConvertResult>, Option<FlowError>) {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine.converter.convert_batch(&requests).await
    }

    pub async fn compress(&self, req: CompressRequest) -> FlowResult<CompressResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .compressor
            .compress(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn compress_batch(
        &self,
        requests: Vec<CompressRequest>,
    ) -> (Vec<CompressResult>, Option<FlowError>) {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine.compressor.compress_batch(&requests).await
    }

    pub async fn generate_pdf(&self, req: PdfRequest) -> FlowResult<PdfResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .pdf_generator
            .generate_pdf(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn split_gif(&self, req: GifSplitRequest) -> FlowResult<GifSplitResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .gif_splitter
            .split_gif(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn get_image_info(&self, req: InfoRequest) -> FlowResult<InfoResult> {
        let engine = self.engine().await;
        engine.info_viewer.get_info(&req).await
    }

    pub async fn strip_metadata(
        &self,
        req: MetadataStripRequest,
    ) -> FlowResult<MetadataStripResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .metadata
            .strip_metadata(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn edit_metadata(&self, req: MetadataEditRequest) -> FlowResult<MetadataEditResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .metadata
            .edit_metadata(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn add_watermark(&self, req: WatermarkRequest) -> FlowResult<WatermarkResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .watermark
            .add_watermark(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn add_watermark_batch(
        &self,
        requests: Vec<WatermarkRequest>,
    ) -> Vec<WatermarkResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine.watermark.add_watermark_batch(&requests).await
    }

    pub async fn adjust(&self, req: AdjustRequest) -> FlowResult<AdjustResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .adjuster
            .adjust(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn adjust_batch(&self, requests: Vec<AdjustRequest>) -> Vec<AdjustResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine.adjuster.adjust_batch(&requests).await
    }

    pub async fn apply_filter(&self, req: FilterRequest) -> FlowResult<FilterResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine
            .filter
            .apply_filter(&req)
            .await
            .map_err(|e| self.fold_cancel(e))
    }

    pub async fn apply_filter_batch(&self, requests: Vec<FilterRequest>) -> Vec<FilterResult> {
        self.begin_cancelable();
        let engine = self.engine().await;
        engine.filter.apply_filter_batch(&requests).await
    }
}
