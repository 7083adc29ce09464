//! Export jobs and the end-to-end pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use splice_common::config::AppConfig;
use splice_common::error::{truncate_diagnostic, SpliceError, SpliceResult};
use splice_common::job::JobId;
use splice_project_model::request::ExportRequest;
use splice_timeline_core::compositor::{drawtext_chain, OutputFrame, OverlayCompositor};
use splice_timeline_core::fonts::{FontCatalog, FontResolver};
use splice_timeline_core::{compile_timeline, CompiledTimeline};
use tracing::Instrument;

use crate::fetch::{fetch_all, source_file_name, FetchRequest, LocalFetcher, MediaFetcher};
use crate::ffmpeg::{FfmpegTranscoder, FfprobeProber, MediaProber, Transcoder};
use crate::plan::{concat_list, RenderPlan, RenderStep};

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub id: JobId,

    pub request: ExportRequest,

    /// Final output file. Must live outside the work directory.
    pub output_path: PathBuf,

    /// Scratch directory, removed when the job ends.
    pub work_dir: PathBuf,
}

impl ExportJob {
    /// A job with a fresh id and a work directory under `config.work_dir`.
    ///
    /// A relative `work_dir` is anchored at the current directory; the
    /// concat demuxer resolves list entries against the list's own location.
    pub fn new(request: ExportRequest, output_path: impl Into<PathBuf>, config: &AppConfig) -> Self {
        let id = JobId::new();
        let work_dir = absolute(&config.work_dir).join(id.as_str());
        Self {
            id,
            request,
            output_path: output_path.into(),
            work_dir,
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone, Serialize)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Render steps finished so far.
    pub steps_done: usize,

    /// Render steps in the plan, 0 before planning.
    pub total_steps: usize,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Preparing,
    Fetching,
    Compiling,
    Trimming,
    Crossfading,
    Concatenating,
    Overlaying,
    Complete,
    Failed,
}

/// Result of one export, successful or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub success: bool,
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_duration_secs: Option<f64>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Availability of the external tools.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub transcoder: String,
    pub transcoder_available: bool,
    pub prober_available: bool,
    pub checked_at: DateTime<Utc>,
}

/// Runs export jobs against pluggable transcoder, fetcher, prober and fonts.
pub struct Exporter {
    config: AppConfig,
    transcoder: Arc<dyn Transcoder>,
    fetcher: Arc<dyn MediaFetcher>,
    prober: Arc<dyn MediaProber>,
    fonts: Arc<dyn FontResolver>,
}

impl Exporter {
    /// ffmpeg, ffprobe, local fetching and the standard font catalog.
    pub fn new(config: AppConfig) -> Self {
        Self {
            transcoder: Arc::new(FfmpegTranscoder::new(&config.transcoder)),
            fetcher: Arc::new(LocalFetcher),
            prober: Arc::new(FfprobeProber::new(&config.transcoder)),
            fonts: Arc::new(FontCatalog::standard(&config.fonts)),
            config,
        }
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn MediaProber>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_fonts(mut self, fonts: Arc<dyn FontResolver>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Transcoder and prober availability.
    pub fn health(&self) -> HealthReport {
        let transcoder_available = self.transcoder.is_available();
        let prober_available = self.prober.is_available();
        HealthReport {
            healthy: transcoder_available && prober_available,
            transcoder: self.transcoder.name().to_string(),
            transcoder_available,
            prober_available,
            checked_at: Utc::now(),
        }
    }

    /// Build the render plan without fetching or running anything.
    ///
    /// Sources are referenced where they would land in the work directory;
    /// the output frame is probed from the first source when it is a local
    /// file, otherwise the fallback frame is assumed.
    pub fn plan(&self, job: &ExportJob) -> SpliceResult<RenderPlan> {
        let compiled = compile_timeline(&job.request.clips, &job.request.transitions)?;
        let sources = source_paths(&compiled, &job.work_dir);
        let frame = compiled
            .timeline
            .clips
            .first()
            .and_then(|c| LocalFetcher::resolve(&c.clip.source_url).ok())
            .filter(|p| p.is_file())
            .map(|p| self.output_frame(&p))
            .unwrap_or(OutputFrame::FALLBACK);
        self.assemble(job, &compiled, &sources, frame)
    }

    /// Run the whole pipeline. Never fails; errors are reported in the outcome.
    pub async fn export(&self, job: ExportJob, progress: Option<ProgressCallback>) -> ExportOutcome {
        let started = Instant::now();
        let span = tracing::info_span!("export", job = %job.id);

        span.in_scope(|| {
            tracing::info!(
                clips = job.request.clips.len(),
                transitions = job.request.transitions.len(),
                overlays = job.request.overlays().len(),
                output = %job.output_path.display(),
                "Starting export"
            )
        });

        let mut steps = StepCount::default();
        let result = self
            .run(&job, progress.as_ref(), &mut steps)
            .instrument(span.clone())
            .await;
        let _guard = span.enter();

        if job.work_dir.exists() {
            match std::fs::remove_dir_all(&job.work_dir) {
                Ok(()) => tracing::debug!(path = %job.work_dir.display(), "Cleaned up work directory"),
                Err(err) => tracing::warn!(error = %err, path = %job.work_dir.display(), "Failed to clean up work directory"),
            }
        }

        let processing_time_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok((path, duration)) => {
                let file_size = std::fs::metadata(&path).map(|m| m.len()).ok();
                tracing::info!(
                    output = %path.display(),
                    file_size,
                    output_duration_secs = duration,
                    processing_time_ms,
                    "Export complete"
                );
                report(progress.as_ref(), ExportStage::Complete, 1.0, steps.done, steps.total);
                ExportOutcome {
                    success: true,
                    job_id: job.id,
                    output_path: Some(path),
                    file_size,
                    output_duration_secs: Some(duration),
                    processing_time_ms,
                    error: None,
                }
            }
            Err(err) => {
                tracing::error!(error = %err, processing_time_ms, "Export failed");
                report(progress.as_ref(), ExportStage::Failed, steps.fraction(), steps.done, steps.total);
                ExportOutcome {
                    success: false,
                    job_id: job.id,
                    output_path: None,
                    file_size: None,
                    output_duration_secs: None,
                    processing_time_ms,
                    error: Some(truncate_diagnostic(
                        &err.to_string(),
                        self.config.transcoder.diagnostic_limit,
                    )),
                }
            }
        }
    }

    async fn run(
        &self,
        job: &ExportJob,
        progress: Option<&ProgressCallback>,
        steps: &mut StepCount,
    ) -> SpliceResult<(PathBuf, f64)> {
        report(progress, ExportStage::Preparing, 0.0, 0, 0);

        // Validation comes first so bad requests never touch the filesystem.
        report(progress, ExportStage::Compiling, 0.0, 0, 0);
        let compiled = compile_timeline(&job.request.clips, &job.request.transitions)?;

        if job.output_path.starts_with(&job.work_dir) {
            return Err(SpliceError::config("output path must be outside the job work directory"));
        }
        tokio::fs::create_dir_all(&job.work_dir).await?;
        if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        report(progress, ExportStage::Fetching, 0.0, 0, 0);
        let requests = compiled
            .timeline
            .clips
            .iter()
            .zip(source_paths(&compiled, &job.work_dir))
            .map(|(clip, dest)| FetchRequest {
                url: clip.clip.source_url.clone(),
                dest,
            })
            .collect();
        let sources = fetch_all(Arc::clone(&self.fetcher), requests, self.config.fetch.max_parallel).await?;

        let frame = match sources.first() {
            Some(first) => self.output_frame(first),
            None => OutputFrame::FALLBACK,
        };
        let plan = self.assemble(job, &compiled, &sources, frame)?;
        tracing::info!(
            steps = plan.steps.len(),
            transcoder_steps = plan.transcoder_steps(),
            output_duration_secs = plan.output_duration_secs,
            width = frame.width,
            height = frame.height,
            "Render plan assembled"
        );

        steps.total = plan.steps.len();
        self.execute(&plan, progress, steps).await?;
        Ok((plan.output_path, plan.output_duration_secs))
    }

    fn assemble(
        &self,
        job: &ExportJob,
        compiled: &CompiledTimeline,
        sources: &[PathBuf],
        frame: OutputFrame,
    ) -> SpliceResult<RenderPlan> {
        let remapped = compiled.remap_overlays(job.request.overlays());
        let compositor = OverlayCompositor::new(frame, job.request.preview(), self.fonts.as_ref());
        let lines = compositor.compose_all(&remapped);
        let chain = (!lines.is_empty()).then(|| drawtext_chain(&lines));
        if let Some(chain) = &chain {
            tracing::debug!(lines = lines.len(), filter_len = chain.len(), "Overlay chain built");
        }

        RenderPlan::assemble(compiled, sources, chain, frame, &job.work_dir, &job.output_path)
    }

    fn output_frame(&self, source: &Path) -> OutputFrame {
        match self.prober.dimensions(source) {
            Some((width, height)) => OutputFrame::new(width, height),
            None => {
                tracing::warn!(
                    source = %source.display(),
                    "Could not probe source dimensions, assuming 1920x1080"
                );
                OutputFrame::FALLBACK
            }
        }
    }

    async fn execute(
        &self,
        plan: &RenderPlan,
        progress: Option<&ProgressCallback>,
        steps: &mut StepCount,
    ) -> SpliceResult<()> {
        let total = plan.steps.len();
        for (index, step) in plan.steps.iter().enumerate() {
            report(progress, step.stage(), steps.fraction(), index, total);
            tracing::info!(step = index + 1, total, "{}", step.describe());

            match step {
                RenderStep::CopyFile { from, to } => {
                    tokio::fs::copy(from, to).await?;
                }
                RenderStep::ConcatCopy {
                    list_file, inputs, ..
                } => {
                    tokio::fs::write(list_file, concat_list(inputs)).await?;
                    self.transcode(step).await?;
                }
                _ => self.transcode(step).await?,
            }
            steps.done = index + 1;
        }
        Ok(())
    }

    async fn transcode(&self, step: &RenderStep) -> SpliceResult<()> {
        let Some(args) = step.transcoder_args(&self.config.transcoder) else {
            return Ok(());
        };
        let transcoder = Arc::clone(&self.transcoder);
        let summary = tokio::task::spawn_blocking(move || transcoder.run(&args))
            .await
            .map_err(|e| SpliceError::Other(anyhow::anyhow!("transcoder task panicked: {e}")))??;
        tracing::debug!(
            stage = ?step.stage(),
            output = %step.output().display(),
            elapsed_ms = summary.elapsed_ms,
            out_time_secs = summary.out_time_secs,
            "Step transcoded"
        );
        Ok(())
    }
}

/// Export with the default ffmpeg pipeline.
///
/// This is the main entry point for rendering.
pub async fn export_video(
    job: ExportJob,
    config: AppConfig,
    progress: Option<ProgressCallback>,
) -> ExportOutcome {
    Exporter::new(config).export(job, progress).await
}

/// Render steps finished out of the planned total.
#[derive(Debug, Clone, Copy, Default)]
struct StepCount {
    done: usize,
    total: usize,
}

impl StepCount {
    fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Could not resolve current directory");
            path.to_path_buf()
        }
    }
}

fn source_paths(compiled: &CompiledTimeline, work_dir: &Path) -> Vec<PathBuf> {
    compiled
        .timeline
        .clips
        .iter()
        .enumerate()
        .map(|(k, c)| work_dir.join(source_file_name(k, &c.clip.source_url)))
        .collect()
}

fn report(
    progress: Option<&ProgressCallback>,
    stage: ExportStage,
    fraction: f64,
    steps_done: usize,
    total_steps: usize,
) {
    if let Some(cb) = progress {
        cb(ExportProgress {
            progress: fraction.clamp(0.0, 1.0),
            steps_done,
            total_steps,
            stage,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_work_dir_is_anchored() {
        let config = AppConfig {
            work_dir: PathBuf::from("work"),
            ..AppConfig::default()
        };
        let job = ExportJob::new(ExportRequest::new("user-1", Vec::new()), "out.mp4", &config);
        assert!(job.work_dir.is_absolute());
        assert_eq!(job.work_dir, std::env::current_dir().unwrap().join("work").join(job.id.as_str()));

        let list = concat_list(&[job.work_dir.join(source_file_name(0, "a.mp4"))]);
        assert!(list.starts_with(&format!("file '{}/input_0.mp4'", job.work_dir.display())));
    }

    #[test]
    fn test_step_fraction() {
        assert_eq!(StepCount::default().fraction(), 0.0);
        assert!((StepCount { done: 1, total: 4 }.fraction() - 0.25).abs() < 1e-9);
    }
}
