//! Mastering engine facade
//!
//! Owns the stores, the worker pool and the live preview graphs, and wires
//! analysis, settings resolution and rendering into tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use mf_analysis::FeatureExtractor;
use mf_core::{
    AudioBuffer, GraphBuildError, MasteringSession, MasteringSettings, SettingsPatch, Track,
    TrackId,
};
use mf_master::{OfflineMasteringPipeline, RenderContext, RenderControl, SettingsResolver, Stage};
use mf_realtime::{PlaybackContext, PreviewAnalysis, PreviewController, PreviewGraph, PreviewProcessor};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::poll::PollClient;
use crate::scheduler::{JobError, TaskContext, TaskScheduler};
use crate::status::TaskStatusStore;
use crate::stores::{OutputStore, SettingsStore, TrackStore};
use crate::suggestions::{RuleBasedSuggestions, SuggestionProvider};
use crate::task::{
    AnalysisTaskResult, MasteringTaskResult, TaskEvent, TaskId, TaskKind, TaskResult, TaskStatus,
};

const AUTO_APPLY_FEEDBACK: &str = "Initial AI suggestions applied automatically";

/// Handle of a live preview graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphHandle(pub u64);

impl std::fmt::Display for GraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "graph-{}", self.0)
    }
}

/// A preview graph ready to be driven by a playback callback
///
/// The engine keeps the controller; the caller moves `processor` onto
/// the audio thread.
pub struct PreviewAttachment {
    pub handle: GraphHandle,
    pub processor: PreviewProcessor,
    /// Why the graph fell back to passthrough, if it did
    pub error: Option<GraphBuildError>,
}

struct Services {
    tracks: Arc<TrackStore>,
    outputs: Arc<OutputStore>,
    settings: Arc<SettingsStore>,
    suggestions: Arc<dyn SuggestionProvider>,
    extractor: FeatureExtractor,
    resolver: SettingsResolver,
    pipeline: OfflineMasteringPipeline,
    auto_apply: bool,
}

/// The mastering engine
pub struct MasteringEngine {
    config: EngineConfig,
    services: Arc<Services>,
    statuses: Arc<TaskStatusStore>,
    scheduler: TaskScheduler,
    graphs: Mutex<HashMap<GraphHandle, PreviewController>>,
    next_graph: AtomicU64,
}

impl MasteringEngine {
    /// Engine with the rule-based suggestion provider
    pub fn new(config: EngineConfig) -> Self {
        Self::with_suggestions(config, Arc::new(RuleBasedSuggestions::new()))
    }

    /// Engine with a custom suggestion provider
    pub fn with_suggestions(config: EngineConfig, suggestions: Arc<dyn SuggestionProvider>) -> Self {
        let tracks = Arc::new(TrackStore::new());
        let settings = Arc::new(SettingsStore::new());

        // Track records mirror the current settings
        let mirror = Arc::clone(&tracks);
        settings.subscribe(move |id, current| {
            mirror.update(id, |track| track.settings = Some(current.clone()));
        });

        let services = Arc::new(Services {
            tracks,
            outputs: Arc::new(OutputStore::new()),
            settings,
            suggestions,
            extractor: FeatureExtractor::new(config.analysis_config()),
            resolver: SettingsResolver::new(),
            pipeline: OfflineMasteringPipeline::new(config.pipeline.clone()),
            auto_apply: config.auto_apply_suggestions,
        });

        let statuses = Arc::new(TaskStatusStore::new());
        let scheduler = TaskScheduler::new(
            config.effective_workers(),
            config.mastering_policy,
            Arc::clone(&statuses),
        );

        Self {
            config,
            services,
            statuses,
            scheduler,
            graphs: Mutex::new(HashMap::new()),
            next_graph: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRACKS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register decoded audio as a new track
    pub fn add_track(&self, audio: AudioBuffer, filename: Option<&str>) -> TrackId {
        let mut track = Track::from_audio(TrackId::new(), &audio);
        if let Some(name) = filename {
            track = track.with_filename(name);
        }
        self.insert_track(track, audio)
    }

    /// Register a prepared track record with its audio
    pub fn insert_track(&self, track: Track, audio: AudioBuffer) -> TrackId {
        let id = self.services.tracks.insert(track, audio);
        log::info!("track {id} added");
        id
    }

    pub fn track(&self, id: &TrackId) -> Option<Track> {
        self.services.tracks.get(id)
    }

    /// Session history, oldest first
    pub fn sessions(&self, id: &TrackId) -> Vec<MasteringSession> {
        self.services.tracks.sessions(id)
    }

    /// Rendered buffer of a finished mastering task
    pub fn output(&self, id: &mf_core::OutputId) -> Option<Arc<AudioBuffer>> {
        self.services.outputs.get(id)
    }

    /// Current settings of a track
    pub fn settings(&self, id: &TrackId) -> Option<MasteringSettings> {
        self.services.settings.get(id)
    }

    /// Replace a track's current settings
    pub fn set_settings(&self, id: &TrackId, settings: MasteringSettings) -> EngineResult<()> {
        self.require_track(id)?;
        self.services.settings.set(id, settings);
        Ok(())
    }

    /// Settings from the track's analysis, a genre override and a patch
    pub fn resolve_settings(
        &self,
        id: &TrackId,
        genre: Option<&str>,
        patch: Option<&SettingsPatch>,
    ) -> EngineResult<MasteringSettings> {
        let track = self.require_track(id)?;
        Ok(self
            .services
            .resolver
            .resolve(track.analysis.as_ref(), genre, patch))
    }

    fn require_track(&self, id: &TrackId) -> EngineResult<Track> {
        self.services
            .tracks
            .get(id)
            .ok_or_else(|| EngineError::UnknownTrack(id.clone()))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TASKS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Submit an analysis task
    pub fn analyze(&self, id: &TrackId) -> EngineResult<TaskId> {
        self.analyze_with_request(id, None)
    }

    /// Submit an analysis task whose suggestions follow a free-text request
    pub fn analyze_with_request(&self, id: &TrackId, request: Option<&str>) -> EngineResult<TaskId> {
        self.require_track(id)?;
        let services = Arc::clone(&self.services);
        let request = request.map(str::to_string);
        self.scheduler.submit(
            TaskKind::Analysis,
            id.clone(),
            Box::new(move |ctx: &TaskContext| run_analysis(&services, ctx, request.as_deref())),
        )
    }

    /// Submit a mastering task
    ///
    /// Without explicit settings the track's current settings are used,
    /// resolved from its analysis when it has none yet.
    pub fn master(&self, id: &TrackId, settings: Option<MasteringSettings>) -> EngineResult<TaskId> {
        self.require_track(id)?;
        let services = Arc::clone(&self.services);
        self.scheduler.submit(
            TaskKind::Mastering,
            id.clone(),
            Box::new(move |ctx: &TaskContext| run_mastering(&services, ctx, settings)),
        )
    }

    /// Merge a patch into the current settings and render the result
    pub fn adjust(&self, id: &TrackId, patch: &SettingsPatch) -> EngineResult<TaskId> {
        self.require_track(id)?;
        let settings = self.services.settings.apply_patch(id, patch);
        let session = MasteringSession::new(id.clone(), settings.clone()).with_suggestions(patch.clone());
        self.services.tracks.add_session(session);
        self.master(id, Some(settings))
    }

    /// Turn a plain-language request into a patch and apply it
    pub fn adjust_with_request(&self, id: &TrackId, request: &str) -> EngineResult<(SettingsPatch, TaskId)> {
        let patch = self.services.suggestions.adjust(request);
        if patch.is_empty() {
            log::info!("request '{request}' matched no adjustment");
        }
        let task = self.adjust(id, &patch)?;
        Ok((patch, task))
    }

    pub fn get_status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.statuses.get(id)
    }

    /// Block until the task is terminal or `timeout` passes
    pub fn wait(&self, id: &TaskId, timeout: Duration) -> Option<TaskStatus> {
        self.statuses.wait(id, timeout)
    }

    /// Poll with the configured attempt budget
    pub fn poll(&self, id: &TaskId) -> Result<TaskStatus, mf_core::TaskTimeout> {
        PollClient::from_config(&self.config.poll).poll_store(&self.statuses, id)
    }

    /// Stream of task status changes
    pub fn subscribe(&self) -> Receiver<TaskEvent> {
        self.statuses.subscribe()
    }

    pub fn cancel(&self, id: &TaskId) -> EngineResult<()> {
        Ok(self.scheduler.cancel(id)?)
    }

    /// Non-terminal tasks, oldest first
    pub fn active_tasks(&self) -> Vec<TaskStatus> {
        self.statuses.active()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PREVIEW
    // ═══════════════════════════════════════════════════════════════════════════

    /// Build a live preview graph for a track
    ///
    /// A failing playback context still yields a (passthrough) attachment.
    pub fn build_preview_graph(
        &self,
        id: &TrackId,
        context: &dyn PlaybackContext,
    ) -> EngineResult<PreviewAttachment> {
        let track = self.require_track(id)?;
        let settings = match self.services.settings.get(id) {
            Some(settings) => settings,
            None => self
                .services
                .resolver
                .resolve(track.analysis.as_ref(), None, None),
        };
        let analysis = track.analysis.as_ref().map(PreviewAnalysis::from_analysis);

        let build = PreviewGraph::build(context, &settings, analysis, &self.config.preview);
        let handle = GraphHandle(self.next_graph.fetch_add(1, Ordering::Relaxed));
        self.graphs.lock().insert(handle, build.controller);
        log::info!("preview {handle} attached to track {id}");

        Ok(PreviewAttachment {
            handle,
            processor: build.processor,
            error: build.error,
        })
    }

    /// Push new settings to a live preview graph
    pub fn update_preview_graph(&self, handle: GraphHandle, settings: &MasteringSettings) -> EngineResult<()> {
        self.with_graph(handle, |controller| controller.update_parameters(settings))
    }

    pub fn bypass_preview(&self, handle: GraphHandle) -> EngineResult<()> {
        self.with_graph(handle, PreviewController::bypass)
    }

    pub fn resume_preview(&self, handle: GraphHandle) -> EngineResult<()> {
        self.with_graph(handle, PreviewController::resume)
    }

    /// Limiter gain reduction of a preview graph (dB)
    pub fn preview_gain_reduction(&self, handle: GraphHandle) -> EngineResult<f64> {
        self.with_graph(handle, |controller| controller.gain_reduction_db())
    }

    /// Drop a preview graph's controller
    pub fn release_preview_graph(&self, handle: GraphHandle) -> EngineResult<()> {
        self.graphs
            .lock()
            .remove(&handle)
            .map(|_| ())
            .ok_or(EngineError::UnknownGraph(handle.0))
    }

    fn with_graph<R>(&self, handle: GraphHandle, f: impl FnOnce(&mut PreviewController) -> R) -> EngineResult<R> {
        let mut graphs = self.graphs.lock();
        let controller = graphs
            .get_mut(&handle)
            .ok_or(EngineError::UnknownGraph(handle.0))?;
        Ok(f(controller))
    }

    /// Stop the workers; queued tasks fail
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        self.graphs.lock().clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JOBS
// ═══════════════════════════════════════════════════════════════════════════════

fn run_analysis(
    services: &Services,
    ctx: &TaskContext,
    request: Option<&str>,
) -> Result<TaskResult, JobError> {
    let track_id = ctx.track_id().clone();
    let audio = services
        .tracks
        .audio(&track_id)
        .ok_or_else(|| EngineError::UnknownTrack(track_id.clone()))?;

    ctx.progress(10, "validating");
    if let Err(e) = audio.validate() {
        services
            .tracks
            .update(&track_id, |track| track.record_analysis_error(e.to_string()));
        return Err(e.into());
    }

    let progress = |percent: u8| {
        let scaled = 20 + (u16::from(percent.min(100)) * 40 / 100) as u8;
        ctx.progress(scaled, "extracting features");
    };
    let analysis = match services
        .extractor
        .extract_with_progress(&audio, &progress, ctx.cancel_flag())
    {
        Ok(analysis) => analysis,
        Err(e) => {
            if !ctx.is_cancelled() {
                services
                    .tracks
                    .update(&track_id, |track| track.record_analysis_error(e.to_string()));
            }
            return Err(e.into());
        }
    };

    ctx.progress(75, "generating suggestions");
    let suggestions = services.suggestions.suggest(&analysis, request);
    let settings = services
        .resolver
        .resolve(Some(&analysis), None, Some(&suggestions));

    ctx.commit(|| {
        services
            .tracks
            .update(&track_id, |track| track.record_analysis(analysis.clone()));
        if services.auto_apply {
            services.settings.set(&track_id, settings.clone());
            let session = MasteringSession::new(track_id.clone(), settings.clone())
                .with_suggestions(suggestions.clone())
                .with_feedback(AUTO_APPLY_FEEDBACK);
            services.tracks.add_session(session);
        }
    })?;
    ctx.progress(90, "settings resolved");

    Ok(TaskResult::Analysis(Box::new(AnalysisTaskResult {
        track_id,
        analysis,
        ai_suggestions: suggestions,
        settings,
        auto_applied: services.auto_apply,
    })))
}

fn run_mastering(
    services: &Services,
    ctx: &TaskContext,
    settings: Option<MasteringSettings>,
) -> Result<TaskResult, JobError> {
    let track_id = ctx.track_id().clone();
    let start = Instant::now();

    ctx.progress(10, "loading");
    let track = services
        .tracks
        .get(&track_id)
        .ok_or_else(|| EngineError::UnknownTrack(track_id.clone()))?;
    let audio = services
        .tracks
        .audio(&track_id)
        .ok_or_else(|| EngineError::UnknownTrack(track_id.clone()))?;

    let settings = settings
        .or_else(|| services.settings.get(&track_id))
        .unwrap_or_else(|| services.resolver.resolve(track.analysis.as_ref(), None, None));
    let context = track
        .analysis
        .as_ref()
        .map(RenderContext::from_analysis)
        .unwrap_or_default();

    let progress = |stage: Stage, fraction: f64| {
        let percent = 20.0 + fraction.clamp(0.0, 1.0) * 70.0;
        ctx.progress(percent.round() as u8, stage.name());
    };
    let control = RenderControl::none()
        .with_cancel(ctx.cancel_flag())
        .with_progress(&progress);
    let output = services.pipeline.run(&audio, &settings, &context, &control)?;

    let fingerprint = output.report.fingerprint.clone();
    let (output_id, session_id) = ctx.commit(|| {
        let output_id = services.outputs.insert(output.buffer);
        services.tracks.update(&track_id, |track| track.is_processed = true);

        let session = MasteringSession::new(track_id.clone(), output.settings).with_render(
            output_id.clone(),
            fingerprint.clone(),
            start.elapsed().as_secs_f64(),
        );
        let session_id = session.id.clone();
        services.tracks.add_session(session);
        (output_id, session_id)
    })?;

    Ok(TaskResult::Mastering(MasteringTaskResult {
        track_id,
        session_id,
        output_id,
        fingerprint,
        report: output.report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_realtime::UnavailableContext;

    fn tone(seconds: f64) -> AudioBuffer {
        let sample_rate = 44100;
        let frames = (seconds * sample_rate as f64) as usize;
        let samples: Vec<f64> = (0..frames)
            .flat_map(|i| {
                let t = i as f64 / sample_rate as f64;
                let s = 0.3 * (2.0 * std::f64::consts::PI * 220.0 * t).sin();
                [s, s * 0.9]
            })
            .collect();
        AudioBuffer::from_interleaved(samples, 2, sample_rate).unwrap()
    }

    #[test]
    fn test_unknown_ids() {
        let engine = MasteringEngine::new(EngineConfig::default().with_workers(1));
        let track = TrackId::new();
        assert!(matches!(engine.analyze(&track), Err(EngineError::UnknownTrack(_))));
        assert!(matches!(engine.master(&track, None), Err(EngineError::UnknownTrack(_))));
        assert!(matches!(
            engine.update_preview_graph(GraphHandle(99), &MasteringSettings::neutral()),
            Err(EngineError::UnknownGraph(99))
        ));
        assert!(engine.get_status(&TaskId::new()).is_none());
    }

    #[test]
    fn test_settings_mirror_into_track() {
        let engine = MasteringEngine::new(EngineConfig::default().with_workers(1));
        let id = engine.add_track(tone(1.0), Some("tone.wav"));
        let settings = engine.resolve_settings(&id, Some("jazz"), None).unwrap();
        engine.set_settings(&id, settings.clone()).unwrap();
        assert_eq!(engine.track(&id).unwrap().settings, Some(settings));
        assert_eq!(engine.track(&id).unwrap().filename.as_deref(), Some("tone.wav"));
    }

    #[test]
    fn test_preview_graph_lifecycle() {
        let engine = MasteringEngine::new(EngineConfig::default().with_workers(1));
        let id = engine.add_track(tone(1.0), None);
        let attachment = engine
            .build_preview_graph(&id, &UnavailableContext::new("no device"))
            .unwrap();
        assert!(attachment.processor.is_passthrough());
        assert!(attachment.error.is_some());

        engine
            .update_preview_graph(attachment.handle, &MasteringSettings::neutral())
            .unwrap();
        engine.release_preview_graph(attachment.handle).unwrap();
        assert!(engine.bypass_preview(attachment.handle).is_err());
    }
}
