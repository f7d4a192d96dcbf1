//! Engine integration tests
//!
//! Runs analysis and mastering through the worker pool:
//! - Analysis populates the track, suggestions and auto-applied settings
//! - Mastering stores an output and a session
//! - Progress events never move backwards
//! - Supersede, queue and cancel behaviour per track
//! - Bounded polling and live preview through the facade
//! - Cancelled analysis leaves no trace on the track
//! - Concurrent settings writers keep the track mirror current

use std::f64::consts::PI;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use mf_core::{AnalysisResult, AudioBuffer, MasteringSettings, SettingsPatch, TaskTimeout};
use mf_engine::{
    EngineConfig, EngineError, MasteringEngine, MasteringPolicy, RuleBasedSuggestions,
    SuggestionProvider, TaskError, TaskEvent, TaskId, TaskKind, TaskState, TaskStatus,
};
use mf_realtime::PlaybackFormat;

const TIMEOUT: Duration = Duration::from_secs(120);

fn tone_mix(seconds: f64) -> AudioBuffer {
    let sr = 44100.0;
    let frames = (seconds * sr) as usize;
    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f64 / sr;
        let base = 0.4 * (2.0 * PI * 90.0 * t).sin()
            + 0.25 * (2.0 * PI * 440.0 * t).sin()
            + 0.1 * (2.0 * PI * 5000.0 * t).sin();
        samples.push(base);
        samples.push(base * 0.9 + 0.05 * (2.0 * PI * 660.0 * t).sin());
    }
    AudioBuffer::from_interleaved(samples, 2, 44100).unwrap()
}

fn engine(workers: usize) -> MasteringEngine {
    MasteringEngine::new(EngineConfig::default().with_workers(workers))
}

fn finish(engine: &MasteringEngine, task: &TaskId) -> TaskStatus {
    let status = engine.wait(task, TIMEOUT).unwrap();
    assert!(status.is_terminal(), "task {task} still {}", status.state);
    status
}

fn events_for(events: &crossbeam_channel::Receiver<TaskEvent>, task: &TaskId) -> Vec<TaskEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.recv_timeout(TIMEOUT) {
        if event.id != *task {
            continue;
        }
        let done = event.state.is_terminal();
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

#[test]
fn test_analysis_task_end_to_end() {
    let engine = engine(2);
    let track_id = engine.add_track(tone_mix(2.0), Some("mix.wav"));
    let task = engine.analyze(&track_id).unwrap();

    let status = finish(&engine, &task);
    assert_eq!(status.state, TaskState::Success, "{:?}", status.error);
    assert_eq!(status.kind, TaskKind::Analysis);
    assert_eq!(status.progress, 100);

    let result = status.result.as_ref().and_then(|r| r.as_analysis()).unwrap();
    assert!(result.auto_applied);
    assert!(result.settings.eq_settings.is_valid());
    assert_eq!(engine.settings(&track_id), Some(result.settings.clone()));

    let track = engine.track(&track_id).unwrap();
    assert!(track.is_analyzed);
    assert_eq!(track.predicted_genre.as_deref(), Some(result.analysis.genre.as_str()));
    assert_eq!(track.settings, Some(result.settings.clone()));

    let sessions = engine.sessions(&track_id);
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        sessions[0].user_feedback.as_deref(),
        Some("Initial AI suggestions applied automatically")
    );
    assert_eq!(sessions[0].ai_suggestions.as_ref(), Some(&result.ai_suggestions));
}

#[test]
fn test_analysis_progress_is_monotonic() {
    let engine = engine(1);
    let events = engine.subscribe();
    let track_id = engine.add_track(tone_mix(2.0), None);
    let task = engine.analyze(&track_id).unwrap();

    let seen = events_for(&events, &task);
    assert_eq!(seen.first().map(|e| e.state), Some(TaskState::Pending));
    assert_eq!(seen.last().map(|e| e.state), Some(TaskState::Success));
    assert!(seen.windows(2).all(|w| w[0].progress <= w[1].progress));
    for checkpoint in [10, 75, 90, 100] {
        assert!(seen.iter().any(|e| e.progress == checkpoint), "no {checkpoint}% event");
    }
}

#[test]
fn test_analysis_failure_is_recorded() {
    let engine = engine(1);
    let track_id = engine.add_track(tone_mix(0.3), None);
    let task = engine.analyze(&track_id).unwrap();

    let status = finish(&engine, &task);
    assert_eq!(status.state, TaskState::Failure);
    assert!(status.error.as_deref().is_some_and(|e| e.contains("too short")));

    let track = engine.track(&track_id).unwrap();
    assert!(!track.is_analyzed);
    assert!(track.analysis_error.is_some());
    assert!(engine.settings(&track_id).is_none());
}

#[test]
fn test_mastering_after_analysis() {
    let engine = engine(2);
    let audio = tone_mix(2.0);
    let frames = audio.frames();
    let track_id = engine.add_track(audio, None);
    let analysis = engine.analyze(&track_id).unwrap();
    assert_eq!(finish(&engine, &analysis).state, TaskState::Success);

    let task = engine.master(&track_id, None).unwrap();
    let status = finish(&engine, &task);
    assert_eq!(status.state, TaskState::Success, "{:?}", status.error);

    let result = status.result.as_ref().and_then(|r| r.as_mastering()).unwrap();
    let output = engine.output(&result.output_id).unwrap();
    assert_eq!(output.frames(), frames);
    assert!(output.peak() <= 1.0);
    assert_eq!(result.report.fingerprint, result.fingerprint);

    let track = engine.track(&track_id).unwrap();
    assert!(track.is_processed);
    let session = engine.sessions(&track_id).pop().unwrap();
    assert_eq!(session.id, result.session_id);
    assert_eq!(session.output_id.as_ref(), Some(&result.output_id));
    assert!(session.processing_time.is_some_and(|t| t >= 0.0));
}

#[test]
fn test_second_render_supersedes_first() {
    let engine = engine(1);
    let track_id = engine.add_track(tone_mix(20.0), None);

    let first = engine.master(&track_id, Some(MasteringSettings::neutral())).unwrap();
    let second = engine.master(&track_id, Some(MasteringSettings::neutral())).unwrap();

    let status = finish(&engine, &first);
    assert_eq!(status.state, TaskState::Failure);
    assert_eq!(status.error, Some(format!("superseded by task {second}")));
    assert_eq!(finish(&engine, &second).state, TaskState::Success);
    assert_eq!(engine.sessions(&track_id).len(), 1);
}

#[test]
fn test_queued_renders_run_in_order() {
    let engine = MasteringEngine::new(
        EngineConfig::default()
            .with_workers(2)
            .with_policy(MasteringPolicy::Queue),
    );
    let events = engine.subscribe();
    let track_id = engine.add_track(tone_mix(3.0), None);

    let first = engine.master(&track_id, None).unwrap();
    let second = engine.master(&track_id, None).unwrap();
    assert_eq!(finish(&engine, &first).state, TaskState::Success);
    assert_eq!(finish(&engine, &second).state, TaskState::Success);

    // The second render never reported progress before the first finished
    let order: Vec<TaskEvent> = events.try_iter().collect();
    let first_done = order
        .iter()
        .position(|e| e.id == first && e.state.is_terminal())
        .unwrap();
    let second_started = order
        .iter()
        .position(|e| e.id == second && e.state == TaskState::Progress)
        .unwrap();
    assert!(second_started > first_done);
}

#[test]
fn test_cancel_render() {
    let engine = engine(1);
    let track_id = engine.add_track(tone_mix(20.0), None);
    let task = engine.master(&track_id, None).unwrap();

    engine.cancel(&task).unwrap();
    let status = finish(&engine, &task);
    assert_eq!(status.state, TaskState::Failure);
    assert_eq!(status.error.as_deref(), Some("cancelled"));
    assert!(!engine.track(&track_id).unwrap().is_processed);
    assert!(engine.active_tasks().is_empty());

    assert!(matches!(
        engine.cancel(&task),
        Err(EngineError::Task(TaskError::Terminal { .. }))
    ));
}

#[test]
fn test_poll_exhaustion_is_a_client_timeout() {
    let engine = MasteringEngine::new(EngineConfig::default().with_workers(1).with_poll(2, 1));
    let track_id = engine.add_track(tone_mix(20.0), None);
    let task = engine.master(&track_id, None).unwrap();

    let err: TaskTimeout = engine.poll(&task).unwrap_err();
    assert_eq!(err.attempts, 2);
    assert_eq!(err.task_id, task.to_string());
    assert!(engine.get_status(&task).is_some_and(|s| !s.is_terminal()));

    engine.cancel(&task).unwrap();
    finish(&engine, &task);
}

#[test]
fn test_adjust_merges_and_renders() {
    let engine = engine(2);
    let track_id = engine.add_track(tone_mix(2.0), None);
    let analysis = engine.analyze(&track_id).unwrap();
    assert_eq!(finish(&engine, &analysis).state, TaskState::Success);
    let before = engine.settings(&track_id).unwrap();

    let (patch, task) = engine.adjust_with_request(&track_id, "more bass").unwrap();
    assert!(!patch.is_empty());
    let after = engine.settings(&track_id).unwrap();
    assert_eq!(after.eq_settings.bands[0].gain, 3.0);
    assert_eq!(after.eq_settings.bands.len(), 10);
    assert_eq!(after.compression_settings, before.compression_settings);

    let status = finish(&engine, &task);
    assert_eq!(status.state, TaskState::Success, "{:?}", status.error);
    // Auto-apply, the adjustment and the render
    assert_eq!(engine.sessions(&track_id).len(), 3);
}

#[test]
fn test_preview_through_engine() {
    let engine = engine(1);
    let track_id = engine.add_track(tone_mix(2.0), None);
    let mut attachment = engine
        .build_preview_graph(&track_id, &PlaybackFormat::stereo(44100))
        .unwrap();
    assert!(attachment.error.is_none());
    assert!(!attachment.processor.is_passthrough());

    let mut block: Vec<f64> = (0..1024).map(|i| 1.5 * (i as f64 * 0.03).sin()).collect();
    attachment.processor.process(&mut block);
    assert!(block.iter().all(|s| s.is_finite()));

    engine.bypass_preview(attachment.handle).unwrap();
    let input: Vec<f64> = (0..1024).map(|i| 0.2 * (i as f64 * 0.01).sin()).collect();
    let mut block = input.clone();
    attachment.processor.process(&mut block);
    assert_eq!(block, input);
    assert!(attachment.processor.is_bypassed());

    engine
        .update_preview_graph(attachment.handle, &MasteringSettings::neutral())
        .unwrap();
    engine.resume_preview(attachment.handle).unwrap();
    engine.release_preview_graph(attachment.handle).unwrap();
    assert!(matches!(
        engine.release_preview_graph(attachment.handle),
        Err(EngineError::UnknownGraph(_))
    ));
}

/// Suggestion provider that holds the analysis job until released
struct GatedSuggestions {
    reached: Sender<()>,
    release: Receiver<()>,
}

impl SuggestionProvider for GatedSuggestions {
    fn suggest(&self, analysis: &AnalysisResult, request: Option<&str>) -> SettingsPatch {
        let _ = self.reached.send(());
        let _ = self.release.recv_timeout(TIMEOUT);
        RuleBasedSuggestions::new().suggest(analysis, request)
    }
}

#[test]
fn test_cancelled_analysis_commits_nothing() {
    let (reached_tx, reached) = bounded(1);
    let (release, release_rx) = bounded(1);
    let engine = MasteringEngine::with_suggestions(
        EngineConfig::default().with_workers(1),
        Arc::new(GatedSuggestions {
            reached: reached_tx,
            release: release_rx,
        }),
    );
    let track_id = engine.add_track(tone_mix(2.0), None);
    let task = engine.analyze(&track_id).unwrap();

    // Features are extracted, nothing is committed yet
    reached.recv_timeout(TIMEOUT).unwrap();
    engine.cancel(&task).unwrap();
    release.send(()).unwrap();

    let status = finish(&engine, &task);
    assert_eq!(status.state, TaskState::Failure);
    assert_eq!(status.error.as_deref(), Some("cancelled"));

    let track = engine.track(&track_id).unwrap();
    assert!(!track.is_analyzed);
    assert!(track.analysis_error.is_none());
    assert!(track.settings.is_none());
    assert!(engine.settings(&track_id).is_none());
    assert!(engine.sessions(&track_id).is_empty());
}

#[test]
fn test_settings_mirror_survives_concurrent_writers() {
    let engine = engine(1);
    let track_id = engine.add_track(tone_mix(1.0), None);

    thread::scope(|scope| {
        for w in 0..4 {
            let engine = &engine;
            let track_id = &track_id;
            scope.spawn(move || {
                for i in 0..100 {
                    let mut settings = MasteringSettings::neutral();
                    settings.eq_settings.bands[w].gain = (i % 10) as f64;
                    engine.set_settings(track_id, settings).unwrap();
                }
            });
        }
    });

    assert_eq!(engine.track(&track_id).unwrap().settings, engine.settings(&track_id));
}
