//! Tick loops: drive a `ResonanceSession` from a sample source, optionally
//! recording into the store.

use std::time::Duration;

use anyhow::{Context, Result};
use bw_core::{EstimateOutcome, Moment, ResonanceSession, SampleSource, TickReport, ToneCue};
use bw_store::Store;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where ticks are persisted, if anywhere.
pub struct Recorder<'a> {
    pub store: &'a Store,
    pub session: Uuid,
}

impl Recorder<'_> {
    /// Readings are written only for ticks that recomputed metrics.
    fn record(&self, report: &TickReport) -> bw_store::Result<()> {
        if report.outcome == EstimateOutcome::Updated {
            self.store.record_reading(self.session, report)?;
        }
        if let Some(moment) = &report.moment {
            self.store.record_moment(self.session, moment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub updates: u64,
    pub rejected: u64,
    pub cues: Vec<(u64, ToneCue)>,
    pub moments: Vec<Moment>,
}

impl RunSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        match report.outcome {
            EstimateOutcome::Updated => self.updates += 1,
            EstimateOutcome::Rejected => self.rejected += 1,
            _ => {}
        }
        if report.recommendation_changed {
            tracing::debug!(
                t = report.timestamp,
                frequency = report.recommendation.frequency,
                confidence = report.confidence,
                stress = report.metrics.stress_level,
                "recommendation changed"
            );
        }
        if let Some(cue) = &report.cue {
            self.cues.push((report.timestamp, cue.clone()));
        }
        if let Some(moment) = &report.moment {
            self.moments.push(moment.clone());
        }
    }
}

/// Pull samples as fast as the source yields them, up to `max_ticks`.
/// Persistence failures abort the run.
pub fn drive(
    session: &mut ResonanceSession,
    source: &mut dyn SampleSource,
    max_ticks: Option<u64>,
    recorder: Option<&Recorder<'_>>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    while max_ticks.is_none_or(|max| summary.ticks < max) {
        let Some(sample) = source.next_sample() else {
            break;
        };
        let report = session.tick(sample);
        if report.outcome == EstimateOutcome::Rejected {
            tracing::warn!(t = sample.timestamp, "dropped out-of-order sample");
        }
        if let Some(rec) = recorder {
            rec.record(&report).context("failed to record tick")?;
        }
        summary.absorb(&report);
    }
    Ok(summary)
}

/// Real-time loop: one sample per `tick_ms` until `cancel` fires or the
/// source runs dry. Persistence failures are logged and the loop carries on.
pub async fn drive_live(
    session: &mut ResonanceSession,
    source: &mut dyn SampleSource,
    tick_ms: u64,
    recorder: &Recorder<'_>,
    cancel: CancellationToken,
) -> RunSummary {
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut summary = RunSummary::default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        let Some(sample) = source.next_sample() else {
            tracing::info!("source exhausted");
            break;
        };
        let report = session.tick(sample);
        if let Err(e) = recorder.record(&report) {
            tracing::error!(session = %recorder.session, "failed to record tick: {e}");
        }
        if let Some(cue) = &report.cue {
            println!("{}", format_cue(report.timestamp, cue));
        }
        summary.absorb(&report);
    }
    summary
}

pub fn format_cue(timestamp: u64, cue: &ToneCue) -> String {
    format!(
        "cue   t={:>8.1}s  {:>3} Hz  {:>5} ms  gain {:.2}",
        timestamp as f64 / 1000.0,
        cue.frequency,
        cue.duration,
        cue.intensity
    )
}
