//! Response polling.
//!
//! Samples the page at a fixed interval until the reply text stops
//! changing, a block page appears, the deadline passes or the run is
//! cancelled. A sample in flight is never interrupted: cancellation is
//! observed before each sample and during the sleep between samples.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use webask_protocols::{BlockVerdict, Session, Snapshot, SnapshotProvider};

use crate::detector::BlockDetector;
use crate::error::PollError;

/// Poll loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
    /// Consecutive identical non-empty samples that mark completion (>= 2).
    pub stable_samples: u32,
    /// Consecutive capture failures tolerated before giving up.
    pub max_consecutive_capture_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
            stable_samples: 2,
            max_consecutive_capture_errors: 3,
        }
    }
}

impl PollConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Why polling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTermination {
    /// The reply text stabilized.
    Completed,
    /// A terminal block verdict was seen.
    Blocked(BlockVerdict),
    TimedOut,
    Cancelled,
}

/// Result of one poll run.
#[derive(Debug, Clone)]
pub struct PollReport {
    /// Last snapshot sampled, if any sample completed.
    pub final_snapshot: Option<Snapshot>,
    pub termination: PollTermination,
    /// Verdict of the last sample.
    pub verdict: BlockVerdict,
    pub samples: u32,
}

/// Samples a session until its reply settles.
pub struct ResponsePoller<'a> {
    provider: &'a dyn SnapshotProvider,
    detector: &'a BlockDetector,
    config: PollConfig,
}

impl<'a> ResponsePoller<'a> {
    pub fn new(
        provider: &'a dyn SnapshotProvider,
        detector: &'a BlockDetector,
        config: PollConfig,
    ) -> Self {
        Self {
            provider,
            detector,
            config,
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `session` until completion, block, timeout or cancellation.
    ///
    /// `baseline` is the page observed before the prompt was sent. Samples
    /// do not count toward stability until the page has moved away from it,
    /// either with a different reply text or with more assistant turns, so
    /// a previous answer still on screen is not mistaken for the new one.
    pub async fn poll(
        &self,
        session: &Session,
        baseline: Option<&Snapshot>,
        cancel: &CancellationToken,
    ) -> Result<PollReport, PollError> {
        let deadline = Instant::now() + self.config.timeout;
        let stable_target = self.config.stable_samples.max(2);

        let mut report = PollReport {
            final_snapshot: None,
            termination: PollTermination::TimedOut,
            verdict: BlockVerdict::Unknown,
            samples: 0,
        };
        let mut capture_failures = 0u32;
        let mut departed = baseline.is_none_or(|b| b.content_text().trim().is_empty());
        let mut last_text: Option<String> = None;
        let mut stable = 0u32;

        loop {
            if cancel.is_cancelled() {
                report.termination = PollTermination::Cancelled;
                return Ok(report);
            }
            if Instant::now() >= deadline {
                debug!(samples = report.samples, "Poll deadline reached");
                report.termination = PollTermination::TimedOut;
                return Ok(report);
            }

            match self.provider.capture(session).await {
                Ok(snapshot) => {
                    capture_failures = 0;
                    report.samples += 1;

                    let verdict = self.detector.classify(&snapshot);
                    report.verdict = verdict;
                    let text = snapshot.content_text().trim().to_string();
                    if !departed && baseline.is_some_and(|b| moved_on(b, &snapshot)) {
                        departed = true;
                    }
                    report.final_snapshot = Some(snapshot);

                    if verdict.is_terminal() {
                        debug!(%verdict, sample = report.samples, "Terminal verdict");
                        report.termination = PollTermination::Blocked(verdict);
                        return Ok(report);
                    }

                    if !departed || text.is_empty() {
                        stable = 0;
                        last_text = None;
                    } else if last_text.as_deref() == Some(text.as_str()) {
                        stable += 1;
                    } else {
                        stable = 1;
                        last_text = Some(text);
                    }

                    debug!(
                        sample = report.samples,
                        %verdict,
                        stable,
                        "Sampled page"
                    );

                    if stable >= stable_target {
                        report.termination = PollTermination::Completed;
                        return Ok(report);
                    }
                }
                Err(e) => {
                    capture_failures += 1;
                    warn!(
                        failures = capture_failures,
                        "Snapshot capture failed: {}", e
                    );
                    if capture_failures >= self.config.max_consecutive_capture_errors.max(1) {
                        return Err(PollError::Capture {
                            failures: capture_failures,
                            source: e,
                        });
                    }
                }
            }

            let wake = (Instant::now() + self.config.interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.termination = PollTermination::Cancelled;
                    return Ok(report);
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

/// Whether `sample` shows something other than the `baseline` page: a
/// different reply, or a new assistant turn even when its text repeats.
fn moved_on(baseline: &Snapshot, sample: &Snapshot) -> bool {
    if baseline.content_text().trim() != sample.content_text().trim() {
        return true;
    }
    matches!((baseline.turns, sample.turns), (Some(before), Some(now)) if now > before)
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
