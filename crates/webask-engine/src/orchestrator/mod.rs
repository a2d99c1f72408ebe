//! The ask orchestrator.
//!
//! Drives one run through the attempt state machine: locate the target
//! tab, inject the prompt, poll for the reply, classify each sample and
//! extract the answer, retrying under a bounded policy. Every attempt is
//! appended to the run history whatever its outcome, and the run always
//! ends in exactly one [`Outcome`].

mod state;

pub use state::OrchestratorState;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use webask_protocols::{
    Attempt, AttemptOutcome, Clipboard, ExtractionResult, FailureReason, Keyboard, Outcome, Prompt,
    Session, Snapshot, SnapshotProvider, TabSource, UrlPattern,
};

use crate::detector::BlockDetector;
use crate::error::{InjectError, LocateError};
use crate::extractor::{ExtractOptions, Extractor};
use crate::injector::{DesktopHandle, InputInjector};
use crate::locator::TargetLocator;
use crate::poller::{PollConfig, PollTermination, ResponsePoller};

/// Options for one ask run.
#[derive(Debug, Clone)]
pub struct AskOptions {
    pub target: UrlPattern,
    /// Time budget of one attempt, injection included.
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    /// Delay before each retry.
    pub backoff: Duration,
    pub extraction: ExtractOptions,
    /// Retry after a block verdict instead of failing at once.
    pub retry_on_block: bool,
    /// Poll interval and completion settings. The timeout is replaced by
    /// what is left of the attempt budget.
    pub poll: PollConfig,
}

impl AskOptions {
    pub fn new(target: UrlPattern) -> Self {
        Self {
            target,
            attempt_timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            extraction: ExtractOptions::default(),
            retry_on_block: true,
            poll: PollConfig::default(),
        }
    }
}

/// Sequences locator, injector, poller, detector and extractor.
pub struct AskOrchestrator<C: Clipboard, K: Keyboard> {
    locator: TargetLocator,
    provider: Arc<dyn SnapshotProvider>,
    detector: BlockDetector,
    injector: InputInjector,
    desktop: DesktopHandle<C, K>,
    extractor: Extractor,
    options: AskOptions,
    session: Option<Session>,
    states: Vec<OrchestratorState>,
    last_snapshot: Option<Snapshot>,
}

impl<C: Clipboard, K: Keyboard> AskOrchestrator<C, K> {
    pub fn new(
        tabs: Arc<dyn TabSource>,
        provider: Arc<dyn SnapshotProvider>,
        desktop: DesktopHandle<C, K>,
        options: AskOptions,
    ) -> Self {
        Self {
            locator: TargetLocator::new(tabs),
            provider,
            detector: BlockDetector::with_defaults(),
            injector: InputInjector::default(),
            desktop,
            extractor: Extractor::new(options.extraction.clone()),
            options,
            session: None,
            states: vec![OrchestratorState::Idle],
            last_snapshot: None,
        }
    }

    pub fn with_detector(mut self, detector: BlockDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_injector(mut self, injector: InputInjector) -> Self {
        self.injector = injector;
        self
    }

    pub fn options(&self) -> &AskOptions {
        &self.options
    }

    /// Every state entered during the last run, in order.
    pub fn state_history(&self) -> &[OrchestratorState] {
        &self.states
    }

    pub fn state(&self) -> OrchestratorState {
        self.states
            .last()
            .copied()
            .unwrap_or(OrchestratorState::Idle)
    }

    /// The most recent snapshot sampled by the poller.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// The session held for reuse across attempts.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn desktop(&self) -> &DesktopHandle<C, K> {
        &self.desktop
    }

    /// Run the ask cycle to completion.
    ///
    /// Never fails: every component error becomes the outcome of the
    /// attempt that raised it.
    pub async fn run(&mut self, prompt: &Prompt, cancel: &CancellationToken) -> Outcome {
        self.states.clear();
        self.states.push(OrchestratorState::Idle);
        self.last_snapshot = None;

        let max_attempts = self.options.max_attempts.max(1);
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut attempt_number = 0u32;

        loop {
            attempt_number += 1;
            if attempt_number > 1 {
                self.backoff(cancel).await;
            }

            info!(attempt = attempt_number, max_attempts, "Starting attempt");
            let started_at = Utc::now();
            let result = self.attempt(prompt, cancel).await;
            let outcome = match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(reason) => AttemptOutcome::from(reason.clone()),
            };
            attempts.push(Attempt {
                attempt_number,
                started_at,
                finished_at: Utc::now(),
                outcome,
            });

            let reason = match result {
                Ok(extraction) => {
                    self.transition(OrchestratorState::Succeeded);
                    info!(
                        attempt = attempt_number,
                        objects = extraction.objects.len(),
                        source = ?extraction.source,
                        "Ask succeeded"
                    );
                    return Outcome::Success {
                        result: extraction,
                        attempts,
                    };
                }
                Err(reason) => reason,
            };

            let retry = attempt_number < max_attempts
                && reason.is_retryable(self.options.retry_on_block);
            warn!(
                attempt = attempt_number,
                reason = %reason,
                retry,
                "Attempt failed"
            );

            if !retry {
                self.transition(OrchestratorState::Failed);
                return Outcome::Failure { reason, attempts };
            }
            self.transition(OrchestratorState::Retrying);
        }
    }

    /// One inject-poll-classify-extract cycle.
    async fn attempt(
        &mut self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult, FailureReason> {
        let started = Instant::now();
        let session = self.acquire_session(cancel).await?;
        let result = self.run_on_session(&session, prompt, cancel, started).await;
        self.session = Some(session);
        result
    }

    /// Locate the target, or refocus the held session on a retry.
    ///
    /// A session that cannot be refocused is dropped so the next attempt
    /// scans for the target again.
    async fn acquire_session(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Session, FailureReason> {
        if let Some(mut session) = self.session.take() {
            self.transition(OrchestratorState::Injecting);
            if cancel.is_cancelled() {
                self.session = Some(session);
                return Err(FailureReason::Cancelled);
            }
            return match self.locator.refocus(&mut session).await {
                Ok(()) => Ok(session),
                Err(e) => {
                    warn!("Held tab could not be refocused: {}", e);
                    Err(FailureReason::TargetNotFound)
                }
            };
        }

        self.transition(OrchestratorState::Locating);
        if cancel.is_cancelled() {
            return Err(FailureReason::Cancelled);
        }
        match self.locator.locate(&self.options.target).await {
            Ok(session) => {
                self.transition(OrchestratorState::Injecting);
                Ok(session)
            }
            Err(LocateError::TargetNotFound(pattern)) => {
                debug!(pattern = %pattern, "No matching tab");
                Err(FailureReason::TargetNotFound)
            }
            Err(e) => {
                warn!("Tab lookup failed: {}", e);
                Err(FailureReason::TargetNotFound)
            }
        }
    }

    async fn run_on_session(
        &mut self,
        session: &Session,
        prompt: &Prompt,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<ExtractionResult, FailureReason> {
        let baseline = match self.provider.capture(session).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!("Baseline capture failed: {}", e);
                None
            }
        };

        if let Some(selector) = &self.injector.settings().input_selector {
            if let Err(e) = self.locator.focus_input(session, selector).await {
                warn!("Chat input could not be focused: {}", e);
                return Err(FailureReason::NoActiveTarget);
            }
        }

        self.injector
            .inject(&mut self.desktop, session, prompt, cancel)
            .await
            .map_err(|e| match e {
                InjectError::NoActiveTarget => FailureReason::NoActiveTarget,
                InjectError::Cancelled => FailureReason::Cancelled,
                other => FailureReason::InjectionFailed(other.to_string()),
            })?;

        self.transition(OrchestratorState::Polling);
        let remaining = self.options.attempt_timeout.saturating_sub(started.elapsed());
        let config = self.options.poll.clone().with_timeout(remaining);
        let report = ResponsePoller::new(self.provider.as_ref(), &self.detector, config)
            .poll(session, baseline.as_ref(), cancel)
            .await
            .map_err(|e| FailureReason::CaptureFailed(e.to_string()))?;

        self.transition(OrchestratorState::Classifying);
        if let Some(snapshot) = &report.final_snapshot {
            self.last_snapshot = Some(snapshot.clone());
        }
        debug!(
            samples = report.samples,
            verdict = %report.verdict,
            termination = ?report.termination,
            "Polling finished"
        );

        match report.termination {
            PollTermination::Completed => {}
            PollTermination::Blocked(verdict) => return Err(FailureReason::BlockDetected(verdict)),
            PollTermination::TimedOut => return Err(FailureReason::PollTimeout),
            PollTermination::Cancelled => return Err(FailureReason::Cancelled),
        }

        self.transition(OrchestratorState::Extracting);
        let Some(snapshot) = report.final_snapshot else {
            return Err(FailureReason::ExtractionEmpty);
        };
        let extraction = self.extractor.extract_snapshot(&snapshot);
        if self.extractor.accepts(&extraction) {
            Ok(extraction)
        } else {
            Err(FailureReason::ExtractionEmpty)
        }
    }

    /// Wait out the retry delay; returns early when cancelled.
    async fn backoff(&self, cancel: &CancellationToken) {
        if self.options.backoff.is_zero() {
            return;
        }
        debug!(delay = ?self.options.backoff, "Backing off before retry");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.options.backoff) => {}
        }
    }

    fn transition(&mut self, next: OrchestratorState) {
        let current = self.state();
        debug_assert!(
            current.can_transition_to(next),
            "illegal transition {} -> {}",
            current,
            next
        );
        debug!(from = %current, to = %next, "State transition");
        self.states.push(next);
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
