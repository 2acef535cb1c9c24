//! Completion polling for uploaded media.
//!
//! An uploaded video is not usable until the provider has finished
//! processing it. The poller re-fetches the file's state at a fixed interval
//! until it is `Ready`, `Failed`, or the attempt budget runs out.
//!
//! ## Why a separate state machine?
//!
//! [`PollMachine`] decides what to do after each fetch and has no I/O, so the
//! termination rules are tested without a runtime. [`Poller`] drives it,
//! sleeping through an injected [`Sleeper`] so tests run instantly and can
//! count the pauses.
//!
//! ## Cancellation
//!
//! Dropping the future returned by [`Poller::await_ready`] stops polling at
//! the next suspension point. The remote file is left alone; it expires on
//! the provider's side.

use crate::config::PollPolicy;
use crate::error::AnalysisError;
use crate::output::{JobState, RemoteJobHandle};
use crate::progress::ProgressCallback;
use crate::provider::InferenceProvider;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The next action after observing a handle's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// The handle is ready; stop and generate.
    Done,
    /// The provider gave up on the file.
    Failed,
    /// Still processing; sleep and fetch again.
    Wait,
    /// Still processing but the attempt budget is spent.
    Exhausted,
}

/// Pure bookkeeping for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollMachine {
    max_attempts: u32,
    attempts: u32,
}

impl PollMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: 0,
        }
    }

    /// Status fetches made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn record_fetch(&mut self) {
        self.attempts += 1;
    }

    pub fn step(&self, state: JobState) -> PollStep {
        match state {
            JobState::Ready => PollStep::Done,
            JobState::Failed => PollStep::Failed,
            JobState::Pending | JobState::Processing if self.attempts >= self.max_attempts => {
                PollStep::Exhausted
            }
            JobState::Pending | JobState::Processing => PollStep::Wait,
        }
    }
}

/// Pause between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A handle the provider reports as ready, with the number of fetches it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyHandle {
    pub handle: RemoteJobHandle,
    pub polls: u32,
}

/// Waits for uploaded files to become ready under a [`PollPolicy`].
#[derive(Clone)]
pub struct Poller {
    policy: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
    callback: Option<ProgressCallback>,
}

impl Poller {
    pub fn new(policy: PollPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            policy,
            sleeper,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Poll `handle` until it is ready.
    ///
    /// The handle's current state is checked first, so a handle that is
    /// already `Ready` costs no fetch.
    ///
    /// # Errors
    /// - [`AnalysisError::ProcessingFailed`] when the provider marks the file failed
    /// - [`AnalysisError::ProcessingTimeout`] when the attempt budget or the
    ///   optional deadline runs out
    /// - [`AnalysisError::StatusFetch`] when a status fetch itself fails; the
    ///   handle id is kept so the caller can resume
    pub async fn await_ready(
        &self,
        provider: &dyn InferenceProvider,
        handle: RemoteJobHandle,
    ) -> Result<ReadyHandle, AnalysisError> {
        info!(
            "Waiting for {} (max {} polls, every {:?})",
            handle.id, self.policy.max_attempts, self.policy.interval
        );
        let attempts = AtomicU32::new(0);
        let handle_id = handle.id.clone();

        match self.policy.deadline {
            None => self.run(provider, handle, &attempts).await,
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.run(provider, handle, &attempts)).await {
                    Ok(result) => result,
                    Err(_) => {
                        let attempts = attempts.load(Ordering::SeqCst);
                        warn!("{} not ready within {:?}", handle_id, deadline);
                        self.give_up(&handle_id, attempts, "deadline reached");
                        Err(AnalysisError::ProcessingTimeout {
                            handle_id,
                            attempts,
                        })
                    }
                }
            }
        }
    }

    async fn run(
        &self,
        provider: &dyn InferenceProvider,
        mut handle: RemoteJobHandle,
        attempts: &AtomicU32,
    ) -> Result<ReadyHandle, AnalysisError> {
        let mut machine = PollMachine::new(self.policy.max_attempts);

        loop {
            match machine.step(handle.state) {
                PollStep::Done => {
                    info!("{} ready after {} polls", handle.id, machine.attempts());
                    if let Some(cb) = &self.callback {
                        cb.on_ready(&handle, machine.attempts());
                    }
                    return Ok(ReadyHandle {
                        handle,
                        polls: machine.attempts(),
                    });
                }
                PollStep::Failed => {
                    warn!("{} failed remote processing", handle.id);
                    self.give_up(&handle.id, machine.attempts(), "remote processing failed");
                    return Err(AnalysisError::ProcessingFailed {
                        handle_id: handle.id,
                    });
                }
                PollStep::Exhausted => {
                    warn!(
                        "{} still {} after {} polls",
                        handle.id,
                        handle.state,
                        machine.attempts()
                    );
                    self.give_up(&handle.id, machine.attempts(), "poll budget exhausted");
                    return Err(AnalysisError::ProcessingTimeout {
                        handle_id: handle.id,
                        attempts: machine.attempts(),
                    });
                }
                PollStep::Wait => {
                    self.sleeper.sleep(self.policy.interval).await;
                    handle = provider.get_file(&handle.id).await.map_err(|source| {
                        warn!("Status fetch for {} failed: {}", handle.id, source);
                        AnalysisError::StatusFetch {
                            handle_id: handle.id.clone(),
                            source,
                        }
                    })?;
                    machine.record_fetch();
                    attempts.store(machine.attempts(), Ordering::SeqCst);
                    debug!(
                        "Poll {}/{}: {} is {}",
                        machine.attempts(),
                        self.policy.max_attempts,
                        handle.id,
                        handle.state
                    );
                    if let Some(cb) = &self.callback {
                        cb.on_poll(machine.attempts(), self.policy.max_attempts, handle.state);
                    }
                }
            }
        }
    }

    fn give_up(&self, handle_id: &str, attempts: u32, reason: &str) {
        if let Some(cb) = &self.callback {
            cb.on_give_up(handle_id, attempts, reason);
        }
    }
}
