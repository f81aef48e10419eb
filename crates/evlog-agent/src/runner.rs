//! Agent runners
//!
//! [`AgentRunner`] drives an agent on a dedicated, named OS thread with an
//! [`IdleStrategy`] deciding how to wait when there is no work.
//! [`AsyncAgentRunner`] does the same as a tokio task for hosts that already
//! run a runtime. Both call [`Agent::on_close`] after the last `do_work`, so
//! the reader's final flush happens before the ring buffer can be released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::error::AgentResult;

/// How a runner waits between unproductive work cycles
pub trait IdleStrategy: Send {
    /// Called after every `do_work` with the work count it returned
    fn idle(&mut self, work_count: usize);

    /// Forget any accumulated backoff
    fn reset(&mut self) {}
}

impl<I: IdleStrategy + ?Sized> IdleStrategy for Box<I> {
    fn idle(&mut self, work_count: usize) {
        (**self).idle(work_count)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackoffState {
    Spinning,
    Yielding,
    Parking,
}

/// Spin, then yield, then park with exponentially growing park time
///
/// Any productive cycle resets to spinning. Parking uses
/// `thread::park_timeout`, so [`AgentRunner::close`] can wake it at once.
#[derive(Debug, Clone)]
pub struct BackoffIdle {
    max_spins: u32,
    max_yields: u32,
    min_park: Duration,
    max_park: Duration,
    state: BackoffState,
    spins: u32,
    yields: u32,
    park: Duration,
}

impl BackoffIdle {
    pub fn new(max_spins: u32, max_yields: u32, min_park: Duration, max_park: Duration) -> Self {
        Self {
            max_spins,
            max_yields,
            min_park,
            max_park: max_park.max(min_park),
            state: BackoffState::Spinning,
            spins: 0,
            yields: 0,
            park: min_park,
        }
    }

    /// Current park duration (grows while idle)
    pub fn park_duration(&self) -> Duration {
        self.park
    }
}

impl Default for BackoffIdle {
    fn default() -> Self {
        Self::new(
            10,
            5,
            Duration::from_micros(1),
            Duration::from_millis(1),
        )
    }
}

impl IdleStrategy for BackoffIdle {
    fn idle(&mut self, work_count: usize) {
        if work_count > 0 {
            self.reset();
            return;
        }

        match self.state {
            BackoffState::Spinning => {
                std::hint::spin_loop();
                self.spins += 1;
                if self.spins >= self.max_spins {
                    self.state = BackoffState::Yielding;
                }
            }
            BackoffState::Yielding => {
                thread::yield_now();
                self.yields += 1;
                if self.yields >= self.max_yields {
                    self.state = BackoffState::Parking;
                }
            }
            BackoffState::Parking => {
                thread::park_timeout(self.park);
                self.park = (self.park * 2).min(self.max_park);
            }
        }
    }

    fn reset(&mut self) {
        self.state = BackoffState::Spinning;
        self.spins = 0;
        self.yields = 0;
        self.park = self.min_park;
    }
}

/// Park for a fixed period whenever a cycle did no work
#[derive(Debug, Clone, Copy)]
pub struct SleepingIdle {
    period: Duration,
}

impl SleepingIdle {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl IdleStrategy for SleepingIdle {
    fn idle(&mut self, work_count: usize) {
        if work_count == 0 {
            thread::park_timeout(self.period);
        }
    }
}

/// Runs an agent on a dedicated thread until closed
pub struct AgentRunner {
    role_name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AgentRunner {
    /// Spawn a thread named after the agent's role and start the duty cycle
    pub fn start<A, I>(agent: A, idle: I) -> AgentResult<Self>
    where
        A: Agent + 'static,
        I: IdleStrategy + 'static,
    {
        let role_name = agent.role_name().to_string();
        let running = Arc::new(AtomicBool::new(true));

        let handle = thread::Builder::new().name(role_name.clone()).spawn({
            let running = Arc::clone(&running);
            move || run_duty_cycle(agent, idle, running)
        })?;

        Ok(Self {
            role_name,
            running,
            handle: Some(handle),
        })
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the duty cycle and wait for `on_close` to complete
    ///
    /// Idempotent.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!(role = %self.role_name, "Agent thread panicked");
            }
        }
    }
}

impl Drop for AgentRunner {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_duty_cycle<A: Agent, I: IdleStrategy>(mut agent: A, mut idle: I, running: Arc<AtomicBool>) {
    info!(role = agent.role_name(), "Agent started");

    while running.load(Ordering::Acquire) {
        let work_count = agent.do_work();
        idle.idle(work_count);
    }

    debug!(role = agent.role_name(), "Agent stopping");
    agent.on_close();
    info!(role = agent.role_name(), "Agent closed");
}

/// Runs an agent as a tokio task until closed
pub struct AsyncAgentRunner {
    shutdown_tx: broadcast::Sender<()>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl AsyncAgentRunner {
    /// Spawn the agent on the current runtime
    ///
    /// The task sleeps for `idle_period` after a cycle with no work and
    /// yields after a productive one.
    pub fn spawn<A>(agent: A, idle_period: Duration) -> Self
    where
        A: Agent + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_async(agent, idle_period, shutdown_rx));

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Signal shutdown and wait for the final flush
    pub async fn close(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Agent task failed");
            }
        }
    }
}

impl Drop for AsyncAgentRunner {
    fn drop(&mut self) {
        // The task still runs `on_close` after this signal
        let _ = self.shutdown_tx.send(());
    }
}

async fn run_async<A: Agent>(
    mut agent: A,
    idle_period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(role = agent.role_name(), "Agent task started");

    loop {
        let work_count = agent.do_work();
        if work_count == 0 {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(idle_period) => {}
            }
        } else {
            match shutdown_rx.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => tokio::task::yield_now().await,
                _ => break,
            }
        }
    }

    agent.on_close();
    info!(role = agent.role_name(), "Agent task closed");
}
