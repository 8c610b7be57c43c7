use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

use crate::simulation::agents::Agent;
use crate::utils::clock::Clock;

pub const CONNECTING_DELAY_MS: u64 = 2_000;
pub const RINGING_DELAY_MS: u64 = 3_000;
pub const TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CallStatus {
    Idle,
    Connecting,
    Ringing,
    InCall,
    Busy,
    Declined,
}

impl CallStatus {
    pub fn is_resolved_without_answer(self) -> bool {
        matches!(self, CallStatus::Busy | CallStatus::Declined)
    }
}

/// How a ringing call ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Answered,
    Busy,
    Declined,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CallSimError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("cannot retry a call that is {0:?}")]
    NotRetryable(CallStatus),
}

/// Decides the outcome each time a ringing phase ends.
pub trait OutcomePolicy: Send {
    fn draw(&mut self) -> CallOutcome;
}

/// Closures work as policies, which keeps deterministic tests short.
impl<F: FnMut() -> CallOutcome + Send> OutcomePolicy for F {
    fn draw(&mut self) -> CallOutcome {
        self()
    }
}

/// 20% busy, 20% declined, 60% answered.
pub struct WeightedOutcome<R = StdRng> {
    rng: R,
}

impl WeightedOutcome<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for WeightedOutcome<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + Send> OutcomePolicy for WeightedOutcome<R> {
    fn draw(&mut self) -> CallOutcome {
        let roll: f64 = self.rng.gen();
        if roll < 0.2 {
            CallOutcome::Busy
        } else if roll < 0.4 {
            CallOutcome::Declined
        } else {
            CallOutcome::Answered
        }
    }
}

/// Plays back a fixed list of outcomes, repeating the last one when exhausted.
pub struct ScriptedOutcome {
    queue: VecDeque<CallOutcome>,
    last: CallOutcome,
}

impl ScriptedOutcome {
    pub fn new(outcomes: impl IntoIterator<Item = CallOutcome>) -> Self {
        Self {
            queue: outcomes.into_iter().collect(),
            last: CallOutcome::Answered,
        }
    }
}

impl Default for ScriptedOutcome {
    /// Every call is answered.
    fn default() -> Self {
        Self::new([CallOutcome::Answered])
    }
}

impl OutcomePolicy for ScriptedOutcome {
    fn draw(&mut self) -> CallOutcome {
        if let Some(next) = self.queue.pop_front() {
            self.last = next;
        }
        self.last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Ring,
    Resolve,
    Tick,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    due_ms: u64,
    kind: TimerKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLine {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Subtitle when idle, call progress when this agent is on the line.
    pub display: String,
    pub active: bool,
    pub disabled: bool,
    pub can_retry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSnapshot {
    pub active_agent_id: Option<String>,
    pub status: CallStatus,
    pub elapsed_seconds: u64,
    pub agents: Vec<AgentLine>,
}

/// The demo call panel: one simulated call across all agents.
///
/// Timers are virtual. At most one is pending, and every public operation
/// first fires whatever has come due on the clock, then applies itself.
/// A transition replaces or clears the pending slot, so a hang-up or a
/// new call can never be followed by a stale timer from the old one.
pub struct CallSimulator {
    agents: Vec<Agent>,
    clock: Arc<dyn Clock>,
    outcomes: Box<dyn OutcomePolicy>,
    active: Option<String>,
    status: CallStatus,
    elapsed_seconds: u64,
    timer: Option<Timer>,
}

impl CallSimulator {
    pub fn new(agents: Vec<Agent>, clock: Arc<dyn Clock>, outcomes: Box<dyn OutcomePolicy>) -> Self {
        Self {
            agents,
            clock,
            outcomes,
            active: None,
            status: CallStatus::Idle,
            elapsed_seconds: 0,
            timer: None,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn start_call(&mut self, agent_id: &str) -> Result<CallSnapshot, CallSimError> {
        self.advance();
        if !self.agents.iter().any(|a| a.id == agent_id) {
            return Err(CallSimError::UnknownAgent(agent_id.to_string()));
        }
        let already_on_line =
            self.active.as_deref() == Some(agent_id) && self.status != CallStatus::Idle;
        if !already_on_line {
            if let Some(previous) = self.active.as_deref().filter(|p| *p != agent_id) {
                tracing::debug!("Demo call to {} replaced by call to {}", previous, agent_id);
            }
            self.connect(agent_id.to_string());
        }
        Ok(self.build_snapshot())
    }

    pub fn hang_up(&mut self) -> CallSnapshot {
        self.advance();
        self.active = None;
        self.status = CallStatus::Idle;
        self.elapsed_seconds = 0;
        self.timer = None;
        self.build_snapshot()
    }

    pub fn retry(&mut self) -> Result<CallSnapshot, CallSimError> {
        self.advance();
        match (self.status.is_resolved_without_answer(), self.active.clone()) {
            (true, Some(agent_id)) => {
                self.connect(agent_id);
                Ok(self.build_snapshot())
            }
            _ => Err(CallSimError::NotRetryable(self.status)),
        }
    }

    pub fn snapshot(&mut self) -> CallSnapshot {
        self.advance();
        self.build_snapshot()
    }

    /// Fires every timer due at or before the current clock reading.
    ///
    /// Follow-up timers are scheduled from the due time of the timer that
    /// fired, not from "now", so a late read lands on the same state a real
    /// timer loop would have reached. Pending ticks are applied in one step.
    pub fn advance(&mut self) {
        let now = self.clock.epoch_ms();
        while let Some(timer) = self.timer.filter(|t| t.due_ms <= now) {
            self.fire(timer, now);
        }
    }

    fn connect(&mut self, agent_id: String) {
        self.active = Some(agent_id);
        self.status = CallStatus::Connecting;
        self.elapsed_seconds = 0;
        self.timer = Some(Timer {
            due_ms: self.clock.epoch_ms() + CONNECTING_DELAY_MS,
            kind: TimerKind::Ring,
        });
    }

    fn fire(&mut self, timer: Timer, now: u64) {
        match timer.kind {
            TimerKind::Ring => {
                self.status = CallStatus::Ringing;
                self.timer = Some(Timer {
                    due_ms: timer.due_ms + RINGING_DELAY_MS,
                    kind: TimerKind::Resolve,
                });
            }
            TimerKind::Resolve => {
                let outcome = self.outcomes.draw();
                tracing::debug!("Demo call resolved as {:?}", outcome);
                match outcome {
                    CallOutcome::Answered => {
                        self.status = CallStatus::InCall;
                        self.elapsed_seconds = 0;
                        self.timer = Some(Timer {
                            due_ms: timer.due_ms + TICK_MS,
                            kind: TimerKind::Tick,
                        });
                    }
                    CallOutcome::Busy => {
                        self.status = CallStatus::Busy;
                        self.timer = None;
                    }
                    CallOutcome::Declined => {
                        self.status = CallStatus::Declined;
                        self.timer = None;
                    }
                }
            }
            TimerKind::Tick => {
                let ticks = (now - timer.due_ms) / TICK_MS + 1;
                self.elapsed_seconds += ticks;
                self.timer = Some(Timer {
                    due_ms: timer.due_ms + ticks * TICK_MS,
                    kind: TimerKind::Tick,
                });
            }
        }
    }

    fn build_snapshot(&self) -> CallSnapshot {
        let agents = self
            .agents
            .iter()
            .map(|agent| {
                let active = self.active.as_deref() == Some(agent.id.as_str());
                let display = if active {
                    self.status_line()
                } else {
                    agent.subtitle.clone()
                };
                AgentLine {
                    id: agent.id.clone(),
                    name: agent.name.clone(),
                    avatar: agent.avatar.clone(),
                    display,
                    active,
                    disabled: self.active.is_some() && !active,
                    can_retry: active && self.status.is_resolved_without_answer(),
                }
            })
            .collect();
        CallSnapshot {
            active_agent_id: self.active.clone(),
            status: self.status,
            elapsed_seconds: self.elapsed_seconds,
            agents,
        }
    }

    fn status_line(&self) -> String {
        match self.status {
            CallStatus::Idle => String::new(),
            CallStatus::Connecting => "Connecting...".to_string(),
            CallStatus::Ringing => "Ringing...".to_string(),
            CallStatus::InCall => format_elapsed(self.elapsed_seconds),
            CallStatus::Busy => "Agent busy".to_string(),
            CallStatus::Declined => "Call declined".to_string(),
        }
    }
}

/// `mm:ss`, minutes keep growing past 59.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
