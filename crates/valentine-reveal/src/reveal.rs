use std::time::{Duration, Instant};

use serde::Serialize;

/// Length of the full-screen takeover before acceptance is forced.
pub const VIRUS_DURATION: Duration = Duration::from_secs(3);

/// Where the prompt currently is. Exactly one stage is active at a time, so
/// two modals can never be open together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    FirstDecline,
    SecondDecline,
    VirusEffect { started_at: Instant },
    Celebrated,
}

/// `RevealState` without its data; what gets serialized and matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    FirstDecline,
    SecondDecline,
    VirusEffect,
    Celebrated,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Idle,
        Stage::FirstDecline,
        Stage::SecondDecline,
        Stage::VirusEffect,
        Stage::Celebrated,
    ];

    /// Target of a user event, or `None` when the event is not offered here.
    pub fn on(self, event: RevealEvent) -> Option<Stage> {
        match (self, event) {
            (Stage::Idle | Stage::FirstDecline | Stage::SecondDecline, RevealEvent::Accept) => {
                Some(Stage::Celebrated)
            }
            (Stage::Idle, RevealEvent::Decline) => Some(Stage::FirstDecline),
            (Stage::FirstDecline, RevealEvent::Decline) => Some(Stage::SecondDecline),
            (Stage::SecondDecline, RevealEvent::Decline) => Some(Stage::VirusEffect),
            // The takeover has no buttons and there is nothing after the celebration.
            (Stage::VirusEffect | Stage::Celebrated, _) => None,
        }
    }

    pub fn on_timeout(self) -> Option<Stage> {
        match self {
            Stage::VirusEffect => Some(Stage::Celebrated),
            _ => None,
        }
    }
}

impl RevealState {
    pub fn stage(&self) -> Stage {
        match self {
            RevealState::Idle => Stage::Idle,
            RevealState::FirstDecline => Stage::FirstDecline,
            RevealState::SecondDecline => Stage::SecondDecline,
            RevealState::VirusEffect { .. } => Stage::VirusEffect,
            RevealState::Celebrated => Stage::Celebrated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealEvent {
    Accept,
    Decline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Modal {
    FirstDecline,
    SecondDecline,
}

/// Presentational work requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    ShowModal { modal: Modal },
    HideModal,
    StartTakeover,
    StartTimer { millis: u64 },
    CancelTimer,
    EndTakeover,
    Celebrate,
    Particles,
}

/// Presentational work for moving from one stage to the next: tear down
/// whatever `from` put up, then bring up `to`.
fn transition_effects(from: Stage, to: Stage, virus_duration: Duration) -> Vec<Effect> {
    let mut effects = Vec::new();
    match from {
        Stage::FirstDecline | Stage::SecondDecline => effects.push(Effect::HideModal),
        Stage::VirusEffect => effects.push(Effect::EndTakeover),
        Stage::Idle | Stage::Celebrated => {}
    }
    match to {
        Stage::FirstDecline => effects.push(Effect::ShowModal { modal: Modal::FirstDecline }),
        Stage::SecondDecline => effects.push(Effect::ShowModal { modal: Modal::SecondDecline }),
        Stage::VirusEffect => {
            effects.push(Effect::StartTakeover);
            effects.push(Effect::StartTimer {
                millis: virus_duration.as_millis() as u64,
            });
        }
        Stage::Celebrated => {
            effects.push(Effect::Celebrate);
            effects.push(Effect::Particles);
        }
        Stage::Idle => {}
    }
    effects
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved {
        from: Stage,
        to: Stage,
        effects: Vec<Effect>,
    },
    Ignored,
}

impl Outcome {
    pub fn target(&self) -> Option<Stage> {
        match self {
            Outcome::Moved { to, .. } => Some(*to),
            Outcome::Ignored => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RevealMachine {
    state: RevealState,
    virus_duration: Duration,
}

impl Default for RevealMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RevealMachine {
    pub fn new() -> Self {
        Self::with_virus_duration(VIRUS_DURATION)
    }

    pub fn with_virus_duration(virus_duration: Duration) -> Self {
        Self {
            state: RevealState::Idle,
            virus_duration,
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn is_celebrated(&self) -> bool {
        self.state == RevealState::Celebrated
    }

    pub fn accept(&mut self, now: Instant) -> Outcome {
        self.handle(RevealEvent::Accept, now)
    }

    pub fn decline(&mut self, now: Instant) -> Outcome {
        self.handle(RevealEvent::Decline, now)
    }

    pub fn handle(&mut self, event: RevealEvent, now: Instant) -> Outcome {
        let from = self.stage();
        let Some(to) = from.on(event) else {
            return Outcome::Ignored;
        };

        let effects = transition_effects(from, to, self.virus_duration);
        self.state = match to {
            Stage::Idle => RevealState::Idle,
            Stage::FirstDecline => RevealState::FirstDecline,
            Stage::SecondDecline => RevealState::SecondDecline,
            Stage::VirusEffect => RevealState::VirusEffect { started_at: now },
            Stage::Celebrated => RevealState::Celebrated,
        };

        Outcome::Moved { from, to, effects }
    }

    /// Time left in the takeover, if one is running.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            RevealState::VirusEffect { started_at } => {
                Some(self.virus_duration.saturating_sub(now.saturating_duration_since(started_at)))
            }
            _ => None,
        }
    }

    /// Ends the takeover once its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Outcome {
        match self.remaining(now) {
            Some(left) if left.is_zero() => {
                self.state = RevealState::Celebrated;
                Outcome::Moved {
                    from: Stage::VirusEffect,
                    to: Stage::Celebrated,
                    effects: transition_effects(
                        Stage::VirusEffect,
                        Stage::Celebrated,
                        self.virus_duration,
                    ),
                }
            }
            _ => Outcome::Ignored,
        }
    }

    /// Effects needed when the prompt is torn down mid-flow.
    pub fn teardown(&mut self) -> Vec<Effect> {
        let effects = match self.state {
            RevealState::VirusEffect { .. } => vec![Effect::CancelTimer, Effect::EndTakeover],
            RevealState::FirstDecline | RevealState::SecondDecline => vec![Effect::HideModal],
            RevealState::Idle | RevealState::Celebrated => Vec::new(),
        };
        self.state = RevealState::Idle;
        effects
    }
}

// -- Choreography descriptor --

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub to: Stage,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub stage: Stage,
    pub on_accept: Option<Transition>,
    pub on_decline: Option<Transition>,
    pub on_timeout: Option<Transition>,
}

/// The transition table, with the effects of every edge, in a form the
/// browser can follow. Contains no copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choreography {
    pub initial: Stage,
    pub stages: Vec<StageDescriptor>,
    pub takeover_ms: u64,
}

impl Choreography {
    pub fn new(virus_duration: Duration) -> Self {
        let edge = |from: Stage, to: Option<Stage>| {
            to.map(|to| Transition {
                to,
                effects: transition_effects(from, to, virus_duration),
            })
        };
        let stages = Stage::ALL
            .into_iter()
            .map(|stage| StageDescriptor {
                stage,
                on_accept: edge(stage, stage.on(RevealEvent::Accept)),
                on_decline: edge(stage, stage.on(RevealEvent::Decline)),
                on_timeout: edge(stage, stage.on_timeout()),
            })
            .collect();
        Self {
            initial: Stage::Idle,
            stages,
            takeover_ms: virus_duration.as_millis() as u64,
        }
    }
}

impl Default for Choreography {
    fn default() -> Self {
        Self::new(VIRUS_DURATION)
    }
}
