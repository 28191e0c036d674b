//! Workflow state machine.
//!
//! [`transition`] is pure: it maps the current state and one input to the
//! next state and the effects the orchestrator must perform. Every input that
//! does not advance the current step is a no-op, which is what makes
//! duplicate records and signals harmless.

use crate::core::{ActionId, CompletionRecord, CompletionSignal, StageKind, WorkState, WorkflowEvent};
use crate::errors::{ActionLaunchError, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The step a halted workflow stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// The chained first and second stages.
    Chain,
    /// Notification action A.
    ActionA,
    /// The third stage.
    Stage3,
    /// Notification action B.
    ActionB,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain => write!(f, "chain"),
            Self::ActionA => write!(f, "action_a"),
            Self::Stage3 => write!(f, "stage3"),
            Self::ActionB => write!(f, "action_b"),
        }
    }
}

/// Position of a run in the fixed workflow sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    /// Stages 1 and 2 are submitted as a chain.
    ///
    /// A finished record for stage 2 that arrives before stage 1's is held
    /// in `second_outcome` until stage 1 has been observed.
    Chained {
        /// Whether stage 1's successful record has been observed.
        first_done: bool,
        /// Stage 2's terminal state, if observed but not yet acted on.
        second_outcome: Option<WorkState>,
    },
    /// Action A is launched; waiting for its signal.
    AwaitingSignalA,
    /// Stage 3 is submitted; waiting for it to finish.
    AwaitingStage3,
    /// Action B is launched; waiting for its signal.
    AwaitingSignalB,
    /// Every step finished.
    Completed,
    /// The run stopped early and will not advance.
    Halted {
        /// Where the run stopped.
        step: Step,
        /// Why it stopped.
        reason: String,
    },
}

impl WorkflowState {
    /// The state right after the chain is submitted.
    #[must_use]
    pub const fn initial() -> Self {
        Self::Chained {
            first_done: false,
            second_outcome: None,
        }
    }

    /// Returns true if no further input can change the state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Halted { .. })
    }

    /// Returns true if every step finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chained { first_done, .. } => {
                write!(f, "chained(first_done={first_done})")
            }
            Self::AwaitingSignalA => write!(f, "awaiting_signal_a"),
            Self::AwaitingStage3 => write!(f, "awaiting_stage3"),
            Self::AwaitingSignalB => write!(f, "awaiting_signal_b"),
            Self::Completed => write!(f, "completed"),
            Self::Halted { step, .. } => write!(f, "halted({step})"),
        }
    }
}

/// Something the orchestrator observed.
#[derive(Debug, Clone)]
pub enum WorkflowInput {
    /// A status snapshot for one of the stages.
    StageUpdate {
        /// Which stage the snapshot belongs to.
        stage: StageKind,
        /// The snapshot.
        record: CompletionRecord,
    },
    /// A completion signal from a notification action.
    Signal(CompletionSignal),
    /// Launching a notification action failed.
    LaunchFailed(ActionLaunchError),
    /// Submitting stage 3 failed.
    SubmitFailed(WorkflowError),
}

/// An action the orchestrator performs after a transition.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Publish a notice.
    Notify(WorkflowEvent),
    /// Launch a notification action.
    Launch(ActionId),
    /// Submit the retained stage 3 request.
    SubmitThird,
    /// Surface the error that halted the run.
    Report(WorkflowError),
}

fn halt(step: Step, err: WorkflowError) -> (WorkflowState, Vec<Effect>) {
    let state = WorkflowState::Halted {
        step,
        reason: err.to_string(),
    };
    (state, vec![Effect::Report(err)])
}

fn stage_failed(stage: StageKind, state: WorkState) -> WorkflowError {
    WorkflowError::StageFailed { stage, state }
}

fn second_done() -> (WorkflowState, Vec<Effect>) {
    (
        WorkflowState::AwaitingSignalA,
        vec![
            Effect::Notify(WorkflowEvent::stage_done(StageKind::Second)),
            Effect::Launch(ActionId::A),
        ],
    )
}

/// Computes the next state and the effects to perform.
#[must_use]
pub fn transition(state: &WorkflowState, input: &WorkflowInput) -> (WorkflowState, Vec<Effect>) {
    let unchanged = || (state.clone(), Vec::new());

    match (state, input) {
        (_, WorkflowInput::StageUpdate { record, .. }) if !record.is_finished() => unchanged(),

        (
            WorkflowState::Chained {
                first_done: false,
                second_outcome,
            },
            WorkflowInput::StageUpdate {
                stage: StageKind::First,
                record,
            },
        ) => {
            if !record.state.is_success() {
                return halt(Step::Chain, stage_failed(StageKind::First, record.state));
            }
            let notice = Effect::Notify(WorkflowEvent::stage_done(StageKind::First));
            match second_outcome {
                None => (
                    WorkflowState::Chained {
                        first_done: true,
                        second_outcome: None,
                    },
                    vec![notice],
                ),
                Some(held) if held.is_success() => {
                    let (next, mut effects) = second_done();
                    effects.insert(0, notice);
                    (next, effects)
                }
                Some(held) => {
                    let (next, mut effects) = halt(Step::Chain, stage_failed(StageKind::Second, *held));
                    effects.insert(0, notice);
                    (next, effects)
                }
            }
        }

        (
            WorkflowState::Chained {
                first_done,
                second_outcome: None,
            },
            WorkflowInput::StageUpdate {
                stage: StageKind::Second,
                record,
            },
        ) => {
            if !*first_done {
                return (
                    WorkflowState::Chained {
                        first_done: false,
                        second_outcome: Some(record.state),
                    },
                    Vec::new(),
                );
            }
            if record.state.is_success() {
                second_done()
            } else {
                halt(Step::Chain, stage_failed(StageKind::Second, record.state))
            }
        }

        (WorkflowState::AwaitingSignalA, WorkflowInput::Signal(signal)) if signal.action == ActionId::A => (
            WorkflowState::AwaitingStage3,
            vec![
                Effect::Notify(WorkflowEvent::action_executed(ActionId::A, &signal.identity)),
                Effect::SubmitThird,
            ],
        ),

        (WorkflowState::AwaitingSignalA, WorkflowInput::LaunchFailed(err)) if err.action() == ActionId::A => {
            halt(Step::ActionA, err.clone().into())
        }

        (WorkflowState::AwaitingStage3, WorkflowInput::SubmitFailed(err)) => halt(Step::Stage3, err.clone()),

        (
            WorkflowState::AwaitingStage3,
            WorkflowInput::StageUpdate {
                stage: StageKind::Third,
                record,
            },
        ) => {
            if record.state.is_success() {
                (
                    WorkflowState::AwaitingSignalB,
                    vec![
                        Effect::Notify(WorkflowEvent::stage_done(StageKind::Third)),
                        Effect::Launch(ActionId::B),
                    ],
                )
            } else {
                halt(Step::Stage3, stage_failed(StageKind::Third, record.state))
            }
        }

        (WorkflowState::AwaitingSignalB, WorkflowInput::Signal(signal)) if signal.action == ActionId::B => (
            WorkflowState::Completed,
            vec![Effect::Notify(WorkflowEvent::action_executed(ActionId::B, &signal.identity))],
        ),

        (WorkflowState::AwaitingSignalB, WorkflowInput::LaunchFailed(err)) if err.action() == ActionId::B => {
            halt(Step::ActionB, err.clone().into())
        }

        _ => unchanged(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Handle;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn update(stage: StageKind, state: WorkState) -> WorkflowInput {
        WorkflowInput::StageUpdate {
            stage,
            record: CompletionRecord::new(Handle::new(Uuid::new_v4()), state),
        }
    }

    fn signal(action: ActionId) -> WorkflowInput {
        WorkflowInput::Signal(CompletionSignal::new(action, "001"))
    }

    fn messages(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Notify(event) => Some(event.message.clone()),
                _ => None,
            })
            .collect()
    }

    fn launches(effects: &[Effect]) -> Vec<ActionId> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Launch(action) => Some(*action),
                _ => None,
            })
            .collect()
    }

    fn run(inputs: &[WorkflowInput]) -> (WorkflowState, Vec<Effect>) {
        inputs.iter().fold(
            (WorkflowState::initial(), Vec::new()),
            |(state, mut all), input| {
                let (next, effects) = transition(&state, input);
                all.extend(effects);
                (next, all)
            },
        )
    }

    #[test]
    fn test_happy_path() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Succeeded),
            update(StageKind::Second, WorkState::Succeeded),
            signal(ActionId::A),
            update(StageKind::Third, WorkState::Succeeded),
            signal(ActionId::B),
        ]);

        assert_eq!(state, WorkflowState::Completed);
        assert_eq!(
            messages(&effects),
            vec![
                "stage1 done",
                "stage2 done",
                "notification A executed",
                "stage3 done",
                "notification B executed"
            ]
        );
        assert_eq!(launches(&effects), vec![ActionId::A, ActionId::B]);
        assert_eq!(
            effects.iter().filter(|e| matches!(e, Effect::SubmitThird)).count(),
            1
        );
    }

    #[test]
    fn test_non_finished_records_ignored() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Enqueued),
            update(StageKind::First, WorkState::Running),
            update(StageKind::Second, WorkState::Blocked),
        ]);
        assert_eq!(state, WorkflowState::initial());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_second_before_first_is_held() {
        let (state, effects) = run(&[
            update(StageKind::Second, WorkState::Succeeded),
            update(StageKind::First, WorkState::Succeeded),
        ]);

        assert_eq!(state, WorkflowState::AwaitingSignalA);
        assert_eq!(messages(&effects), vec!["stage1 done", "stage2 done"]);
        assert_eq!(launches(&effects), vec![ActionId::A]);
    }

    #[test]
    fn test_duplicate_records_are_noops() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Succeeded),
            update(StageKind::First, WorkState::Succeeded),
            update(StageKind::Second, WorkState::Succeeded),
            update(StageKind::Second, WorkState::Succeeded),
            update(StageKind::First, WorkState::Succeeded),
        ]);

        assert_eq!(state, WorkflowState::AwaitingSignalA);
        assert_eq!(messages(&effects), vec!["stage1 done", "stage2 done"]);
        assert_eq!(launches(&effects), vec![ActionId::A]);
    }

    #[test]
    fn test_duplicate_signal_submits_third_once() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Succeeded),
            update(StageKind::Second, WorkState::Succeeded),
            signal(ActionId::A),
            signal(ActionId::A),
        ]);

        assert_eq!(state, WorkflowState::AwaitingStage3);
        assert_eq!(
            effects.iter().filter(|e| matches!(e, Effect::SubmitThird)).count(),
            1
        );
    }

    #[test]
    fn test_early_signal_ignored() {
        let (state, effects) = run(&[
            signal(ActionId::A),
            signal(ActionId::B),
            update(StageKind::Third, WorkState::Succeeded),
        ]);
        assert_eq!(state, WorkflowState::initial());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_first_failure_halts_once() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Failed),
            update(StageKind::Second, WorkState::Failed),
            update(StageKind::First, WorkState::Failed),
        ]);

        assert!(matches!(state, WorkflowState::Halted { step: Step::Chain, .. }));
        let reports: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Report(err) => Some(err.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(reports.len(), 1);
        assert!(matches!(
            reports[0],
            WorkflowError::StageFailed {
                stage: StageKind::First,
                state: WorkState::Failed
            }
        ));
        assert!(launches(&effects).is_empty());
    }

    #[test]
    fn test_held_second_failure_reported_after_first() {
        let (state, effects) = run(&[
            update(StageKind::Second, WorkState::Cancelled),
            update(StageKind::First, WorkState::Succeeded),
        ]);
        assert!(state.is_terminal());
        assert_eq!(messages(&effects), vec!["stage1 done"]);
        assert!(launches(&effects).is_empty());
    }

    #[test]
    fn test_launch_failure_halts() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Succeeded),
            update(StageKind::Second, WorkState::Succeeded),
            WorkflowInput::LaunchFailed(ActionLaunchError::NotRegistered(ActionId::A)),
            signal(ActionId::A),
        ]);

        assert!(matches!(state, WorkflowState::Halted { step: Step::ActionA, .. }));
        assert!(!effects.iter().any(|e| matches!(e, Effect::SubmitThird)));
    }

    #[test]
    fn test_third_failure_halts_before_b() {
        let (state, effects) = run(&[
            update(StageKind::First, WorkState::Succeeded),
            update(StageKind::Second, WorkState::Succeeded),
            signal(ActionId::A),
            update(StageKind::Third, WorkState::Failed),
        ]);
        assert!(matches!(state, WorkflowState::Halted { step: Step::Stage3, .. }));
        assert_eq!(launches(&effects), vec![ActionId::A]);
    }

    #[test]
    fn test_terminal_states() {
        assert!(WorkflowState::Completed.is_terminal());
        assert!(WorkflowState::Completed.is_completed());
        assert!(!WorkflowState::AwaitingStage3.is_terminal());
        let halted = WorkflowState::Halted {
            step: Step::ActionB,
            reason: "x".into(),
        };
        assert!(halted.is_terminal());
        assert!(!halted.is_completed());
        assert_eq!(halted.to_string(), "halted(action_b)");
    }
}
