//! Session phases and the transition table

use std::fmt;

use crate::command::CommandKind;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the wake phrase
    AwaitingWake,
    /// Woken, waiting for photo/explore/exit
    AwaitingCommand,
    /// Said goodbye; terminal
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingWake => "awaiting_wake",
            Self::AwaitingCommand => "awaiting_command",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What the session does in response to a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Say nothing
    Silent,
    /// Speak the command menu
    Menu,
    /// Ask the user to repeat the wake phrase
    NotHeard,
    /// Ask the user to repeat the command
    NotUnderstood,
    /// Run the family photo flow
    Photo,
    /// Run the scene description flow
    Explore,
    /// Say goodbye
    Farewell,
}

/// The transition table
///
/// Pure: returns the reaction to perform and the phase to enter afterwards.
/// `Terminated` absorbs every input.
#[must_use]
pub const fn transition(phase: Phase, kind: CommandKind) -> (Reaction, Phase) {
    use CommandKind as K;
    use Phase as P;

    match (phase, kind) {
        (P::AwaitingWake, K::Wake) => (Reaction::Menu, P::AwaitingCommand),
        (P::AwaitingWake, K::Empty) => (Reaction::Silent, P::AwaitingWake),
        (P::AwaitingWake, K::Explore | K::Photo | K::Exit | K::Unrecognized) => {
            (Reaction::NotHeard, P::AwaitingWake)
        }

        (P::AwaitingCommand, K::Photo) => (Reaction::Photo, P::AwaitingCommand),
        (P::AwaitingCommand, K::Explore) => (Reaction::Explore, P::AwaitingCommand),
        (P::AwaitingCommand, K::Exit) => (Reaction::Farewell, P::Terminated),
        (P::AwaitingCommand, K::Empty) => (Reaction::Silent, P::AwaitingCommand),
        (P::AwaitingCommand, K::Unrecognized) => (Reaction::NotUnderstood, P::AwaitingCommand),
        // Repeating the wake phrase while awake re-reads the menu
        (P::AwaitingCommand, K::Wake) => (Reaction::Menu, P::AwaitingCommand),

        (P::Terminated, _) => (Reaction::Silent, P::Terminated),
    }
}

/// Mutable session state, changed only through [`SessionState::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    phase: Phase,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::AwaitingWake,
        }
    }
}

impl SessionState {
    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// True once the session has said goodbye
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Look up the reaction for `kind` without changing phase
    #[must_use]
    pub const fn react(&self, kind: CommandKind) -> (Reaction, Phase) {
        transition(self.phase, kind)
    }

    /// Enter `next`; ignored once terminated
    pub(crate) fn apply(&mut self, next: Phase) {
        if self.phase == Phase::Terminated {
            return;
        }
        if self.phase != next {
            tracing::debug!(from = %self.phase, to = %next, "phase changed");
        }
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [CommandKind; 6] = [
        CommandKind::Wake,
        CommandKind::Explore,
        CommandKind::Photo,
        CommandKind::Exit,
        CommandKind::Unrecognized,
        CommandKind::Empty,
    ];

    #[test]
    fn test_only_wake_leaves_awaiting_wake() {
        for kind in ALL_KINDS {
            let (_, next) = transition(Phase::AwaitingWake, kind);
            if kind == CommandKind::Wake {
                assert_eq!(next, Phase::AwaitingCommand);
            } else {
                assert_eq!(next, Phase::AwaitingWake, "{kind} left AwaitingWake");
            }
        }
    }

    #[test]
    fn test_only_exit_terminates() {
        for kind in ALL_KINDS {
            let (_, next) = transition(Phase::AwaitingCommand, kind);
            if kind == CommandKind::Exit {
                assert_eq!(next, Phase::Terminated);
            } else {
                assert_eq!(next, Phase::AwaitingCommand, "{kind} left AwaitingCommand");
            }
        }
    }

    #[test]
    fn test_terminated_absorbs() {
        for kind in ALL_KINDS {
            assert_eq!(
                transition(Phase::Terminated, kind),
                (Reaction::Silent, Phase::Terminated)
            );
        }
    }

    #[test]
    fn test_silence_is_silent() {
        assert_eq!(
            transition(Phase::AwaitingWake, CommandKind::Empty).0,
            Reaction::Silent
        );
        assert_eq!(
            transition(Phase::AwaitingCommand, CommandKind::Empty).0,
            Reaction::Silent
        );
        assert_eq!(
            transition(Phase::AwaitingWake, CommandKind::Unrecognized).0,
            Reaction::NotHeard
        );
        assert_eq!(
            transition(Phase::AwaitingCommand, CommandKind::Unrecognized).0,
            Reaction::NotUnderstood
        );
    }

    #[test]
    fn test_state_cannot_leave_terminated() {
        let mut state = SessionState::default();
        assert_eq!(state.phase(), Phase::AwaitingWake);

        state.apply(Phase::Terminated);
        state.apply(Phase::AwaitingCommand);
        assert!(state.is_terminated());
    }
}
