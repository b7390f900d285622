//! Caller-side gate: at most one active run per session.
//!
//! The runner happily starts overlapping runs; the session is what keeps the
//! "run" trigger disabled from `start` until `Finished` has been observed.

use tracing::debug;

use super::error::{PackError, PackResult};
use super::runner::{ProcessRun, ProcessRunner, RunEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    runs: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            runs: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a new run may be triggered right now.
    pub fn can_trigger(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Number of runs started in this session.
    pub fn runs_started(&self) -> u32 {
        self.runs
    }

    pub fn start(&mut self, runner: &ProcessRunner, command: &str) -> PackResult<ProcessRun> {
        if !self.can_trigger() {
            return Err(PackError::RunInProgress);
        }
        self.state = SessionState::Running;
        self.runs += 1;
        debug!(run = self.runs, "session trigger disabled");
        Ok(runner.start(command))
    }

    /// Feed every event of the active run through here; `Finished` re-enables
    /// the trigger.
    pub fn observe(&mut self, event: &RunEvent) {
        if event.is_finished() && self.state == SessionState::Running {
            self.state = SessionState::Idle;
            debug!(run = self.runs, "session trigger re-enabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::runner::Interpreter;

    #[test]
    fn fresh_session_is_idle() {
        let s = Session::new();
        assert!(s.can_trigger());
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.runs_started(), 0);
    }

    #[test]
    fn non_terminal_events_keep_trigger_disabled() {
        let mut s = Session::new();
        s.state = SessionState::Running;
        s.observe(&RunEvent::Line("x".into()));
        s.observe(&RunEvent::Drain("y".into()));
        s.observe(&RunEvent::Fault("z".into()));
        assert!(!s.can_trigger());
        s.observe(&RunEvent::Finished { code: Some(1) });
        assert!(s.can_trigger());
    }

    #[tokio::test]
    async fn trigger_disabled_until_finished() {
        let runner = ProcessRunner::new(Interpreter::Direct);
        let mut session = Session::new();

        let mut run = session
            .start(&runner, "packy-definitely-not-a-real-binary")
            .unwrap();
        assert!(!session.can_trigger());
        assert_eq!(
            session
                .start(&runner, "packy-definitely-not-a-real-binary")
                .unwrap_err(),
            PackError::RunInProgress
        );

        while let Some(ev) = run.next_event().await {
            let finished = ev.is_finished();
            session.observe(&ev);
            assert_eq!(session.can_trigger(), finished);
        }
        assert!(session.can_trigger());
        assert_eq!(session.runs_started(), 1);

        let second = session.start(&runner, "packy-definitely-not-a-real-binary");
        assert!(second.is_ok());
        assert_eq!(session.runs_started(), 2);
    }
}
