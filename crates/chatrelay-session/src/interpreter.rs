//! Command dispatch: one interpreter for both console roles.
//!
//! Rather than giving each console its own classify-and-execute loop,
//! there is exactly one: [`dispatch`] parses a console line and routes
//! it to whichever [`CommandTarget`] owns the console — the client
//! session or the server controller. Role legality lives in the target;
//! the interpreter only classifies.
//!
//! Termination is a value, not a side effect: targets answer with
//! [`Flow::Terminate`] and the owning binary decides how to exit. No
//! session code ever calls `std::process::exit`.

use chatrelay_protocol::{Command, Input, parse};

/// What the console loop should do after handling one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input.
    Continue,
    /// Unwind: the owning process should shut down.
    Terminate,
}

/// A console role that commands and messages can be executed against.
pub trait CommandTarget {
    /// Reports one line to the role's display sink.
    fn report(&self, text: &str);

    /// Executes a parsed command, enforcing the role's legality rules.
    /// Illegal or wrong-role commands are reported and leave all state
    /// unchanged.
    async fn apply(&mut self, command: Command) -> Flow;

    /// Handles a non-command line: the client sends it to the server,
    /// the server broadcasts it to every peer.
    async fn forward(&mut self, message: &str) -> Flow;
}

/// Classifies one console line and executes it against `target`.
///
/// Parse failures (bad token counts, bad ports, unknown verbs, empty
/// lines) are reported through the target's sink and never touch state.
pub async fn dispatch<T: CommandTarget>(line: &str, target: &mut T) -> Flow {
    match parse(line) {
        Ok(Input::Message(text)) => target.forward(&text).await,
        Ok(Input::Command(command)) => target.apply(command).await,
        Err(error) => {
            target.report(&format!("ERROR - {error}"));
            Flow::Continue
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Records apply/forward callbacks for inspection.
    #[derive(Default)]
    struct Recorder {
        applied: Vec<Command>,
        forwarded: Vec<String>,
        answer: Option<Flow>,
    }

    impl CommandTarget for Recorder {
        fn report(&self, _text: &str) {}

        async fn apply(&mut self, command: Command) -> Flow {
            self.applied.push(command);
            self.answer.unwrap_or(Flow::Continue)
        }

        async fn forward(&mut self, message: &str) -> Flow {
            self.forwarded.push(message.to_string());
            self.answer.unwrap_or(Flow::Continue)
        }
    }

    /// `report` needs `&self`, so the recording target keeps its report
    /// log behind a mutex.
    #[derive(Default)]
    struct ReportRecorder {
        reports: std::sync::Mutex<Vec<String>>,
    }

    impl CommandTarget for ReportRecorder {
        fn report(&self, text: &str) {
            self.reports.lock().expect("lock").push(text.to_string());
        }

        async fn apply(&mut self, _command: Command) -> Flow {
            Flow::Continue
        }

        async fn forward(&mut self, _message: &str) -> Flow {
            Flow::Continue
        }
    }

    #[tokio::test]
    async fn test_dispatch_message_forwards_verbatim() {
        let mut target = Recorder::default();
        let flow = dispatch("hello there", &mut target).await;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(target.forwarded, vec!["hello there"]);
        assert!(target.applied.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_command_reaches_apply() {
        let mut target = Recorder::default();
        dispatch("#quit", &mut target).await;

        assert_eq!(target.applied, vec![Command::Quit]);
        assert!(target.forwarded.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_propagates_terminate_from_target() {
        let mut target = Recorder {
            answer: Some(Flow::Terminate),
            ..Recorder::default()
        };
        assert_eq!(dispatch("#quit", &mut target).await, Flow::Terminate);
    }

    #[tokio::test]
    async fn test_dispatch_parse_error_is_reported_not_applied() {
        let mut target = ReportRecorder::default();
        let flow = dispatch("#setport sixty", &mut target).await;

        assert_eq!(flow, Flow::Continue);
        let reports = target.reports.lock().expect("lock").clone();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("ERROR - "));
        assert!(reports[0].contains("not an integer"));
    }

    #[tokio::test]
    async fn test_dispatch_empty_line_reports_unrecognized() {
        let mut target = ReportRecorder::default();
        let flow = dispatch("", &mut target).await;

        assert_eq!(flow, Flow::Continue);
        let reports = target.reports.lock().expect("lock").clone();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("not recognized"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command_reports_unrecognized() {
        let mut target = ReportRecorder::default();
        dispatch("#teleport", &mut target).await;

        let reports = target.reports.lock().expect("lock").clone();
        assert!(reports[0].contains("#teleport"));
    }
}
