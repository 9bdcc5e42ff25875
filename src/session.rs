//! Per-view tutoring session state.
//!
//! A [`Session`] owns the chat transcript and the busy flag that keeps a
//! second request from being submitted while one is in flight. The flag is
//! shared by both actions: while a question or a run is pending, neither can
//! be started again. Every `begin_*` that returns `Some` must be paired with
//! the matching `finish_*`, which always clears the flag.

use std::fmt::Display;

use tracing::{info, warn};

use crate::client::{Backend, RunReport, TutorReply};
use crate::console::{Console, LineKind};
use crate::message::Message;

pub const CHAT_CONNECT_ERROR: &str =
    "Sorry, I couldn't connect to the server. Please make sure the backend is running.";
pub const CONSOLE_CONNECT_ERROR: &str =
    "Error: Could not connect to the server. Please make sure the backend is running.";
pub const EMPTY_SOURCE_TEXT: &str = "Please write some code before running.";
pub const RUNNING_TEXT: &str = "Running your code...";

/// The request currently holding the busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Question,
    Run,
}

#[derive(Debug, Default)]
pub struct Session {
    messages: Vec<Message>,
    pending: Option<Pending>,
}

/// Clears the busy flag when dropped, so an abandoned request future still
/// releases it.
struct BusyGuard<'a>(&'a mut Option<Pending>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.0 = None;
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// True while the tutor is working on an answer.
    pub fn typing(&self) -> bool {
        self.pending == Some(Pending::Question)
    }

    /// Record the user's question and take the busy flag.
    ///
    /// Returns the trimmed question to send, or `None` if the input is blank
    /// or another request is in flight.
    pub fn begin_question(&mut self, raw: &str) -> Option<String> {
        let question = raw.trim();
        if question.is_empty() || self.is_busy() {
            return None;
        }

        self.messages.push(Message::user(question));
        self.pending = Some(Pending::Question);
        info!(chars = question.len(), "asking tutor");
        Some(question.to_string())
    }

    /// Record the tutor's reply (or the failure) and release the busy flag.
    pub fn finish_question<E: Display>(&mut self, outcome: Result<TutorReply, E>) {
        self.pending = None;

        let text = match outcome {
            Ok(TutorReply::Answer(answer)) => answer,
            Ok(TutorReply::Error(error)) => {
                warn!(%error, "tutor backend reported an error");
                format!("Sorry, I encountered an error: {}", error)
            }
            Err(e) => {
                warn!(error = %e, "ask_tutor request failed");
                CHAT_CONNECT_ERROR.to_string()
            }
        };
        self.messages.push(Message::ai(text));
    }

    /// Take the busy flag for a run.
    ///
    /// Returns the source to send, or `None` if another request is in flight
    /// or the source is blank (in which case the console says so).
    pub fn begin_run(&mut self, source: &str, console: &mut Console) -> Option<String> {
        if self.is_busy() {
            return None;
        }
        if source.trim().is_empty() {
            console.push_text(LineKind::Info, EMPTY_SOURCE_TEXT);
            return None;
        }

        self.pending = Some(Pending::Run);
        console.push_text(LineKind::Info, RUNNING_TEXT);
        info!(bytes = source.len(), "running code");
        Some(source.to_string())
    }

    /// Show the run result (or the failure) and release the busy flag.
    pub fn finish_run<E: Display>(&mut self, outcome: Result<RunReport, E>, console: &mut Console) {
        self.pending = None;

        match outcome {
            Ok(report) => {
                info!(
                    status = report.status.as_ref().map(|s| s.as_str()).unwrap_or(""),
                    "run finished"
                );
                console.show_report(&report);
            }
            Err(e) => {
                warn!(error = %e, "run_code request failed");
                console.clear();
                console.push_text(LineKind::Error, CONSOLE_CONNECT_ERROR);
            }
        }
    }

    /// Ask a question and wait for the answer. Returns whether a request was
    /// sent.
    pub async fn ask<B: Backend + ?Sized>(&mut self, backend: &B, raw: &str) -> bool {
        let Some(question) = self.begin_question(raw) else {
            return false;
        };

        let outcome = {
            let _guard = BusyGuard(&mut self.pending);
            backend.ask_tutor(&question).await
        };
        self.finish_question(outcome);
        true
    }

    /// Run `source` and wait for the result. Returns whether a request was
    /// sent.
    pub async fn run<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        source: &str,
        console: &mut Console,
    ) -> bool {
        let Some(source) = self.begin_run(source, console) else {
            return false;
        };

        let outcome = {
            let _guard = BusyGuard(&mut self.pending);
            backend.run_code(&source).await
        };
        self.finish_run(outcome, console);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::client::{ClientError, RunStatus};
    use crate::console::{ConsoleEntry, NO_OUTPUT_TEXT};
    use crate::message::Sender;

    enum Canned {
        Answer(&'static str),
        BackendError(&'static str),
        Unreachable,
        Hang,
    }

    struct FakeBackend {
        canned: Canned,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(canned: Canned) -> Self {
            Self {
                canned,
                calls: AtomicUsize::new(0),
            }
        }

        async fn respond(&self) -> Result<&'static str, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.canned {
                Canned::Answer(text) => Ok(text),
                Canned::BackendError(text) => Ok(text),
                Canned::Unreachable => Err(ClientError::Status(StatusCode::BAD_GATEWAY)),
                Canned::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn ask_tutor(&self, _question: &str) -> Result<TutorReply, ClientError> {
            let text = self.respond().await?;
            Ok(match self.canned {
                Canned::BackendError(_) => TutorReply::Error(text.to_string()),
                _ => TutorReply::Answer(text.to_string()),
            })
        }

        async fn run_code(&self, _source_code: &str) -> Result<RunReport, ClientError> {
            let text = self.respond().await?;
            Ok(RunReport {
                status: Some(RunStatus::Accepted),
                stdout: text.to_string(),
                ..RunReport::default()
            })
        }
    }

    #[tokio::test]
    async fn test_ask_appends_question_and_answer() {
        let backend = FakeBackend::new(Canned::Answer("Use a for loop."));
        let mut session = Session::new();

        assert!(session.ask(&backend, "  how do I loop?  ").await);

        let msgs = session.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], Message::user("how do I loop?"));
        assert_eq!(msgs[1], Message::ai("Use a for loop."));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let backend = FakeBackend::new(Canned::Answer("unused"));
        let mut session = Session::new();

        assert!(!session.ask(&backend, "   \n").await);
        assert!(session.messages().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_error_and_transport_error_render_differently() {
        let mut session = Session::new();
        session
            .ask(&FakeBackend::new(Canned::BackendError("Knowledge base is not loaded.")), "q1")
            .await;
        session.ask(&FakeBackend::new(Canned::Unreachable), "q2").await;

        let replies: Vec<&str> = session
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::Ai)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(
            replies,
            vec![
                "Sorry, I encountered an error: Knowledge base is not loaded.",
                CHAT_CONNECT_ERROR,
            ]
        );
        assert!(!session.is_busy());
    }

    #[test]
    fn test_busy_flag_blocks_both_actions() {
        let mut session = Session::new();
        let mut console = Console::new();

        assert_eq!(session.begin_question("first"), Some("first".to_string()));
        assert!(session.typing());
        assert_eq!(session.begin_question("second"), None);
        assert_eq!(session.begin_run("print(1)", &mut console), None);
        assert!(console.is_waiting());

        session.finish_question::<ClientError>(Ok(TutorReply::Answer("ok".to_string())));
        assert!(!session.is_busy());
        assert_eq!(session.messages().len(), 2);

        assert!(session.begin_run("print(1)", &mut console).is_some());
        assert_eq!(session.pending(), Some(Pending::Run));
        assert!(!session.typing());
        assert_eq!(session.begin_question("third"), None);
    }

    #[test]
    fn test_failed_task_still_releases_flag() {
        let mut session = Session::new();
        let mut console = Console::new();

        session.begin_run("print(1)", &mut console);
        session.finish_run::<&str>(Err("task panicked"), &mut console);

        assert!(!session.is_busy());
        assert_eq!(
            console.entries(),
            &[ConsoleEntry::Line {
                kind: LineKind::Error,
                text: CONSOLE_CONNECT_ERROR.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_source_is_not_sent() {
        let backend = FakeBackend::new(Canned::Answer("unused"));
        let mut session = Session::new();
        let mut console = Console::new();

        assert!(!session.run(&backend, "  \n\t", &mut console).await);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            console.entries(),
            &[ConsoleEntry::Line {
                kind: LineKind::Info,
                text: EMPTY_SOURCE_TEXT.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_run_replaces_running_line_with_report() {
        let backend = FakeBackend::new(Canned::Answer(""));
        let mut session = Session::new();
        let mut console = Console::new();

        assert!(session.run(&backend, "x = 1", &mut console).await);

        assert_eq!(
            console.entries(),
            &[
                ConsoleEntry::Status(RunStatus::Accepted),
                ConsoleEntry::Line {
                    kind: LineKind::Info,
                    text: NO_OUTPUT_TEXT.to_string(),
                },
            ]
        );
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_abandoned_request_releases_flag() {
        let backend = FakeBackend::new(Canned::Hang);
        let mut session = Session::new();

        let result =
            tokio::time::timeout(Duration::from_millis(50), session.ask(&backend, "hello")).await;
        assert!(result.is_err());

        assert!(!session.is_busy());
        assert_eq!(session.messages(), &[Message::user("hello")]);
    }
}
