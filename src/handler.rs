use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Answered(outcome) => app.on_answered(outcome),
        AppEvent::RunFinished(outcome) => app.on_run_finished(outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('r') => {
                app.run_code();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => match app.focus {
            FocusPane::Editor => handle_editor_editing(app, key),
            FocusPane::Chat => handle_chat_editing(app, key),
            FocusPane::Console => app.input_mode = InputMode::Normal,
        },
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Tab to switch focus
        KeyCode::Tab => app.focus = app.focus.next(),

        // Start editing the focused pane
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.focus != FocusPane::Console {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Char('e') => {
            app.focus = FocusPane::Editor;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('a') => {
            app.focus = FocusPane::Chat;
            app.input_mode = InputMode::Editing;
        }

        // Code actions
        KeyCode::Char('r') => app.run_code(),
        KeyCode::Char('R') => app.reset_editor(),

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_editor_editing(app: &mut App, key: KeyEvent) {
    let editor = &mut app.editor;
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => editor.insert_newline(),
        KeyCode::Tab => editor.insert_tab(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Delete => editor.delete(),
        KeyCode::Left => editor.move_left(),
        KeyCode::Right => editor.move_right(),
        KeyCode::Up => editor.move_up(),
        KeyCode::Down => editor.move_down(),
        KeyCode::Home => editor.move_home(),
        KeyCode::End => editor.move_end(),
        KeyCode::Char(c) => editor.insert_char(c),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        // Alt/Shift+Enter adds a line break, plain Enter sends
        KeyCode::Enter if key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) => {
            app.chat_insert('\n');
        }
        KeyCode::Enter => app.send_question(),
        KeyCode::Backspace => app.chat_backspace(),
        KeyCode::Delete => app.chat_delete(),
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => app.chat_insert(c),
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match app.focus {
        FocusPane::Editor => {
            app.input_mode = InputMode::Editing;
            app.editor.insert_str(text);
        }
        FocusPane::Chat => {
            app.input_mode = InputMode::Editing;
            for c in text.chars().filter(|&c| c != '\r') {
                app.chat_insert(c);
            }
        }
        FocusPane::Console => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pytutor::{
        Backend, ClientError, Config, ConsoleEntry, LineKind, Message, RunReport, RunStatus,
        TutorReply,
    };
    use tokio::sync::mpsc;

    use super::*;

    struct EchoBackend;

    #[async_trait]
    impl Backend for EchoBackend {
        async fn ask_tutor(&self, question: &str) -> Result<TutorReply, ClientError> {
            Ok(TutorReply::Answer(format!("you asked: {}", question)))
        }

        async fn run_code(&self, source_code: &str) -> Result<RunReport, ClientError> {
            Ok(RunReport {
                status: Some(RunStatus::Accepted),
                stdout: source_code.to_string(),
                ..RunReport::default()
            })
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn new_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(&Config::default(), Arc::new(EchoBackend), tx);
        (app, rx)
    }

    /// Feed the next background result back into the app.
    async fn deliver(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = rx.recv().await.expect("request outcome event");
        handle_event(app, event);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (mut app, mut rx) = new_app();

        handle_event(&mut app, key(KeyCode::Char('a')));
        for c in "hi".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Enter));

        assert!(app.chat_input.is_empty());
        assert!(app.session.typing());

        // A second Enter while busy sends nothing.
        handle_event(&mut app, key(KeyCode::Char('x')));
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.chat_input, "x");

        deliver(&mut app, &mut rx).await;
        assert!(!app.session.is_busy());
        assert_eq!(
            app.session.messages(),
            &[Message::user("hi"), Message::ai("you asked: hi")]
        );
    }

    #[tokio::test]
    async fn test_run_and_reset() {
        let (mut app, mut rx) = new_app();

        handle_event(&mut app, key(KeyCode::Char('r')));
        assert!(app.session.is_busy());
        deliver(&mut app, &mut rx).await;

        assert_eq!(
            app.console.entries()[1],
            ConsoleEntry::Line {
                kind: LineKind::Stdout,
                text: "print(\"Hello, world!\")".to_string(),
            }
        );

        app.editor.set_text("x = 1");
        handle_event(&mut app, key(KeyCode::Char('R')));
        assert_eq!(app.editor.text(), Config::default().default_code);
        assert!(app.console.is_waiting());
    }

    #[test]
    fn test_alt_enter_inserts_newline() {
        let (mut app, _rx) = new_app();
        app.focus = FocusPane::Chat;
        app.input_mode = InputMode::Editing;

        handle_event(&mut app, key(KeyCode::Char('a')));
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT)),
        );
        handle_event(&mut app, key(KeyCode::Char('b')));

        assert_eq!(app.chat_input, "a\nb");
        assert!(!app.session.is_busy());
    }

    #[test]
    fn test_chat_input_edits_multibyte_text() {
        let (mut app, _rx) = new_app();
        handle_event(&mut app, key(KeyCode::Char('a')));
        for c in "ñandú".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Left));
        handle_event(&mut app, key(KeyCode::Backspace));
        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));

        assert_eq!(app.chat_input, "anú");
        assert_eq!(app.chat_cursor, 0);
    }

    #[test]
    fn test_paste_into_editor() {
        let (mut app, _rx) = new_app();
        app.editor.set_text("");
        handle_event(&mut app, AppEvent::Paste("a = 1\r\nprint(a)".to_string()));
        assert_eq!(app.editor.text(), "a = 1\nprint(a)");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_failed_request_event_releases_flag() {
        let (mut app, _rx) = new_app();
        app.chat_input = "why?".to_string();
        assert!(app.session.begin_question(&app.chat_input).is_some());

        handle_event(&mut app, AppEvent::Answered(Err("task panicked".to_string())));
        assert!(!app.session.is_busy());
        assert_eq!(
            app.session.messages().last(),
            Some(&Message::ai(pytutor::session::CHAT_CONNECT_ERROR))
        );
    }
}
