use std::future::Future;
use std::sync::Arc;

use pytutor::editor::char_to_byte_index;
use pytutor::{Backend, ClientError, Config, Console, Editor, Session};
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Editor,
    Console,
    Chat,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Editor => FocusPane::Console,
            FocusPane::Console => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Editor,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Code pane
    pub editor: Editor,
    pub editor_scroll: u16,
    pub editor_hscroll: u16, // first visible column, in chars

    // Run console
    pub console: Console,
    pub console_scroll: u16,
    pub console_follow: bool, // keep the newest output in view

    // Chat
    pub session: Session,
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input, in chars
    pub chat_scroll: u16,
    pub chat_follow: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub backend_url: String,
    backend: Arc<dyn Backend>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, backend: Arc<dyn Backend>, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Editor,

            editor: Editor::new(&config.default_code),
            editor_scroll: 0,
            editor_hscroll: 0,

            console: Console::new(),
            console_scroll: 0,
            console_follow: true,

            session: Session::new(),
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_follow: true,

            animation_frame: 0,

            backend_url: config.backend_url.clone(),
            backend,
            events,
        }
    }

    /// Send the chat input to the tutor in the background.
    pub fn send_question(&mut self) {
        let Some(question) = self.session.begin_question(&self.chat_input) else {
            return;
        };

        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_follow = true;

        let backend = Arc::clone(&self.backend);
        spawn_request(
            self.events.clone(),
            async move { backend.ask_tutor(&question).await },
            AppEvent::Answered,
        );
    }

    /// Send the editor contents to the backend in the background.
    pub fn run_code(&mut self) {
        let source = self.editor.text();
        self.console_follow = true;
        let Some(source) = self.session.begin_run(&source, &mut self.console) else {
            return;
        };

        let backend = Arc::clone(&self.backend);
        spawn_request(
            self.events.clone(),
            async move { backend.run_code(&source).await },
            AppEvent::RunFinished,
        );
    }

    pub fn reset_editor(&mut self) {
        self.editor.reset();
        self.editor_scroll = 0;
        self.editor_hscroll = 0;
        self.console.clear();
        self.console_scroll = 0;
    }

    pub fn on_answered(&mut self, outcome: Result<pytutor::TutorReply, String>) {
        self.session.finish_question(outcome);
        self.chat_follow = true;
    }

    pub fn on_run_finished(&mut self, outcome: Result<pytutor::RunReport, String>) {
        self.session.finish_run(outcome, &mut self.console);
        self.console_scroll = 0;
        self.console_follow = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Console => {
                self.console_follow = false;
                self.console_scroll = self.console_scroll.saturating_add(lines);
            }
            FocusPane::Chat => {
                self.chat_follow = false;
                self.chat_scroll = self.chat_scroll.saturating_add(lines);
            }
            FocusPane::Editor => {
                for _ in 0..lines {
                    self.editor.move_down();
                }
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Console => {
                self.console_follow = false;
                self.console_scroll = self.console_scroll.saturating_sub(lines);
            }
            FocusPane::Chat => {
                self.chat_follow = false;
                self.chat_scroll = self.chat_scroll.saturating_sub(lines);
            }
            FocusPane::Editor => {
                for _ in 0..lines {
                    self.editor.move_up();
                }
            }
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        match self.focus {
            FocusPane::Console => self.console_follow = true,
            FocusPane::Chat => self.chat_follow = true,
            FocusPane::Editor => {}
        }
    }

    pub fn scroll_to_top(&mut self) {
        match self.focus {
            FocusPane::Console => {
                self.console_follow = false;
                self.console_scroll = 0;
            }
            FocusPane::Chat => {
                self.chat_follow = false;
                self.chat_scroll = 0;
            }
            FocusPane::Editor => {}
        }
    }

    // Chat input editing
    pub fn chat_insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.chat_input, self.chat_cursor);
        self.chat_input.insert(byte_pos, c);
        self.chat_cursor += 1;
    }

    pub fn chat_backspace(&mut self) {
        if self.chat_cursor > 0 {
            self.chat_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.chat_input, self.chat_cursor);
            self.chat_input.remove(byte_pos);
        }
    }

    pub fn chat_delete(&mut self) {
        let char_count = self.chat_input.chars().count();
        if self.chat_cursor < char_count {
            let byte_pos = char_to_byte_index(&self.chat_input, self.chat_cursor);
            self.chat_input.remove(byte_pos);
        }
    }
}

/// Run `request` on its own task and report the outcome as an event. A
/// request task that panics is still reported, so the busy flag is always
/// released.
fn spawn_request<T, F>(
    events: UnboundedSender<AppEvent>,
    request: F,
    into_event: fn(Result<T, String>) -> AppEvent,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = match tokio::spawn(request).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if events.send(into_event(outcome)).is_err() {
            tracing::debug!("event loop gone; dropping request outcome");
        }
    });
}
