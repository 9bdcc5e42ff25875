use pytutor::format::{inline_segments, segments, Inline, Segment};
use pytutor::{ConsoleEntry, LineKind, RunStatus, Sender};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, InputMode};

/// Number of rows `lines` occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

/// First visible column for a cursor at `col` in a view `width` columns
/// wide. The offset only moves when the cursor would leave the view.
fn horizontal_offset(col: usize, offset: usize, width: usize) -> usize {
    let width = width.max(1);
    if col < offset {
        col
    } else if col >= offset + width {
        col + 1 - width
    } else {
        offset
    }
}

/// Turn one line of prose into spans, styling inline code.
fn prose_line(text: &str) -> Line<'static> {
    let spans: Vec<Span<'static>> = inline_segments(text)
        .into_iter()
        .map(|piece| match piece {
            Inline::Text(t) => Span::raw(t.to_string()),
            Inline::Code(code) => Span::styled(
                code.to_string(),
                Style::default().fg(Color::Yellow).bg(Color::Black).add_modifier(Modifier::BOLD),
            ),
        })
        .collect();

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Lay out a chat message: prose lines, then fenced blocks as a gutter-marked
/// code listing under a language label.
fn message_lines(text: &str) -> Vec<Line<'static>> {
    let segs = segments(text);
    let mixed = segs.len() > 1;
    let mut lines = Vec::new();

    for segment in segs {
        match segment {
            Segment::Prose(prose) => {
                // Newlines that only separate prose from a code block would
                // otherwise become blank rows.
                let prose = if mixed { prose.trim_matches('\n') } else { prose };
                if mixed && prose.trim().is_empty() {
                    continue;
                }
                lines.extend(prose.split('\n').map(prose_line));
            }
            Segment::Code(block) => {
                lines.push(Line::from(Span::styled(
                    format!("┌ {}", block.language),
                    Style::default().fg(Color::DarkGray),
                )));
                for code_line in block.code.split('\n') {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", Style::default().fg(Color::DarkGray)),
                        Span::styled(code_line.to_string(), Style::default().fg(Color::Green)),
                    ]));
                }
                lines.push(Line::from(Span::styled("└", Style::default().fg(Color::DarkGray))));
            }
        }
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Code on the left, tutor chat on the right
    let [code_area, chat_area] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(body_area);

    let [editor_area, console_area] = Layout::vertical([
        Constraint::Percentage(60),
        Constraint::Percentage(40),
    ])
    .areas(code_area);

    render_editor(app, frame, editor_area);
    render_console(app, frame, console_area);
    render_chat(app, frame, chat_area);

    render_footer(app, frame, footer_area);
}

fn border_style(app: &App, pane: FocusPane) -> Style {
    if app.focus != pane {
        Style::default().fg(Color::DarkGray)
    } else if app.input_mode == InputMode::Editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.session.is_busy() { " [working]" } else { "" };

    let title = Line::from(vec![
        Span::styled(" Python Tutor ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend_url.clone(), Style::default().fg(Color::Gray)),
        Span::styled(status, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.input_mode, app.focus) {
        (InputMode::Normal, _) => " NORMAL ",
        (InputMode::Editing, FocusPane::Chat) => " CHAT ",
        (InputMode::Editing, _) => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.input_mode, app.focus) {
        (InputMode::Normal, FocusPane::Console) => &[
            (" j/k ", " scroll "),
            (" G ", " follow "),
            (" r ", " run "),
            (" Tab ", " focus "),
            (" q ", " quit "),
        ],
        (InputMode::Normal, FocusPane::Chat) => &[
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" G ", " follow "),
            (" Tab ", " focus "),
            (" q ", " quit "),
        ],
        (InputMode::Normal, FocusPane::Editor) => &[
            (" i ", " edit "),
            (" r ", " run "),
            (" R ", " reset "),
            (" a ", " ask "),
            (" Tab ", " focus "),
            (" q ", " quit "),
        ],
        (InputMode::Editing, FocusPane::Chat) => &[
            (" Enter ", " send "),
            (" Alt+Enter ", " newline "),
            (" Esc ", " stop typing "),
        ],
        (InputMode::Editing, _) => &[
            (" Ctrl+R ", " run "),
            (" Tab ", " indent "),
            (" Esc ", " stop editing "),
        ],
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_editor(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, FocusPane::Editor))
        .title(" main.py ");

    let inner = block.inner(area);
    let (row, col) = app.editor.cursor();
    let line_count = app.editor.lines().len();
    let gutter = line_count.to_string().len().max(2) + 1;

    // Keep the cursor row in view
    let height = inner.height.max(1) as usize;
    let mut scroll = app.editor_scroll as usize;
    if row < scroll {
        scroll = row;
    } else if row >= scroll + height {
        scroll = row + 1 - height;
    }
    app.editor_scroll = scroll as u16;

    // Keep the cursor column in view; all lines shift together
    let text_width = (inner.width as usize).saturating_sub(gutter);
    let hscroll = horizontal_offset(col, app.editor_hscroll as usize, text_width);
    app.editor_hscroll = hscroll as u16;

    let lines: Vec<Line> = app
        .editor
        .lines()
        .iter()
        .enumerate()
        .skip(scroll)
        .take(height)
        .map(|(i, text)| {
            let visible: String = text.chars().skip(hscroll).take(text_width).collect();
            Line::from(vec![
                Span::styled(
                    format!("{:>width$} ", i + 1, width = gutter - 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(visible),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);

    if app.focus == FocusPane::Editor && app.input_mode == InputMode::Editing && text_width > 0 {
        let cursor_x = (gutter + col - hscroll) as u16;
        let cursor_y = (row - scroll) as u16;
        frame.set_cursor_position((inner.x + cursor_x, inner.y + cursor_y));
    }
}

fn render_console(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = if app.session.pending() == Some(pytutor::session::Pending::Run) {
        " Console (running) "
    } else {
        " Console "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, FocusPane::Console))
        .title(title);
    let inner = block.inner(area);

    let prompt = Span::styled("~ ", Style::default().fg(Color::Green));
    let mut lines: Vec<Line> = Vec::new();

    if app.console.is_waiting() {
        lines.push(Line::from(vec![
            prompt.clone(),
            Span::styled(pytutor::console::WAITING_TEXT, Style::default().fg(Color::Green)),
            Span::styled(" |", Style::default().fg(Color::Green).add_modifier(Modifier::SLOW_BLINK)),
        ]));
    }

    for entry in app.console.entries() {
        match entry {
            ConsoleEntry::Status(status) => {
                let color = match status {
                    RunStatus::Accepted => Color::Green,
                    RunStatus::TimeLimitExceeded => Color::Yellow,
                    RunStatus::Other(_) => Color::Red,
                };
                lines.push(Line::from(Span::styled(
                    format!(" {} ", status.as_str()),
                    Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
                )));
            }
            ConsoleEntry::Line { kind: LineKind::Stdout, text } => {
                lines.push(Line::from(vec![prompt.clone(), Span::raw(text.as_str())]));
            }
            ConsoleEntry::Line { kind, text } => {
                let style = match kind {
                    LineKind::Stderr => Style::default().fg(Color::Red),
                    LineKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    _ => Style::default().fg(Color::Cyan),
                };
                lines.push(Line::from(Span::styled(text.as_str(), style)));
            }
            ConsoleEntry::AiFix(fix) => {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "AI Suggestion:",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                )));
                lines.extend(fix.split('\n').map(|l| Line::from(l.to_string())));
            }
        }
    }

    let total = wrapped_height(&lines, inner.width);
    let max_scroll = total.saturating_sub(inner.height);
    if app.console_follow {
        app.console_scroll = max_scroll;
    } else {
        app.console_scroll = app.console_scroll.min(max_scroll);
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.console_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [history_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, FocusPane::Chat))
        .title(" AI Tutor ");
    let inner = chat_block.inner(history_area);

    let messages = app.session.messages();
    let chat_text = if messages.is_empty() && !app.session.typing() {
        Text::from(Span::styled(
            "Ask the tutor anything about Python...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in messages {
            let (label, color) = match msg.sender {
                Sender::User => ("You:", Color::Cyan),
                Sender::Ai => ("Tutor:", Color::Yellow),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            lines.extend(message_lines(&msg.text));
            lines.push(Line::default());
        }

        if app.session.typing() {
            lines.push(Line::from(Span::styled(
                "Tutor:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let total = wrapped_height(&chat_text.lines, inner.width);
    let max_scroll = total.saturating_sub(inner.height);
    if app.chat_follow {
        app.chat_scroll = max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(max_scroll);
    }

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, history_area);

    render_chat_input(app, frame, input_area);
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.focus == FocusPane::Chat && app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Ask ");

    // Horizontal scroll so the cursor stays visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Line breaks show as a marker so the input stays on one row
    let visible_text: String = app
        .chat_input
        .chars()
        .map(|c| if c == '\n' { '↵' } else { c })
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_message_lines_lays_out_code_blocks() {
        let lines = message_lines("Try this:\n```py\nfor i in range(2):\n    print(i)\n```\nThen run it.");
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(
            text,
            vec![
                "Try this:",
                "┌ py",
                "│ for i in range(2):",
                "│     print(i)",
                "└",
                "Then run it.",
            ]
        );
    }

    #[test]
    fn test_prose_line_styles_inline_code() {
        let line = prose_line("call `len(x)` now");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "len(x)");
        assert_eq!(line.spans[1].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn test_plain_message_keeps_blank_lines() {
        let lines = message_lines("a\n\nb");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_horizontal_offset_follows_cursor() {
        // Inside the view: unchanged
        assert_eq!(horizontal_offset(5, 0, 10), 0);
        // Past the right edge: cursor lands on the last column
        assert_eq!(horizontal_offset(25, 0, 10), 16);
        // Moving left within the shifted view keeps the offset
        assert_eq!(horizontal_offset(20, 16, 10), 16);
        // Past the left edge: cursor lands on the first column
        assert_eq!(horizontal_offset(3, 16, 10), 3);
        assert_eq!(horizontal_offset(0, 0, 0), 0);
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdef"), Line::default(), Line::from("ab")];
        assert_eq!(wrapped_height(&lines, 4), 2 + 1 + 1);
    }
}
