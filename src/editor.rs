//! Source buffer for the code pane.

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

const INDENT: &str = "    ";

#[derive(Debug, Clone)]
pub struct Editor {
    lines: Vec<String>,
    row: usize,
    col: usize, // char index within lines[row]
    default_code: String,
}

impl Editor {
    pub fn new(default_code: &str) -> Self {
        let mut editor = Self {
            lines: Vec::new(),
            row: 0,
            col: 0,
            default_code: default_code.to_string(),
        };
        editor.set_text(default_code);
        editor
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Cursor as (row, column), both counted in characters.
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Replace the buffer and put the cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect();
        self.row = self.lines.len() - 1;
        self.col = self.lines[self.row].chars().count();
    }

    pub fn reset(&mut self) {
        let code = self.default_code.clone();
        self.set_text(&code);
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' {
            self.insert_newline();
            return;
        }
        let line = &mut self.lines[self.row];
        let byte_pos = char_to_byte_index(line, self.col);
        line.insert(byte_pos, c);
        self.col += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|&c| c != '\r') {
            self.insert_char(c);
        }
    }

    /// Split the line at the cursor. The new line keeps the current line's
    /// leading whitespace.
    pub fn insert_newline(&mut self) {
        let line = &mut self.lines[self.row];
        let byte_pos = char_to_byte_index(line, self.col);
        let rest = line.split_off(byte_pos);
        let indent: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();

        self.row += 1;
        self.col = indent.chars().count();
        self.lines.insert(self.row, format!("{}{}", indent, rest));
    }

    pub fn insert_tab(&mut self) {
        self.insert_str(INDENT);
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let line = &mut self.lines[self.row];
            let byte_pos = char_to_byte_index(line, self.col);
            line.remove(byte_pos);
        } else if self.row > 0 {
            let current = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&current);
        }
    }

    pub fn delete(&mut self) {
        if self.col < self.line_len(self.row) {
            let line = &mut self.lines[self.row];
            let byte_pos = char_to_byte_index(line, self.col);
            line.remove(byte_pos);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_home(&mut self) {
        self.col = 0;
    }

    pub fn move_end(&mut self) {
        self.col = self.line_len(self.row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "print(\"Hello, world!\")";

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 0), 0);
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 5), 6);
        assert_eq!(char_to_byte_index("héllo", 99), 6);
    }

    #[test]
    fn test_starts_with_default_code() {
        let editor = Editor::new(DEFAULT);
        assert_eq!(editor.text(), DEFAULT);
        assert_eq!(editor.cursor(), (0, DEFAULT.len()));
    }

    #[test]
    fn test_newline_keeps_indentation() {
        let mut editor = Editor::new("");
        editor.insert_str("for i in range(3):");
        editor.insert_newline();
        editor.insert_tab();
        editor.insert_str("print(i)");
        editor.insert_newline();
        editor.insert_str("x");
        assert_eq!(editor.text(), "for i in range(3):\n    print(i)\n    x");
    }

    #[test]
    fn test_backspace_and_delete_join_lines() {
        let mut editor = Editor::new("ab\ncd");
        editor.move_home();
        editor.backspace();
        assert_eq!(editor.text(), "abcd");
        assert_eq!(editor.cursor(), (0, 2));

        editor.insert_newline();
        editor.move_left();
        editor.delete();
        assert_eq!(editor.text(), "abcd");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut editor = Editor::new("ñandú");
        editor.move_left();
        editor.backspace();
        assert_eq!(editor.text(), "ñanú");
        editor.move_home();
        editor.delete();
        editor.insert_char('é');
        assert_eq!(editor.text(), "éanú");
    }

    #[test]
    fn test_vertical_moves_clamp_column() {
        let mut editor = Editor::new("long line\nab");
        editor.move_up();
        editor.move_end();
        editor.move_down();
        assert_eq!(editor.cursor(), (1, 2));
    }

    #[test]
    fn test_reset_restores_default() {
        let mut editor = Editor::new(DEFAULT);
        editor.set_text("while True:\n    pass");
        editor.reset();
        assert_eq!(editor.text(), DEFAULT);
    }
}
