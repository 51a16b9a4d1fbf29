//! A single open document.

use lsp_types::{Position, Range, TextDocumentContentChangeEvent};
use ropey::Rope;

/// An open document's live buffer.
#[derive(Debug, Clone)]
pub struct Document {
    /// The buffer content as a rope for efficient editing.
    content: Rope,
    /// The version reported by the editor with the last edit.
    version: i32,
}

impl Document {
    /// Create a new document with the given content.
    pub fn new(content: &str, version: i32) -> Self {
        Self {
            content: Rope::from_str(content),
            version,
        }
    }

    /// Get the document content as a string.
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Get the document version.
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// Apply a batch of content changes in order.
    pub fn apply_changes(&mut self, changes: &[TextDocumentContentChangeEvent], version: i32) {
        for change in changes {
            match change.range {
                Some(range) => self.replace_range(range, &change.text),
                None => self.content = Rope::from_str(&change.text),
            }
        }
        self.version = version;
    }

    fn replace_range(&mut self, range: Range, text: &str) {
        let start = self.position_to_char(range.start);
        let end = self.position_to_char(range.end).max(start);
        self.content.remove(start..end);
        self.content.insert(start, text);
    }

    /// Convert an LSP position (UTF-16 columns) to a char index. Columns past
    /// the end of a line clamp to the line's end (before its terminator),
    /// lines past the end of the document clamp to the document's end.
    fn position_to_char(&self, position: Position) -> usize {
        let rope = &self.content;
        let line = position.line as usize;
        if line >= rope.len_lines() {
            return rope.len_chars();
        }

        let line_start = rope.line_to_char(line);
        let line_slice = rope.line(line);
        let mut line_len = line_slice.len_chars();
        while line_len > 0 && matches!(line_slice.char(line_len - 1), '\n' | '\r') {
            line_len -= 1;
        }
        let line_end = line_start + line_len;

        let start_cu = rope.char_to_utf16_cu(line_start);
        let end_cu = rope.char_to_utf16_cu(line_end);
        let target_cu = (start_cu + position.character as usize).min(end_cu);
        rope.utf16_cu_to_char(target_cu)
    }
}
