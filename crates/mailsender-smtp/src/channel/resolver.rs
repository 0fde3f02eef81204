//! Reply resolution for the single in-flight command.

use crate::error::Result;
use crate::parser::inspect_line;
use crate::types::{LineInfo, ReplyCode};

/// Callback invoked for every line of a reply, final line included.
pub type LineHandler<'a> = &'a mut (dyn FnMut(&str, LineInfo) + Send);

/// Decides when a (possibly multi-line) reply is complete.
///
/// One resolver serves exactly one command: it is created when the command
/// is written and dropped once [`ReplyResolver::accept`] yields the code.
pub struct ReplyResolver<'a> {
    handler: Option<LineHandler<'a>>,
    lines: usize,
}

impl<'a> ReplyResolver<'a> {
    /// Creates a resolver with an optional per-line handler.
    #[must_use]
    pub fn new(handler: Option<LineHandler<'a>>) -> Self {
        Self { handler, lines: 0 }
    }

    /// Feeds one reply line. Returns the reply code once the final line
    /// (space in the fourth column) has been seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not start with a reply code.
    pub fn accept(&mut self, line: &str) -> Result<Option<ReplyCode>> {
        let info = inspect_line(line)?;
        self.lines += 1;

        if let Some(handler) = self.handler.as_deref_mut() {
            handler(line, info);
        }

        Ok(info.is_last.then_some(info.code))
    }

    /// Returns the number of lines accepted so far.
    #[must_use]
    pub const fn lines_seen(&self) -> usize {
        self.lines
    }
}

impl std::fmt::Debug for ReplyResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyResolver")
            .field("has_handler", &self.handler.is_some())
            .field("lines", &self.lines)
            .finish()
    }
}
