use serde::{Deserialize, Serialize};

/// A zero-based (line, column) pair.
///
/// Ordering is lexicographic: line first, then column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A source range without the file component.
///
/// Used inside per-file span records, where the file is implied by the
/// table the span lives in. All coordinates are zero-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelativeLocation {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl RelativeLocation {
    #[must_use]
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Degenerate zero-width range at a single position
    #[must_use]
    pub const fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }

    /// Whole-line range helper, mostly for tests and fixtures
    #[must_use]
    pub const fn lines(start_line: u32, end_line: u32) -> Self {
        Self::new(start_line, 0, end_line, 0)
    }

    #[must_use]
    pub const fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    #[must_use]
    pub const fn end(&self) -> Position {
        Position::new(self.end_line, self.end_column)
    }

    #[must_use]
    pub const fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }

    #[must_use]
    pub fn is_zero_width(&self) -> bool {
        self.start() == self.end()
    }

    /// Lexicographic enclosure: `inner.start >= self.start && inner.end <= self.end`.
    ///
    /// Identical ranges enclose each other; callers that need proper nesting
    /// must reject equality themselves.
    #[must_use]
    pub fn encloses(&self, inner: &Self) -> bool {
        inner.start() >= self.start() && inner.end() <= self.end()
    }

    /// Size key used to pick the innermost of several enclosing ranges
    #[must_use]
    pub const fn extent(&self) -> (u32, u32) {
        let lines = self.end_line.saturating_sub(self.start_line);
        let columns = if lines == 0 {
            self.end_column.saturating_sub(self.start_column)
        } else {
            self.end_column
        };
        (lines, columns)
    }

    /// Attach a file to produce an absolute location
    #[must_use]
    pub fn in_file(&self, file_uri: impl Into<String>) -> Location {
        Location::from_relative(*self, file_uri)
    }
}

/// A source range inside a specific file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file_uri: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    #[must_use]
    pub fn new(
        file_uri: impl Into<String>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file_uri: file_uri.into(),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    #[must_use]
    pub fn from_relative(rel: RelativeLocation, file_uri: impl Into<String>) -> Self {
        Self::new(
            file_uri,
            rel.start_line,
            rel.start_column,
            rel.end_line,
            rel.end_column,
        )
    }

    /// Drop the file component
    #[must_use]
    pub const fn relative(&self) -> RelativeLocation {
        RelativeLocation::new(
            self.start_line,
            self.start_column,
            self.end_line,
            self.end_column,
        )
    }

    #[must_use]
    pub const fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    #[must_use]
    pub const fn end(&self) -> Position {
        Position::new(self.end_line, self.end_column)
    }
}
