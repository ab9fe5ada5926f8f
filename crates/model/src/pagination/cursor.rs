use serde::{Deserialize, Serialize};
use std::fmt;

/// Resume point of an item source.
///
/// The position always describes what has been *consumed*: a source reopened at
/// a position yields the first record after it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Start of the stream.
    #[default]
    None,

    /// Number of records consumed so far. Used by offset paging and
    /// in-memory lists.
    Offset { offset: u64 },

    /// Last consumed value of a unique, strictly ordered integer sort key.
    /// Used by keyset paging and the server-side cursor.
    SortKey { column: String, last: i64 },
}

impl Cursor {
    pub fn offset(offset: u64) -> Self {
        Cursor::Offset { offset }
    }

    pub fn sort_key(column: impl Into<String>, last: i64) -> Self {
        Cursor::SortKey {
            column: column.into(),
            last,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Cursor::None | Cursor::Offset { offset: 0 })
    }

    /// Number of consumed records when the cursor counts them.
    pub fn consumed(&self) -> Option<u64> {
        match self {
            Cursor::None => Some(0),
            Cursor::Offset { offset } => Some(*offset),
            Cursor::SortKey { .. } => None,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::None => f.write_str("start"),
            Cursor::Offset { offset } => write!(f, "offset={offset}"),
            Cursor::SortKey { column, last } => write!(f, "{column}>{last}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_positions() {
        assert!(Cursor::None.is_start());
        assert!(Cursor::offset(0).is_start());
        assert!(!Cursor::offset(3).is_start());
        assert!(!Cursor::sort_key("id", 0).is_start());
    }

    #[test]
    fn consumed_counts_only_for_counting_cursors() {
        assert_eq!(Cursor::None.consumed(), Some(0));
        assert_eq!(Cursor::offset(7).consumed(), Some(7));
        assert_eq!(Cursor::sort_key("id", 7).consumed(), None);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Cursor::offset(10).to_string(), "offset=10");
        assert_eq!(Cursor::sort_key("id", 42).to_string(), "id>42");
    }
}
