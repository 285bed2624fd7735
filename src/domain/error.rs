/// Errors raised by the ladder core.
///
/// Every operation in `domain` is pure, so none of these are transient:
/// the same inputs always fail the same way.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum LadderError {
    /// Participant count outside the accepted range.
    InvalidColumnCount { count: usize, min: usize, max: usize },
    /// Traversal requested from a lane that does not exist.
    InvalidStartColumn { start: usize, columns: usize },
    /// Rung probability must lie strictly between 0 and 1.
    InvalidRungProbability(f64),
    /// Non-positive or non-finite layout value.
    InvalidGeometry(&'static str),
    /// Explicit ladder row with the wrong number of gaps.
    #[cfg(test)]
    RaggedRow { row: usize, expected: usize, found: usize },
    /// Explicit ladder with two rungs touching the same lane on one row.
    #[cfg(test)]
    AdjacentRungs { row: usize, column: usize },
}

impl fmt::Display for LadderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderError::InvalidColumnCount { count, min, max } => {
                write!(f, "participant count {count} is not between {min} and {max}")
            }
            LadderError::InvalidStartColumn { start, columns } => {
                write!(f, "start column {start} is out of range for {columns} columns")
            }
            LadderError::InvalidRungProbability(p) => {
                write!(f, "rung probability {p} must be between 0 and 1 (exclusive)")
            }
            LadderError::InvalidGeometry(reason) => write!(f, "invalid geometry: {reason}"),
            #[cfg(test)]
            LadderError::RaggedRow { row, expected, found } => {
                write!(f, "row {row} has {found} rung cells, expected {expected}")
            }
            #[cfg(test)]
            LadderError::AdjacentRungs { row, column } => {
                write!(f, "rungs at row {row} touch column {column} from both sides")
            }
        }
    }
}

impl std::error::Error for LadderError {}
