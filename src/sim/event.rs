/// Events emitted during a session tick.
/// The presentation layer consumes these for sound; only the segment
/// kind crosses that boundary, never coordinates.

use crate::domain::path::StepKind;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// A participant's trace began drawing its next segment.
    SegmentStarted { participant: usize, kind: StepKind },
    /// A trace finished its last segment at `final_column`.
    TraceFinished { participant: usize, final_column: usize },
    /// The result modal for a participant is now showing.
    ResultRevealed { participant: usize, win: bool },
}
