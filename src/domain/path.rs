/// Ladder traversal on abstract indices.
///
/// A walk starts at the top of a lane and, row by row, drops to the rung
/// level, crosses at most one rung, then continues. After the last row it
/// drops to the bottom boundary. No pixels here; `geometry` translates
/// the resulting steps into coordinates.

use super::error::LadderError;
use super::ladder::Ladder;

/// Vertical position along a lane.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    Top,
    /// Midpoint of rung row `n`.
    Rung(usize),
    Bottom,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepKind {
    Vertical,
    Horizontal,
}

/// One atomic leg of a traversal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Vertical { column: usize, from: Level, to: Level },
    Horizontal { row: usize, from: usize, to: usize },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Vertical { .. } => StepKind::Vertical,
            Step::Horizontal { .. } => StepKind::Horizontal,
        }
    }

    /// `(column, level)` where this step begins.
    pub fn start(&self) -> (usize, Level) {
        match *self {
            Step::Vertical { column, from, .. } => (column, from),
            Step::Horizontal { row, from, .. } => (from, Level::Rung(row)),
        }
    }

    /// `(column, level)` where this step ends.
    pub fn end(&self) -> (usize, Level) {
        match *self {
            Step::Vertical { column, to, .. } => (column, to),
            Step::Horizontal { row, to, .. } => (to, Level::Rung(row)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Walk {
    pub steps: Vec<Step>,
    pub final_column: usize,
}

/// Lane reached by crossing the rung that touches `column` at `row`.
///
/// The rightward rung is checked first. The generator never produces a
/// lane with rungs on both sides, but the order stays fixed regardless.
#[inline]
pub fn crossing(ladder: &Ladder, row: usize, column: usize) -> Option<usize> {
    if column + 1 < ladder.columns() && ladder.has_rung(row, column) {
        Some(column + 1)
    } else if column > 0 && ladder.has_rung(row, column - 1) {
        Some(column - 1)
    } else {
        None
    }
}

/// Walk the ladder from `start_column`. O(rows).
pub fn walk(ladder: &Ladder, start_column: usize) -> Result<Walk, LadderError> {
    let columns = ladder.columns();
    if start_column >= columns {
        return Err(LadderError::InvalidStartColumn { start: start_column, columns });
    }

    let mut steps = Vec::with_capacity(ladder.rows() * 2 + 1);
    let mut current = start_column;
    let mut level = Level::Top;

    for row in 0..ladder.rows() {
        steps.push(Step::Vertical { column: current, from: level, to: Level::Rung(row) });
        level = Level::Rung(row);

        if let Some(next) = crossing(ladder, row, current) {
            steps.push(Step::Horizontal { row, from: current, to: next });
            current = next;
        }
    }

    steps.push(Step::Vertical { column: current, from: level, to: Level::Bottom });

    Ok(Walk { steps, final_column: current })
}

/// Final lane for every start lane, without materializing the steps.
pub fn end_mapping(ladder: &Ladder) -> Vec<usize> {
    (0..ladder.columns())
        .map(|start| {
            (0..ladder.rows()).fold(start, |col, row| crossing(ladder, row, col).unwrap_or(col))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ladder::{generate_ladder, RngSource, MAX_COLUMNS, MIN_COLUMNS};

    fn ladder(columns: usize, rows: &[&str]) -> Ladder {
        // '-' = rung, anything else = gap
        let rungs = rows
            .iter()
            .map(|r| r.chars().map(|c| c == '-').collect())
            .collect();
        Ladder::from_rows(columns, rungs).unwrap()
    }

    fn random_ladder(columns: usize, seed: u64) -> Ladder {
        generate_ladder(columns, 15, 0.4, &mut RngSource::seeded_or_entropy(Some(seed)))
    }

    fn assert_contiguous(w: &Walk, start: usize) {
        assert_eq!(w.steps.first().map(Step::start), Some((start, Level::Top)));
        assert_eq!(w.steps.last().map(Step::end), Some((w.final_column, Level::Bottom)));
        for pair in w.steps.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start(), "gap between {:?} and {:?}", pair[0], pair[1]);
        }
    }

    // ── Concrete scenarios ──

    #[test]
    fn single_rung_swaps_first_two_lanes() {
        let l = ladder(3, &["- "]);
        assert_eq!(walk(&l, 0).unwrap().final_column, 1);
        assert_eq!(walk(&l, 1).unwrap().final_column, 0);
        assert_eq!(walk(&l, 2).unwrap().final_column, 2);
    }

    #[test]
    fn single_rung_step_sequence() {
        let l = ladder(3, &["- "]);
        let w = walk(&l, 0).unwrap();
        assert_eq!(
            w.steps,
            vec![
                Step::Vertical { column: 0, from: Level::Top, to: Level::Rung(0) },
                Step::Horizontal { row: 0, from: 0, to: 1 },
                Step::Vertical { column: 1, from: Level::Rung(0), to: Level::Bottom },
            ]
        );
    }

    #[test]
    fn vertical_step_emitted_every_row() {
        let l = ladder(2, &[" ", " ", "-"]);
        let w = walk(&l, 0).unwrap();
        let verticals = w.steps.iter().filter(|s| s.kind() == StepKind::Vertical).count();
        let horizontals = w.steps.len() - verticals;
        assert_eq!(verticals, 4);
        assert_eq!(horizontals, 1);
        assert_eq!(w.final_column, 1);
    }

    #[test]
    fn leftward_rung_is_followed() {
        let l = ladder(3, &[" -"]);
        let w = walk(&l, 2).unwrap();
        assert_eq!(w.steps[1], Step::Horizontal { row: 0, from: 2, to: 1 });
        assert_eq!(w.final_column, 1);
    }

    #[test]
    fn right_rung_wins_over_left() {
        // Not producible by the generator: lane 1 touches both rungs.
        let l = Ladder::from_rows_unchecked(3, vec![vec![true, true]]);
        assert_eq!(crossing(&l, 0, 1), Some(2));
        assert_eq!(walk(&l, 1).unwrap().final_column, 2);
    }

    #[test]
    fn at_most_one_crossing_per_row() {
        let l = ladder(4, &["- -"]);
        let w = walk(&l, 1).unwrap();
        let horizontals = w.steps.iter().filter(|s| s.kind() == StepKind::Horizontal).count();
        assert_eq!(horizontals, 1);
        assert_eq!(w.final_column, 0);
    }

    // ── Degenerate ──

    #[test]
    fn zero_rows_is_identity_with_one_vertical() {
        let l = Ladder::from_rows(5, vec![]).unwrap();
        for start in 0..5 {
            let w = walk(&l, start).unwrap();
            assert_eq!(w.final_column, start);
            assert_eq!(
                w.steps,
                vec![Step::Vertical { column: start, from: Level::Top, to: Level::Bottom }]
            );
        }
    }

    #[test]
    fn start_out_of_range_is_rejected() {
        let l = ladder(3, &["- "]);
        assert_eq!(
            walk(&l, 3),
            Err(LadderError::InvalidStartColumn { start: 3, columns: 3 })
        );
    }

    // ── Properties over random ladders ──

    #[test]
    fn every_ladder_is_a_bijection() {
        for seed in 0..100 {
            for columns in MIN_COLUMNS..=MAX_COLUMNS {
                let l = random_ladder(columns, seed);
                let mut ends: Vec<usize> = (0..columns).map(|c| walk(&l, c).unwrap().final_column).collect();
                ends.sort_unstable();
                assert_eq!(ends, (0..columns).collect::<Vec<_>>(), "seed {seed}, columns {columns}");
            }
        }
    }

    #[test]
    fn walks_are_deterministic() {
        let l = random_ladder(8, 3);
        for start in 0..8 {
            assert_eq!(walk(&l, start), walk(&l, start));
        }
    }

    #[test]
    fn walks_are_contiguous() {
        for seed in 0..50 {
            let l = random_ladder(10, seed);
            for start in 0..10 {
                assert_contiguous(&walk(&l, start).unwrap(), start);
            }
        }
    }

    #[test]
    fn end_mapping_matches_walks() {
        let l = random_ladder(12, 99);
        let mapping = end_mapping(&l);
        for (start, &end) in mapping.iter().enumerate() {
            assert_eq!(walk(&l, start).unwrap().final_column, end);
        }
    }
}
