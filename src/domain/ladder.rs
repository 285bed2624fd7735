/// Ladder structure and its random generator.
///
/// A ladder with `columns` lanes has `columns - 1` gaps between them.
/// `rungs[row][gap] == true` means a horizontal rung joins lane `gap`
/// to lane `gap + 1` at `row`.
///
/// ## Collision rule
///
/// No lane may touch two rungs on the same row:
///   `rungs[r][c] == true`  ⇒  `rungs[r][c - 1] == false`
///
/// The generator enforces this by construction. It fills gaps left to
/// right (column-major, rows top to bottom inside each gap) and only ever
/// consults the already-decided left neighbour, so no second pass or
/// backtracking is needed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::LadderError;

pub const DEFAULT_ROWS: usize = 15;
pub const DEFAULT_RUNG_PROBABILITY: f64 = 0.4;
pub const MIN_COLUMNS: usize = 2;
pub const MAX_COLUMNS: usize = 14;

// ── Random source ──

/// Uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Adapts any `rand` generator into a `RandomSource`.
pub struct RngSource<R: Rng>(R);

impl RngSource<StdRng> {
    /// Reproducible stream when a seed is configured, OS entropy otherwise.
    pub fn seeded_or_entropy(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => RngSource(StdRng::seed_from_u64(s)),
            None => RngSource(StdRng::from_entropy()),
        }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

// ── Ladder ──

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ladder {
    columns: usize,
    rungs: Vec<Vec<bool>>,
}

impl Ladder {
    /// Build a ladder from explicit rows for fixtures.
    /// Rejects rows of the wrong width and rows breaking the collision rule.
    #[cfg(test)]
    pub(crate) fn from_rows(columns: usize, rungs: Vec<Vec<bool>>) -> Result<Self, LadderError> {
        let gaps = columns.saturating_sub(1);
        for (row, cells) in rungs.iter().enumerate() {
            if cells.len() != gaps {
                return Err(LadderError::RaggedRow { row, expected: gaps, found: cells.len() });
            }
        }
        let ladder = Ladder { columns, rungs };
        match ladder.first_collision() {
            Some((row, column)) => Err(LadderError::AdjacentRungs { row, column }),
            None => Ok(ladder),
        }
    }

    /// Skips the collision check. Lets tests probe traversal precedence
    /// on layouts the generator can never produce.
    #[cfg(test)]
    pub(crate) fn from_rows_unchecked(columns: usize, rungs: Vec<Vec<bool>>) -> Self {
        Ladder { columns, rungs }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rungs.len()
    }

    pub fn gaps(&self) -> usize {
        self.columns.saturating_sub(1)
    }

    /// Is there a rung joining `gap` and `gap + 1` at `row`?
    /// Out of range = no rung.
    #[inline]
    pub fn has_rung(&self, row: usize, gap: usize) -> bool {
        self.rungs
            .get(row)
            .and_then(|cells| cells.get(gap))
            .copied()
            .unwrap_or(false)
    }

    pub fn rung_count(&self) -> usize {
        self.rungs.iter().flatten().filter(|&&r| r).count()
    }

    /// First `(row, gap)` whose rung shares a lane with the rung on its left.
    pub fn first_collision(&self) -> Option<(usize, usize)> {
        for (row, cells) in self.rungs.iter().enumerate() {
            for gap in 1..cells.len() {
                if cells[gap] && cells[gap - 1] {
                    return Some((row, gap));
                }
            }
        }
        None
    }
}

// ── Validation ──

/// Check a participant count before anything is generated.
pub fn validate_column_count(count: usize, max: usize) -> Result<usize, LadderError> {
    if count < MIN_COLUMNS || count > max {
        return Err(LadderError::InvalidColumnCount { count, min: MIN_COLUMNS, max });
    }
    Ok(count)
}

pub fn validate_rung_probability(p: f64) -> Result<f64, LadderError> {
    if p.is_finite() && p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(LadderError::InvalidRungProbability(p))
    }
}

// ── Generation ──

/// Generate a random ladder.
///
/// Draws exactly one sample per `(row, gap)` cell in column-major order.
/// A rung is placed when the sample is below `rung_probability` and the
/// cell to its left on the same row is empty. Never fails; `rows == 0`
/// yields an empty (identity) ladder.
pub fn generate_ladder<S: RandomSource + ?Sized>(
    columns: usize,
    rows: usize,
    rung_probability: f64,
    rng: &mut S,
) -> Ladder {
    let gaps = columns.saturating_sub(1);
    let mut rungs = vec![vec![false; gaps]; rows];

    for gap in 0..gaps {
        for row in 0..rows {
            if rng.next_unit() < rung_probability {
                let left_taken = gap > 0 && rungs[row][gap - 1];
                if !left_taken {
                    rungs[row][gap] = true;
                }
            }
        }
    }

    let ladder = Ladder { columns, rungs };
    debug_assert_eq!(ladder.first_collision(), None);
    ladder
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Replays a fixed list of samples, cycling, and counts draws.
    pub(crate) struct Scripted {
        values: Vec<f64>,
        pub draws: usize,
    }

    impl Scripted {
        pub(crate) fn new(values: &[f64]) -> Self {
            Scripted { values: values.to_vec(), draws: 0 }
        }
    }

    impl RandomSource for Scripted {
        fn next_unit(&mut self) -> f64 {
            let v = self.values[self.draws % self.values.len()];
            self.draws += 1;
            v
        }
    }

    fn seeded(seed: u64) -> RngSource<StdRng> {
        RngSource::seeded_or_entropy(Some(seed))
    }

    // ── generate_ladder ──

    #[test]
    fn always_below_threshold_alternates_gaps() {
        let ladder = generate_ladder(5, 3, 0.4, &mut Scripted::new(&[0.0]));
        for row in 0..3 {
            assert!(ladder.has_rung(row, 0));
            assert!(!ladder.has_rung(row, 1)); // blocked by gap 0
            assert!(ladder.has_rung(row, 2));
            assert!(!ladder.has_rung(row, 3)); // blocked by gap 2
        }
    }

    #[test]
    fn never_below_threshold_is_empty() {
        let ladder = generate_ladder(6, 15, 0.4, &mut Scripted::new(&[0.99]));
        assert_eq!(ladder.rung_count(), 0);
        assert_eq!(ladder.rows(), 15);
    }

    #[test]
    fn samples_are_consumed_column_major() {
        // Draw order: (r0,g0) (r1,g0) (r0,g1) (r1,g1)
        let mut src = Scripted::new(&[0.9, 0.1, 0.1, 0.9]);
        let ladder = generate_ladder(3, 2, 0.4, &mut src);
        assert!(!ladder.has_rung(0, 0));
        assert!(ladder.has_rung(1, 0));
        assert!(ladder.has_rung(0, 1));
        assert!(!ladder.has_rung(1, 1));
    }

    #[test]
    fn one_sample_per_cell_even_when_blocked() {
        let mut src = Scripted::new(&[0.0]);
        generate_ladder(4, 7, 0.4, &mut src);
        assert_eq!(src.draws, 7 * 3);
    }

    #[test]
    fn sample_equal_to_probability_places_nothing() {
        let ladder = generate_ladder(2, 4, 0.4, &mut Scripted::new(&[0.4]));
        assert_eq!(ladder.rung_count(), 0);
    }

    #[test]
    fn two_columns_has_single_unconstrained_gap() {
        let ladder = generate_ladder(2, 15, 0.4, &mut seeded(7));
        assert_eq!(ladder.rows(), 15);
        assert_eq!(ladder.gaps(), 1);
        assert!(ladder.first_collision().is_none());

        let all = generate_ladder(2, 15, 0.4, &mut Scripted::new(&[0.0]));
        assert_eq!(all.rung_count(), 15);
    }

    #[test]
    fn zero_rows_is_legal() {
        let ladder = generate_ladder(4, 0, 0.4, &mut seeded(1));
        assert_eq!(ladder.rows(), 0);
        assert_eq!(ladder.columns(), 4);
    }

    #[test]
    fn generated_ladders_never_collide() {
        for seed in 0..200 {
            for columns in MIN_COLUMNS..=MAX_COLUMNS {
                let ladder = generate_ladder(columns, DEFAULT_ROWS, DEFAULT_RUNG_PROBABILITY, &mut seeded(seed));
                assert_eq!(ladder.first_collision(), None, "seed {seed}, columns {columns}");
                for row in 0..ladder.rows() {
                    for gap in 1..ladder.gaps() {
                        assert!(!(ladder.has_rung(row, gap) && ladder.has_rung(row, gap - 1)));
                    }
                }
            }
        }
    }

    #[test]
    fn same_seed_same_ladder() {
        let a = generate_ladder(9, 15, 0.4, &mut seeded(42));
        let b = generate_ladder(9, 15, 0.4, &mut seeded(42));
        assert_eq!(a, b);
    }

    // ── from_rows ──

    #[test]
    fn from_rows_accepts_valid_layout() {
        let ladder = Ladder::from_rows(3, vec![vec![true, false]]).unwrap();
        assert_eq!(ladder.columns(), 3);
        assert_eq!(ladder.rows(), 1);
        assert!(ladder.has_rung(0, 0));
    }

    #[test]
    fn from_rows_rejects_adjacent_rungs() {
        let err = Ladder::from_rows(4, vec![vec![false, false, false], vec![false, true, true]]).unwrap_err();
        assert_eq!(err, LadderError::AdjacentRungs { row: 1, column: 2 });
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Ladder::from_rows(3, vec![vec![true]]).unwrap_err();
        assert_eq!(err, LadderError::RaggedRow { row: 0, expected: 2, found: 1 });
    }

    #[test]
    fn has_rung_out_of_range_is_false() {
        let ladder = Ladder::from_rows(2, vec![vec![true]]).unwrap();
        assert!(!ladder.has_rung(5, 0));
        assert!(!ladder.has_rung(0, 3));
    }

    // ── validation ──

    #[test]
    fn column_count_bounds() {
        assert!(validate_column_count(1, MAX_COLUMNS).is_err());
        assert!(validate_column_count(15, MAX_COLUMNS).is_err());
        assert_eq!(validate_column_count(2, MAX_COLUMNS), Ok(2));
        assert_eq!(validate_column_count(14, MAX_COLUMNS), Ok(14));
    }

    #[test]
    fn rung_probability_bounds() {
        assert!(validate_rung_probability(0.0).is_err());
        assert!(validate_rung_probability(1.0).is_err());
        assert!(validate_rung_probability(f64::NAN).is_err());
        assert_eq!(validate_rung_probability(0.4), Ok(0.4));
    }
}
