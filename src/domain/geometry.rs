/// Layout translation: abstract walk steps → drawing coordinates.
///
/// Pure and stateless. The renderer supplies the surface size; nothing
/// here knows about terminals or pixels beyond plain `f32` units.
///
///   x(column)   = column · column_width + column_width / 2
///   y(Top)      = padding_top
///   y(Rung(r))  = padding_top + r · row_height + row_height / 2
///   y(Bottom)   = padding_top + ladder_height
///
/// `row_height = ladder_height / rows`, so with `rows > 0` the bottom is
/// exactly `rows · row_height` below the top.

use super::error::LadderError;
use super::ladder::Ladder;
use super::path::{walk, Level, Step, StepKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    column_width: f32,
    padding_top: f32,
    ladder_height: f32,
    rows: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    Vertical { x: f32, y1: f32, y2: f32 },
    Horizontal { y: f32, x1: f32, x2: f32 },
}

impl PathSegment {
    pub fn kind(&self) -> StepKind {
        match self {
            PathSegment::Vertical { .. } => StepKind::Vertical,
            PathSegment::Horizontal { .. } => StepKind::Horizontal,
        }
    }

    pub fn start(&self) -> (f32, f32) {
        match *self {
            PathSegment::Vertical { x, y1, .. } => (x, y1),
            PathSegment::Horizontal { y, x1, .. } => (x1, y),
        }
    }

    pub fn end(&self) -> (f32, f32) {
        match *self {
            PathSegment::Vertical { x, y2, .. } => (x, y2),
            PathSegment::Horizontal { y, x2, .. } => (x2, y),
        }
    }

    /// Point reached after growing the segment by `progress` (clamped to 0..=1).
    pub fn point_at(&self, progress: f32) -> (f32, f32) {
        let t = progress.clamp(0.0, 1.0);
        let (x1, y1) = self.start();
        let (x2, y2) = self.end();
        (x1 + (x2 - x1) * t, y1 + (y2 - y1) * t)
    }
}

/// A walk translated into coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPath {
    pub segments: Vec<PathSegment>,
    pub final_column: usize,
}

impl Geometry {
    pub fn new(
        column_width: f32,
        padding_top: f32,
        ladder_height: f32,
        rows: usize,
    ) -> Result<Self, LadderError> {
        if !(column_width.is_finite() && column_width > 0.0) {
            return Err(LadderError::InvalidGeometry("column width must be positive"));
        }
        if !(ladder_height.is_finite() && ladder_height > 0.0) {
            return Err(LadderError::InvalidGeometry("ladder height must be positive"));
        }
        if !(padding_top.is_finite() && padding_top >= 0.0) {
            return Err(LadderError::InvalidGeometry("top padding must not be negative"));
        }
        Ok(Geometry { column_width, padding_top, ladder_height, rows })
    }

    /// Fit `columns` lanes and `rows` rung rows into a `width × height` surface.
    pub fn fit(
        width: f32,
        height: f32,
        columns: usize,
        rows: usize,
        padding_top: f32,
        padding_bottom: f32,
    ) -> Result<Self, LadderError> {
        if columns == 0 {
            return Err(LadderError::InvalidGeometry("no columns to lay out"));
        }
        if !(padding_bottom.is_finite() && padding_bottom >= 0.0) {
            return Err(LadderError::InvalidGeometry("bottom padding must not be negative"));
        }
        Geometry::new(
            width / columns as f32,
            padding_top,
            height - padding_top - padding_bottom,
            rows,
        )
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    pub fn row_height(&self) -> f32 {
        if self.rows == 0 {
            self.ladder_height
        } else {
            self.ladder_height / self.rows as f32
        }
    }

    pub fn column_x(&self, column: usize) -> f32 {
        column as f32 * self.column_width + self.column_width / 2.0
    }

    pub fn level_y(&self, level: Level) -> f32 {
        match level {
            Level::Top => self.padding_top,
            Level::Rung(r) => self.padding_top + r as f32 * self.row_height() + self.row_height() / 2.0,
            Level::Bottom => self.padding_top + self.ladder_height,
        }
    }

    pub fn place(&self, step: &Step) -> PathSegment {
        let (c1, l1) = step.start();
        let (c2, l2) = step.end();
        match step.kind() {
            StepKind::Vertical => PathSegment::Vertical {
                x: self.column_x(c1),
                y1: self.level_y(l1),
                y2: self.level_y(l2),
            },
            StepKind::Horizontal => PathSegment::Horizontal {
                y: self.level_y(l1),
                x1: self.column_x(c1),
                x2: self.column_x(c2),
            },
        }
    }
}

/// Walk the ladder from `start_column` and lay the path out with `geometry`.
///
/// Either the complete path or an error; never a truncated path.
pub fn resolve_path(
    ladder: &Ladder,
    start_column: usize,
    geometry: &Geometry,
) -> Result<ResolvedPath, LadderError> {
    if geometry.rows != ladder.rows() {
        return Err(LadderError::InvalidGeometry("row count does not match the ladder"));
    }
    let w = walk(ladder, start_column)?;
    Ok(ResolvedPath {
        segments: w.steps.iter().map(|s| geometry.place(s)).collect(),
        final_column: w.final_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ladder::{generate_ladder, RngSource};

    fn geo(rows: usize) -> Geometry {
        // 3 lanes of width 100, 60px top padding, 300px of ladder
        Geometry::new(100.0, 60.0, 300.0, rows).unwrap()
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn lane_centres() {
        let g = geo(3);
        assert_eq!(g.column_x(0), 50.0);
        assert_eq!(g.column_x(2), 250.0);
    }

    #[test]
    fn rung_rows_sit_mid_band() {
        let g = geo(3);
        assert_eq!(g.row_height(), 100.0);
        assert_eq!(g.level_y(Level::Top), 60.0);
        assert_eq!(g.level_y(Level::Rung(0)), 110.0);
        assert_eq!(g.level_y(Level::Rung(2)), 310.0);
        assert_eq!(g.level_y(Level::Bottom), 360.0);
    }

    #[test]
    fn fit_divides_surface() {
        let g = Geometry::fit(600.0, 480.0, 6, 15, 60.0, 60.0).unwrap();
        assert_eq!(g.column_width(), 100.0);
        assert_eq!(g.row_height(), 24.0);
        assert_eq!(g.level_y(Level::Bottom), 420.0);
    }

    #[test]
    fn fit_rejects_cramped_surface() {
        assert!(Geometry::fit(600.0, 100.0, 6, 15, 60.0, 60.0).is_err());
        assert!(Geometry::fit(600.0, 480.0, 0, 15, 60.0, 60.0).is_err());
        assert!(Geometry::new(0.0, 0.0, 10.0, 1).is_err());
        assert!(Geometry::new(10.0, -1.0, 10.0, 1).is_err());
    }

    #[test]
    fn resolve_single_rung() {
        let l = Ladder::from_rows(3, vec![vec![true, false]]).unwrap();
        let p = resolve_path(&l, 0, &geo(1)).unwrap();
        assert_eq!(p.final_column, 1);
        assert_eq!(
            p.segments,
            vec![
                PathSegment::Vertical { x: 50.0, y1: 60.0, y2: 210.0 },
                PathSegment::Horizontal { y: 210.0, x1: 50.0, x2: 150.0 },
                PathSegment::Vertical { x: 150.0, y1: 210.0, y2: 360.0 },
            ]
        );
    }

    #[test]
    fn zero_rows_spans_top_to_bottom() {
        let l = Ladder::from_rows(4, vec![]).unwrap();
        let p = resolve_path(&l, 2, &geo(0)).unwrap();
        assert_eq!(p.final_column, 2);
        assert_eq!(p.segments, vec![PathSegment::Vertical { x: 250.0, y1: 60.0, y2: 360.0 }]);
    }

    #[test]
    fn resolved_paths_are_contiguous() {
        let g = Geometry::fit(1400.0, 900.0, 14, 15, 60.0, 60.0).unwrap();
        for seed in 0..30 {
            let l = generate_ladder(14, 15, 0.4, &mut RngSource::seeded_or_entropy(Some(seed)));
            for start in 0..14 {
                let p = resolve_path(&l, start, &g).unwrap();
                assert!(close(p.segments[0].start(), (g.column_x(start), g.level_y(Level::Top))));
                let last = p.segments.last().unwrap();
                assert!(close(last.end(), (g.column_x(p.final_column), g.level_y(Level::Bottom))));
                for pair in p.segments.windows(2) {
                    assert!(close(pair[0].end(), pair[1].start()));
                }
            }
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let g = Geometry::fit(900.0, 600.0, 9, 15, 40.0, 40.0).unwrap();
        for seed in 0..10 {
            let l = generate_ladder(9, 15, 0.4, &mut RngSource::seeded_or_entropy(Some(seed)));
            for start in 0..9 {
                assert_eq!(resolve_path(&l, start, &g), resolve_path(&l, start, &g));
            }
        }
    }

    #[test]
    fn mismatched_rows_rejected() {
        let l = Ladder::from_rows(3, vec![vec![true, false]]).unwrap();
        assert!(matches!(resolve_path(&l, 0, &geo(2)), Err(LadderError::InvalidGeometry(_))));
    }

    #[test]
    fn bad_start_fails_whole_resolution() {
        let l = Ladder::from_rows(3, vec![vec![true, false]]).unwrap();
        assert_eq!(
            resolve_path(&l, 7, &geo(1)),
            Err(LadderError::InvalidStartColumn { start: 7, columns: 3 })
        );
    }

    #[test]
    fn point_at_interpolates() {
        let s = PathSegment::Horizontal { y: 10.0, x1: 0.0, x2: 8.0 };
        assert_eq!(s.point_at(0.5), (4.0, 10.0));
        assert_eq!(s.point_at(2.0), (8.0, 10.0));
        assert_eq!(s.kind(), StepKind::Horizontal);
    }
}
