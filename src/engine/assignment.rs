//! Minimum-cost assignment (Hungarian / Kuhn-Munkres) over a [`CostMatrix`].
//!
//! Costs are converted to fixed-point `i64` weights because the solver needs a
//! totally ordered cost type. Infinite or NaN cells become a large penalty so an
//! assignment avoids them whenever a finite alternative exists.

use pathfinding::kuhn_munkres::{kuhn_munkres_min, Weights};

use crate::engine::cost::CostMatrix;
use crate::models::assignment::Assignment;

/// Fixed-point resolution of costs (1e-3).
const SCALE: f64 = 1_000.0;

/// Finite costs are clamped here so that a full row of them still sums below `INFEASIBLE`.
const MAX_FINITE_COST: f64 = 100_000.0;

/// Weight for pairs that must not be chosen. Kept far from `i64::MAX` since the
/// solver negates and sums weights internally.
const INFEASIBLE: i64 = 10_000_000_000_000;

struct I64Weights {
    rows: usize,
    columns: usize,
    cells: Vec<i64>,
}

impl I64Weights {
    fn from_costs(matrix: &CostMatrix) -> Self {
        let mut cells = Vec::with_capacity(matrix.rows() * matrix.columns());
        for row in 0..matrix.rows() {
            for col in 0..matrix.columns() {
                cells.push(to_weight(matrix.get(row, col)));
            }
        }
        Self {
            rows: matrix.rows(),
            columns: matrix.columns(),
            cells,
        }
    }
}

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.columns + col]
    }

    fn neg(&self) -> Self {
        Self {
            rows: self.rows,
            columns: self.columns,
            cells: self.cells.iter().map(|w| w.saturating_neg()).collect(),
        }
    }
}

fn to_weight(cost: f64) -> i64 {
    if cost.is_nan() || cost.is_infinite() {
        return INFEASIBLE;
    }
    (cost.clamp(0.0, MAX_FINITE_COST) * SCALE).round() as i64
}

/// Solves the assignment problem for `matrix`, minimising total cost.
///
/// A square matrix yields a bijection between rows and columns. For a
/// rectangular one every index of the smaller dimension is paired exactly once.
/// Output is ordered by row and is identical across calls on identical input.
pub fn solve(matrix: &CostMatrix) -> Vec<Assignment> {
    if matrix.is_empty() {
        return Vec::new();
    }

    if matrix.rows() > matrix.columns() {
        let mut assignments: Vec<Assignment> = solve(&matrix.transposed())
            .into_iter()
            .map(|a| Assignment {
                row: a.col,
                col: a.row,
                cost: a.cost,
            })
            .collect();
        assignments.sort_by_key(|a| a.row);
        return assignments;
    }

    let weights = I64Weights::from_costs(matrix);
    let (_total, columns) = kuhn_munkres_min(&weights);

    columns
        .into_iter()
        .enumerate()
        .map(|(row, col)| Assignment {
            row,
            col,
            cost: matrix.get(row, col),
        })
        .collect()
}

/// Sum of the original costs of an assignment.
pub fn total_cost(assignments: &[Assignment]) -> f64 {
    assignments.iter().map(|a| a.cost).sum()
}
