use serde::{Deserialize, Serialize};

/// One pairing chosen by the assignment solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub row: usize,
    pub col: usize,
    pub cost: f64,
}
