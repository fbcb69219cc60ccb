use crate::error::AppError;
use crate::models::item::Item;
use crate::models::matching::MatchRequest;

/// Row-major cost table fed to the assignment solver.
///
/// `f64::INFINITY` marks a pairing that must never be reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: usize,
    columns: usize,
    cells: Vec<f64>,
}

impl CostMatrix {
    pub fn from_fn(rows: usize, columns: usize, mut cost: impl FnMut(usize, usize) -> f64) -> Self {
        let mut cells = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for col in 0..columns {
                cells.push(cost(row, col));
            }
        }
        Self {
            rows,
            columns,
            cells,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.columns + col]
    }

    pub fn transposed(&self) -> Self {
        Self::from_fn(self.columns, self.rows, |row, col| self.get(col, row))
    }
}

pub fn validate_quantity(quantity: f64) -> Result<(), AppError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "requested quantity must be a positive number, got {quantity}"
        )));
    }
    Ok(())
}

/// Percentage deviation of `available` from `requested`; 0 for an exact fit.
pub fn quantity_cost(requested: f64, available: f64) -> f64 {
    if available == requested {
        return 0.0;
    }
    (available - requested).abs() / requested * 100.0
}

/// Square n × n matrix over the items. The cost depends on the row only; the
/// columns exist so the general assignment solver can be reused.
pub fn build_cost_matrix(items: &[Item], request: &MatchRequest) -> Result<CostMatrix, AppError> {
    validate_quantity(request.quantity)?;

    let row_costs: Vec<f64> = items
        .iter()
        .map(|item| quantity_cost(request.quantity, item.quantity))
        .collect();

    Ok(CostMatrix::from_fn(items.len(), items.len(), |row, _| {
        row_costs[row]
    }))
}

/// Requests × items matrix for several requests competing for one item pool.
/// Pairs whose food types differ are infeasible.
pub fn build_batch_cost_matrix(
    requests: &[MatchRequest],
    items: &[Item],
) -> Result<CostMatrix, AppError> {
    for request in requests {
        validate_quantity(request.quantity)?;
    }

    Ok(CostMatrix::from_fn(requests.len(), items.len(), |row, col| {
        let request = &requests[row];
        let item = &items[col];
        if item.food_type == request.food_type && item.quantity > 0.0 {
            quantity_cost(request.quantity, item.quantity)
        } else {
            f64::INFINITY
        }
    }))
}

/// How well `available` satisfies `requested`, from 0 to 100.
pub fn match_score(requested: f64, available: f64) -> f64 {
    if available == requested {
        return 100.0;
    }
    if requested.is_nan() || requested <= 0.0 {
        return 0.0;
    }

    let diff_ratio = (available - requested).abs() / requested;
    (100.0 * (1.0 - diff_ratio)).max(0.0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::item::FoodType;

    fn item(id: i64, quantity: f64) -> Item {
        Item {
            id,
            name: "Rice".to_string(),
            quantity,
            food_type: FoodType::Grains,
            expiry: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            location: "Main St".to_string(),
            latitude: None,
            longitude: None,
            donor_name: "Corner Bakery".to_string(),
            image_path: None,
        }
    }

    fn request(quantity: f64) -> MatchRequest {
        MatchRequest {
            food_type: FoodType::Grains,
            quantity,
            preferred_location: None,
            max_distance: None,
            notes: None,
            limit: None,
        }
    }

    #[test]
    fn exact_quantity_scores_100() {
        for quantity in [0.5, 1.0, 10.0, 250.0] {
            assert_eq!(match_score(quantity, quantity), 100.0);
        }
    }

    #[test]
    fn score_decreases_with_deviation_and_floors_at_zero() {
        let requested = 10.0;
        let deviations = [0.0, 1.0, 2.5, 5.0, 9.0, 10.0, 15.0, 40.0];

        let above: Vec<f64> = deviations
            .iter()
            .map(|d| match_score(requested, requested + d))
            .collect();
        let below: Vec<f64> = deviations
            .iter()
            .take_while(|d| **d <= requested)
            .map(|d| match_score(requested, requested - d))
            .collect();

        assert!(above.windows(2).all(|w| w[0] >= w[1]));
        assert!(below.windows(2).all(|w| w[0] >= w[1]));
        assert!(above.iter().chain(below.iter()).all(|s| *s >= 0.0));
        assert_eq!(match_score(10.0, 5.0), 50.0);
        assert_eq!(match_score(10.0, 20.0), 0.0);
        assert_eq!(match_score(10.0, 35.0), 0.0);
    }

    #[test]
    fn cost_matrix_is_square_and_row_constant() {
        let items = vec![item(1, 10.0), item(2, 5.0), item(3, 20.0)];
        let matrix = build_cost_matrix(&items, &request(10.0)).unwrap();

        assert!(matrix.is_square());
        assert_eq!(matrix.rows(), 3);
        for col in 0..3 {
            assert_eq!(matrix.get(0, col), 0.0);
            assert_eq!(matrix.get(1, col), 50.0);
            assert_eq!(matrix.get(2, col), 100.0);
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let items = vec![item(1, 10.0)];
        for quantity in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                build_cost_matrix(&items, &request(quantity)),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn batch_matrix_marks_other_food_types_infeasible() {
        let mut dairy = item(2, 10.0);
        dairy.food_type = FoodType::Dairy;
        let items = vec![item(1, 8.0), dairy];

        let matrix = build_batch_cost_matrix(&[request(10.0)], &items).unwrap();

        assert_eq!((matrix.rows(), matrix.columns()), (1, 2));
        assert!((matrix.get(0, 0) - 20.0).abs() < 1e-9);
        assert!(matrix.get(0, 1).is_infinite());
    }

    #[test]
    fn empty_item_list_builds_empty_matrix() {
        let matrix = build_cost_matrix(&[], &request(4.0)).unwrap();
        assert!(matrix.is_empty());
    }
}
