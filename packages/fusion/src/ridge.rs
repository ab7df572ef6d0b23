//! Closed-form ridge regression.
//!
//! Solves `(XᵗX + λI)β = Xᵗy` by Gauss-Jordan elimination with partial
//! pivoting. Columns whose best pivot is below [`PIVOT_EPSILON`] are
//! treated as rank-deficient: they are not eliminated and their
//! coefficient is `0.0`.

/// Pivots with a smaller magnitude mark a rank-deficient column.
pub const PIVOT_EPSILON: f64 = 1e-10;

/// Solves the square system held in `augmented` (`n` rows of `n + 1`
/// columns, the last column being the right-hand side).
///
/// Rows shorter than `n + 1` are treated as zero-padded.
#[must_use]
pub fn solve_linear_system(mut augmented: Vec<Vec<f64>>) -> Vec<f64> {
    let n = augmented.len();
    for row in &mut augmented {
        row.resize(n + 1, 0.0);
    }

    let mut deficient = vec![false; n];

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| augmented[a][col].abs().total_cmp(&augmented[b][col].abs()))
            .unwrap_or(col);

        if augmented[pivot_row][col].abs() < PIVOT_EPSILON {
            deficient[col] = true;
            continue;
        }

        augmented.swap(col, pivot_row);
        let pivot = augmented[col][col];
        let pivot_values = augmented[col].clone();

        for (r, row) in augmented.iter_mut().enumerate() {
            if r == col {
                continue;
            }
            let factor = row[col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for (cell, pivot_cell) in row.iter_mut().zip(&pivot_values).skip(col) {
                *cell -= factor * pivot_cell;
            }
        }
    }

    (0..n)
        .map(|i| {
            if deficient[i] {
                0.0
            } else {
                augmented[i][n] / augmented[i][i]
            }
        })
        .collect()
}

/// Fits ridge coefficients for design matrix `x` (one row per sample)
/// and targets `y`.
///
/// Returns an empty vector when `x` has no rows or no columns.
#[must_use]
pub fn fit_ridge<R: AsRef<[f64]>>(x: &[R], y: &[f64], lambda: f64) -> Vec<f64> {
    let k = x.first().map_or(0, |row| row.as_ref().len());
    if k == 0 {
        return Vec::new();
    }

    // Normal equations, augmented with Xᵗy.
    let mut augmented = vec![vec![0.0; k + 1]; k];
    for (row, target) in x.iter().zip(y) {
        let row = row.as_ref();
        for i in 0..k {
            let xi = row.get(i).copied().unwrap_or(0.0);
            for j in 0..k {
                augmented[i][j] += xi * row.get(j).copied().unwrap_or(0.0);
            }
            augmented[i][k] += xi * target;
        }
    }
    for (i, row) in augmented.iter_mut().enumerate() {
        row[i] += lambda;
    }

    solve_linear_system(augmented)
}

/// Dot product of `coefficients` and `features`.
#[must_use]
pub fn predict(coefficients: &[f64], features: &[f64]) -> f64 {
    coefficients.iter().zip(features).map(|(b, x)| b * x).sum()
}
