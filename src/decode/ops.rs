//! Dense-matrix helpers for the note decoder.
//!
//! All matrices are row-major `Vec<Vec<f32>>` with row = time frame and
//! column = pitch bin.

/// Returns the index of the maximum element, or `None` on empty input.
///
/// Ties are broken by the lowest index.
pub fn arg_max(row: &[f32]) -> Option<usize> {
    if row.is_empty() {
        return None;
    }
    let mut best = 0;
    for (i, &value) in row.iter().enumerate().skip(1) {
        if value > row[best] {
            best = i;
        }
    }
    Some(best)
}

/// Returns the index of the maximum element of each row.
pub fn arg_max_axis1(matrix: &[Vec<f32>]) -> Vec<Option<usize>> {
    matrix.iter().map(|row| arg_max(row)).collect()
}

/// Returns the coordinates of every element strictly greater than `threshold`,
/// as parallel row/column index vectors in row-major scan order.
pub fn where_greater_than(matrix: &[Vec<f32>], threshold: f32) -> (Vec<usize>, Vec<usize>) {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for (i, row) in matrix.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            if value > threshold {
                rows.push(i);
                cols.push(j);
            }
        }
    }
    (rows, cols)
}

/// Mean and sample standard deviation (denominator N−1) over all elements.
pub fn mean_std_dev(matrix: &[Vec<f32>]) -> (f32, f32) {
    let (sum, sum_squared, count) = matrix.iter().fold((0.0f32, 0.0f32, 0usize), |acc, row| {
        let (row_sum, row_sum_squared) = row
            .iter()
            .fold((0.0f32, 0.0f32), |(s, sq), &v| (s + v, sq + v * v));
        (acc.0 + row_sum, acc.1 + row_sum_squared, acc.2 + row.len())
    });

    let mean = sum / count as f32;
    let std_dev = ((sum_squared - sum * sum / count as f32) / (count as f32 - 1.0)).sqrt();
    (mean, std_dev)
}

/// Largest element of the matrix. Empty rows contribute nothing; an entirely
/// empty matrix yields `f32::NEG_INFINITY`.
pub fn global_max(matrix: &[Vec<f32>]) -> f32 {
    matrix
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max)
}

/// Element-wise minimum across a stack of equally-shaped matrices.
pub fn min_axis0(stack: &[Vec<Vec<f32>>]) -> Vec<Vec<f32>> {
    let mut out = stack[0].clone();
    for matrix in &stack[1..] {
        for (out_row, row) in out.iter_mut().zip(matrix.iter()) {
            for (out_value, &value) in out_row.iter_mut().zip(row.iter()) {
                *out_value = out_value.min(value);
            }
        }
    }
    out
}

/// Element-wise maximum across a stack of equally-shaped matrices.
pub fn max_axis0(stack: &[Vec<Vec<f32>>]) -> Vec<Vec<f32>> {
    let mut out = stack[0].clone();
    for matrix in &stack[1..] {
        for (out_row, row) in out.iter_mut().zip(matrix.iter()) {
            for (out_value, &value) in out_row.iter_mut().zip(row.iter()) {
                *out_value = out_value.max(value);
            }
        }
    }
    out
}

/// Relative maxima along the time axis, per pitch column.
///
/// A row is a relative maximum when its value is strictly greater than every
/// neighbour within `order` rows; rows near the edges compare against the
/// neighbours that exist. Plateaus never qualify. Results are ordered
/// column-major, like `scipy.signal.argrelmax` over a transposed input.
pub fn arg_rel_max(matrix: &[Vec<f32>], order: usize) -> Vec<(usize, usize)> {
    let mut result = Vec::new();
    if matrix.is_empty() {
        return result;
    }

    let n_rows = matrix.len();
    for col in 0..matrix[0].len() {
        for row in 0..n_rows {
            let lo = row.saturating_sub(order);
            let hi = usize::min(n_rows - 1, row + order);
            let is_rel_max = (lo..=hi)
                .filter(|&neighbour| neighbour != row)
                .all(|neighbour| matrix[row][col] > matrix[neighbour][col]);
            if is_rel_max {
                result.push((row, col));
            }
        }
    }

    result
}

/// Symmetric Gaussian window `w(n) = exp(-1/2 * ((n - (M-1)/2) / std)^2)`.
///
/// # Arguments
///
/// * `m` - Number of points in the window. Zero yields an empty vector.
/// * `std` - The standard deviation, sigma.
pub fn gaussian(m: usize, std: f32) -> Vec<f32> {
    if m == 0 {
        return vec![];
    }

    let midpoint = (m - 1) as f32 / 2.0;
    (0..m)
        .map(|n| (-(n as f32 - midpoint).powi(2) / (2.0 * std.powi(2))).exp())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_max_empty_is_none() {
        assert_eq!(arg_max(&[]), None);
    }

    #[test]
    fn arg_max_picks_maximum() {
        assert_eq!(arg_max(&[1.0, 2.0, -1.0]), Some(1));
    }

    #[test]
    fn arg_max_ties_break_low() {
        assert_eq!(arg_max(&[0.5, 3.0, 3.0, 1.0]), Some(1));
    }

    #[test]
    fn arg_max_axis1_per_row() {
        let matrix = vec![vec![10.0, 11.0, 12.0], vec![13.0, 14.0, 15.0]];
        assert_eq!(arg_max_axis1(&matrix), vec![Some(2), Some(2)]);
    }

    #[test]
    fn where_greater_than_scan_order() {
        let matrix = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let (rows, cols) = where_greater_than(&matrix, 1.0);
        assert_eq!(rows, vec![0, 1, 1]);
        assert_eq!(cols, vec![1, 0, 1]);
    }

    #[test]
    fn global_max_finds_largest() {
        let mut matrix = vec![vec![0.0; 200]; 2];
        matrix[0][100] = 100.0;
        matrix[1][7] = 99.0;
        assert_eq!(global_max(&matrix), 100.0);
    }

    #[test]
    fn arg_rel_max_single_peak() {
        let mut matrix = vec![vec![0.0, 0.0]; 7];
        matrix[3] = vec![1.0, 0.5];
        assert_eq!(arg_rel_max(&matrix, 1), vec![(3, 0), (3, 1)]);
    }

    #[test]
    fn arg_rel_max_rejects_plateau() {
        let column: Vec<Vec<f32>> = [0.0, 1.0, 1.0, 0.0].iter().map(|&v| vec![v]).collect();
        assert!(arg_rel_max(&column, 1).is_empty());
    }

    #[test]
    fn min_max_axis0_elementwise() {
        let a = vec![vec![1.0, 5.0], vec![2.0, 2.0]];
        let b = vec![vec![3.0, 4.0], vec![0.0, 9.0]];
        assert_eq!(
            min_axis0(&[a.clone(), b.clone()]),
            vec![vec![1.0, 4.0], vec![0.0, 2.0]]
        );
        assert_eq!(max_axis0(&[a, b]), vec![vec![3.0, 5.0], vec![2.0, 9.0]]);
    }

    #[test]
    fn gaussian_matches_scipy_window() {
        let expected = [
            0.53109599, 0.68194075, 0.82257756, 0.93210249, 0.99221794, 0.99221794, 0.93210249,
            0.82257756, 0.68194075, 0.53109599,
        ];
        let window = gaussian(10, 4.0);
        assert_eq!(window.len(), expected.len());
        for (value, expected) in window.iter().zip(expected.iter()) {
            assert!((value - expected).abs() < 1e-4, "{} vs {}", value, expected);
        }
    }

    #[test]
    fn gaussian_zero_length_is_empty() {
        assert!(gaussian(0, 4.0).is_empty());
    }

    #[test]
    fn mean_std_dev_of_normal_sample() {
        // Deterministic N(2, 4) sample via an LCG feeding Box-Muller.
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next_uniform = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64) / ((1u64 << 53) as f64)
        };

        let mut matrix = Vec::with_capacity(1000);
        for _ in 0..1000 {
            let mut row = Vec::with_capacity(1000);
            for _ in 0..500 {
                let u1 = next_uniform().max(1e-12);
                let u2 = next_uniform();
                let radius = (-2.0 * u1.ln()).sqrt();
                let theta = 2.0 * std::f64::consts::PI * u2;
                row.push((2.0 + 2.0 * radius * theta.cos()) as f32);
                row.push((2.0 + 2.0 * radius * theta.sin()) as f32);
            }
            matrix.push(row);
        }

        let (mean, std) = mean_std_dev(&matrix);
        assert!((mean - 2.0).abs() < 0.05, "mean {}", mean);
        assert!((std - 2.0).abs() < 0.05, "std {}", std);
    }
}
