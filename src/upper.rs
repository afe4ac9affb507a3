use crate::error::Result;
use ndarray::Array2;
use rayon::prelude::*;

/// Number of entries in the upper triangle of an `n x n` matrix, diagonal included.
pub fn upper_triangular_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Row-major packing of `(i, j)` for `j >= i`.
pub fn pack(matrix: &Array2<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    let mut packed = Vec::with_capacity(upper_triangular_len(n));
    for i in 0..n {
        packed.extend(matrix.row(i).iter().skip(i));
    }
    packed
}

/// Inverse of [`pack`]: rebuilds the full symmetric matrix.
pub fn unpack(packed: &[f64], n: usize) -> Array2<f64> {
    debug_assert_eq!(packed.len(), upper_triangular_len(n));
    let mut matrix = Array2::<f64>::zeros((n, n));
    let mut k = 0;
    for i in 0..n {
        for j in i..n {
            matrix[[i, j]] = packed[k];
            matrix[[j, i]] = packed[k];
            k += 1;
        }
    }
    matrix
}

/// Packed upper triangle of a `k x k` correlation matrix, unit diagonal,
/// off-diagonal cells from `pair(i, j)`. Rows are computed in parallel.
pub(crate) fn par_upper_triangle<F>(k: usize, pair: F) -> Result<Vec<f64>>
where
    F: Fn(usize, usize) -> Result<f64> + Sync,
{
    let row_results: Vec<Vec<f64>> = (0..k)
        .into_par_iter()
        .map(|i| -> Result<Vec<f64>> {
            let mut row = Vec::with_capacity(k - i);
            row.push(1.0);
            for j in i + 1..k {
                row.push(pair(i, j)?);
            }
            Ok(row)
        })
        .collect::<Result<_>>()?;

    let mut packed = Vec::with_capacity(upper_triangular_len(k));
    for row in row_results {
        packed.extend_from_slice(&row);
    }
    Ok(packed)
}
