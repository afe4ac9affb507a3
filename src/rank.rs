use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use rayon::prelude::*;

/// Average ranks (1-based) of a vector. Tied values share the mean of the
/// ranks they occupy; NaN is left out of the ranking and stays NaN.
pub fn rank_data<S>(data: &ArrayBase<S, Ix1>) -> Array1<f64>
where
    S: Data<Elem = f64>,
{
    let mut indexed_data: Vec<(usize, f64)> = data
        .iter()
        .cloned()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .collect();
    indexed_data.sort_unstable_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![f64::NAN; data.len()];
    let m = indexed_data.len();
    let mut i = 0;
    while i < m {
        let mut j = i;
        while j + 1 < m && indexed_data[j].1 == indexed_data[j + 1].1 {
            j += 1;
        }
        // mean of i+1..=j+1
        let rank = (i + j + 2) as f64 / 2.0;
        for &(idx, _) in &indexed_data[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    Array1::from(ranks)
}

/// Column-wise [`rank_data`]. Columns are ranked in parallel.
pub fn rank<S>(data: &ArrayBase<S, Ix2>) -> Array2<f64>
where
    S: Data<Elem = f64> + Sync,
{
    let (n_rows, n_cols) = data.dim();

    let rank_cols: Vec<Array1<f64>> = (0..n_cols)
        .into_par_iter()
        .map(|j| rank_data(&data.column(j)))
        .collect();

    let mut rank_matrix = Array2::<f64>::zeros((n_rows, n_cols));
    for (j, rank_col) in rank_cols.iter().enumerate() {
        rank_matrix.column_mut(j).assign(rank_col);
    }
    rank_matrix
}

/// Ordinal ranks (1-based) from a stable ascending sort.
///
/// Ties are not averaged: equal values are ranked in order of appearance.
/// NaN sorts after every number, so missing entries take the highest ranks.
pub fn ordinal_ranks<S>(data: &ArrayBase<S, Ix1>) -> Array1<f64>
where
    S: Data<Elem = f64>,
{
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| match (data[a].is_nan(), data[b].is_nan()) {
        (false, false) => data[a].total_cmp(&data[b]),
        (x, y) => x.cmp(&y),
    });

    let mut ranks = Array1::<f64>::zeros(data.len());
    for (pos, &idx) in order.iter().enumerate() {
        ranks[idx] = (pos + 1) as f64;
    }
    ranks
}
