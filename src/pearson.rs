use crate::config::{CorrelationConfig, DegeneratePolicy, MissingPolicy};
use crate::error::{CorrError, Result};
use crate::upper::{pack, par_upper_triangle, unpack};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};
use rayon::prelude::*;
use tracing::debug;

/// Side of a pair that has no spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flat {
    Left,
    Right,
}

fn is_constant<'a, I>(mut values: I) -> bool
where
    I: Iterator<Item = &'a f64>,
{
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

/// Sample (N-1) Pearson correlation of two equal-length slices, clamped to [-1, 1].
pub(crate) fn pearson_slices(x: &[f64], y: &[f64]) -> std::result::Result<f64, Flat> {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 || is_constant(x.iter()) {
        return Err(Flat::Left);
    }
    if is_constant(y.iter()) {
        return Err(Flat::Right);
    }

    let n = x.len() as f64;
    let denom = n - 1.0;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        ss_x += dx * dx;
        ss_y += dy * dy;
    }

    let std_x = (ss_x / denom).sqrt();
    let std_y = (ss_y / denom).sqrt();
    if !std_x.is_finite() {
        return Err(Flat::Left);
    }
    if !std_y.is_finite() {
        return Err(Flat::Right);
    }
    Ok((cov / denom / (std_x * std_y)).clamp(-1.0, 1.0))
}

/// Applies the degeneracy policy to a pair outcome. `i` and `j` are the
/// column indices reported for the left and right side.
pub(crate) fn resolve(
    outcome: std::result::Result<f64, Flat>,
    i: usize,
    j: usize,
    policy: DegeneratePolicy,
) -> Result<f64> {
    match (outcome, policy) {
        (Ok(r), _) => Ok(r),
        (Err(_), DegeneratePolicy::Nan) => Ok(f64::NAN),
        (Err(Flat::Left), DegeneratePolicy::Error) => {
            Err(CorrError::DegenerateColumn { column: i })
        }
        (Err(Flat::Right), DegeneratePolicy::Error) => {
            Err(CorrError::DegenerateColumn { column: j })
        }
    }
}

/// Rows where both inputs are present.
pub(crate) fn complete_pairs(x: ArrayView1<f64>, y: ArrayView1<f64>) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .unzip()
}

pub(crate) fn check_shape(rows: usize, cols: usize, min_cols: usize) -> Result<()> {
    if rows < 2 || cols < min_cols {
        return Err(CorrError::InvalidShape { rows, cols });
    }
    Ok(())
}

/// Whether `data` holds NaN that has to be excluded. Fails under
/// [`MissingPolicy::Reject`] at the first NaN in row-major order.
pub(crate) fn has_missing<S>(data: &ArrayBase<S, Ix2>, policy: MissingPolicy) -> Result<bool>
where
    S: Data<Elem = f64>,
{
    let first = data.indexed_iter().find(|(_, v)| v.is_nan()).map(|(idx, _)| idx);
    match (first, policy) {
        (None, _) => Ok(false),
        (Some(_), MissingPolicy::PairwiseComplete) => Ok(true),
        (Some((row, column)), MissingPolicy::Reject) => {
            Err(CorrError::MissingValue { row, column })
        }
    }
}

pub(crate) fn vector_missing<S>(data: &ArrayBase<S, Ix1>, column: usize) -> Result<()>
where
    S: Data<Elem = f64>,
{
    match data.iter().position(|v| v.is_nan()) {
        Some(row) => Err(CorrError::MissingValue { row, column }),
        None => Ok(()),
    }
}

struct Centered {
    values: Array2<f64>,
    stds: Array1<f64>,
    flat: Vec<bool>,
}

fn center<S>(data: &ArrayBase<S, Ix2>) -> Result<Centered>
where
    S: Data<Elem = f64>,
{
    let (n_rows, n_cols) = data.dim();
    let means = data
        .mean_axis(Axis(0))
        .ok_or(CorrError::InvalidShape {
            rows: n_rows,
            cols: n_cols,
        })?
        .insert_axis(Axis(0));
    let values = data - &means;

    let denom = n_rows as f64 - 1.0;
    let stds = values.map_axis(Axis(0), |col| {
        let ss: f64 = col.iter().map(|v| v * v).sum();
        (ss / denom).sqrt()
    });
    // a non-finite std (infinite input) is as undefined as a zero one
    let flat = data
        .axis_iter(Axis(1))
        .zip(stds.iter())
        .map(|(col, std)| is_constant(col.iter()) || !std.is_finite())
        .collect();

    Ok(Centered { values, stds, flat })
}

fn first_flat(centered: &Centered, policy: DegeneratePolicy) -> Result<()> {
    if policy == DegeneratePolicy::Error {
        if let Some(column) = centered.flat.iter().position(|&f| f) {
            return Err(CorrError::DegenerateColumn { column });
        }
    }
    Ok(())
}

/// Covariance by one matrix product, then scaled by the standard deviations.
pub(crate) fn dense_matrix<S>(
    data: &ArrayBase<S, Ix2>,
    policy: DegeneratePolicy,
) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
{
    let centered = center(data)?;
    first_flat(&centered, policy)?;

    let denom = data.nrows() as f64 - 1.0;
    let mut corr = centered.values.t().dot(&centered.values) / denom;
    let n_cols = corr.nrows();
    for i in 0..n_cols {
        for j in i..n_cols {
            let r = if i == j {
                1.0
            } else if centered.flat[i] || centered.flat[j] {
                f64::NAN
            } else {
                let scale = centered.stds[i] * centered.stds[j];
                (corr[[i, j]] / scale).clamp(-1.0, 1.0)
            };
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }
    Ok(corr)
}

pub(crate) fn dense_cross<S1, S2>(
    lhs: &ArrayBase<S1, Ix2>,
    rhs: &ArrayBase<S2, Ix2>,
    policy: DegeneratePolicy,
) -> Result<Array2<f64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    let centered_lhs = center(lhs)?;
    let centered_rhs = center(rhs)?;
    first_flat(&centered_lhs, policy)?;
    first_flat(&centered_rhs, policy)?;

    let denom = lhs.nrows() as f64 - 1.0;
    let mut corr = centered_lhs.values.t().dot(&centered_rhs.values) / denom;
    for ((i, j), r) in corr.indexed_iter_mut() {
        *r = if centered_lhs.flat[i] || centered_rhs.flat[j] {
            f64::NAN
        } else {
            let scale = centered_lhs.stds[i] * centered_rhs.stds[j];
            (*r / scale).clamp(-1.0, 1.0)
        };
    }
    Ok(corr)
}

/// Pairwise-complete correlation matrix. `transform` sees each pair after
/// NaN rows are dropped and before the Pearson step.
pub(crate) fn complete_pairwise_by<S, F>(
    data: &ArrayBase<S, Ix2>,
    policy: DegeneratePolicy,
    transform: F,
) -> Result<Array2<f64>>
where
    S: Data<Elem = f64> + Sync,
    F: Fn(Vec<f64>, Vec<f64>) -> (Vec<f64>, Vec<f64>) + Sync,
{
    let n_cols = data.ncols();
    let packed = par_upper_triangle(n_cols, |i, j| {
        let (x, y) = complete_pairs(data.column(i), data.column(j));
        let (x, y) = transform(x, y);
        resolve(pearson_slices(&x, &y), i, j, policy)
    })?;
    Ok(unpack(&packed, n_cols))
}

pub(crate) fn complete_cross_by<S1, S2, F>(
    lhs: &ArrayBase<S1, Ix2>,
    rhs: &ArrayBase<S2, Ix2>,
    policy: DegeneratePolicy,
    transform: F,
) -> Result<Array2<f64>>
where
    S1: Data<Elem = f64> + Sync,
    S2: Data<Elem = f64> + Sync,
    F: Fn(Vec<f64>, Vec<f64>) -> (Vec<f64>, Vec<f64>) + Sync,
{
    let (lhs_cols, rhs_cols) = (lhs.ncols(), rhs.ncols());
    let row_results: Vec<Vec<f64>> = (0..lhs_cols)
        .into_par_iter()
        .map(|i| {
            (0..rhs_cols)
                .map(|j| {
                    let (x, y) = complete_pairs(lhs.column(i), rhs.column(j));
                    let (x, y) = transform(x, y);
                    resolve(pearson_slices(&x, &y), i, j, policy)
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    let mut corr = Array2::<f64>::zeros((lhs_cols, rhs_cols));
    for (i, row) in row_results.iter().enumerate() {
        for (j, &r) in row.iter().enumerate() {
            corr[[i, j]] = r;
        }
    }
    Ok(corr)
}

fn identity(x: Vec<f64>, y: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    (x, y)
}

/// Pearson correlation of two vectors.
pub fn pair<S1, S2>(x: &ArrayBase<S1, Ix1>, y: &ArrayBase<S2, Ix1>) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    pair_with(x, y, &CorrelationConfig::default())
}

pub fn pair_with<S1, S2>(
    x: &ArrayBase<S1, Ix1>,
    y: &ArrayBase<S2, Ix1>,
    config: &CorrelationConfig,
) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    if x.len() != y.len() {
        return Err(CorrError::ShapeMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    check_shape(x.len(), 2, 2)?;
    if config.missing == MissingPolicy::Reject {
        vector_missing(x, 0)?;
        vector_missing(y, 1)?;
    }
    let (xs, ys) = complete_pairs(x.view(), y.view());
    resolve(pearson_slices(&xs, &ys), 0, 1, config.degenerate)
}

/// Pearson correlation between every pair of columns of `data`
/// (rows are observations) with the default [`CorrelationConfig`].
///
/// The result is symmetric with a unit diagonal. Pairs involving a
/// zero-variance column are NaN.
pub fn pairwise<S>(data: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64> + Sync,
{
    pairwise_with(data, &CorrelationConfig::default())
}

/// Like [`pairwise`] with explicit missing-value and degeneracy handling.
///
/// Without NaN the covariance matrix comes from a single matrix product.
/// With NaN under [`MissingPolicy::PairwiseComplete`] each pair only uses the
/// rows where both columns are present.
pub fn pairwise_with<S>(
    data: &ArrayBase<S, Ix2>,
    config: &CorrelationConfig,
) -> Result<Array2<f64>>
where
    S: Data<Elem = f64> + Sync,
{
    let (n_rows, n_cols) = data.dim();
    check_shape(n_rows, n_cols, 2)?;

    if has_missing(data, config.missing)? {
        debug!(n_rows, n_cols, "pearson: pairwise-complete path");
        complete_pairwise_by(data, config.degenerate, identity)
    } else {
        debug!(n_rows, n_cols, "pearson: dense path");
        dense_matrix(data, config.degenerate)
    }
}

/// Packed upper triangle of [`pairwise`], see [`crate::upper::pack`].
pub fn upper_triangle<S>(data: &ArrayBase<S, Ix2>) -> Result<Vec<f64>>
where
    S: Data<Elem = f64> + Sync,
{
    pairwise(data).map(|corr| pack(&corr))
}

/// Correlation of every column of `lhs` with every column of `rhs`.
pub fn cross_matrix<S1, S2>(
    lhs: &ArrayBase<S1, Ix2>,
    rhs: &ArrayBase<S2, Ix2>,
) -> Result<Array2<f64>>
where
    S1: Data<Elem = f64> + Sync,
    S2: Data<Elem = f64> + Sync,
{
    cross_matrix_with(lhs, rhs, &CorrelationConfig::default())
}

/// `DegenerateColumn` indices refer to `lhs` when the flat column is on the
/// left and to `rhs` otherwise.
pub fn cross_matrix_with<S1, S2>(
    lhs: &ArrayBase<S1, Ix2>,
    rhs: &ArrayBase<S2, Ix2>,
    config: &CorrelationConfig,
) -> Result<Array2<f64>>
where
    S1: Data<Elem = f64> + Sync,
    S2: Data<Elem = f64> + Sync,
{
    check_cross_shape(lhs, rhs)?;
    let lhs_missing = has_missing(lhs, config.missing)?;
    let rhs_missing = has_missing(rhs, config.missing)?;

    if lhs_missing || rhs_missing {
        debug!(lhs = ?lhs.dim(), rhs = ?rhs.dim(), "pearson: pairwise-complete cross path");
        complete_cross_by(lhs, rhs, config.degenerate, identity)
    } else {
        debug!(lhs = ?lhs.dim(), rhs = ?rhs.dim(), "pearson: dense cross path");
        dense_cross(lhs, rhs, config.degenerate)
    }
}

pub(crate) fn check_cross_shape<S1, S2>(
    lhs: &ArrayBase<S1, Ix2>,
    rhs: &ArrayBase<S2, Ix2>,
) -> Result<()>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    if lhs.nrows() != rhs.nrows() {
        return Err(CorrError::ShapeMismatch {
            left: lhs.nrows(),
            right: rhs.nrows(),
        });
    }
    check_shape(lhs.nrows(), lhs.ncols(), 1)?;
    check_shape(rhs.nrows(), rhs.ncols(), 1)
}
