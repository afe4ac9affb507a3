use crate::config::{CorrelationConfig, MissingPolicy};
use crate::error::{CorrError, Result};
use crate::pearson::{
    check_cross_shape, check_shape, complete_cross_by, complete_pairwise_by, dense_cross,
    dense_matrix, has_missing, vector_missing,
};
use crate::rank::{ordinal_ranks, rank, rank_data};
use crate::upper::pack;
use ndarray::{Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2};
use tracing::debug;

/// Spearman's rho of two vectors from the closed form
/// `1 - 6 * sum(d^2) / (n^3 - n)`, with `d` the difference of ordinal ranks.
///
/// The closed form only holds without ties. Tied values are ranked in order
/// of appearance instead of sharing an average rank, which biases the
/// result; use [`pairwise`] when the data can repeat values.
///
/// NaN entries are ranked after every number rather than dropped, which
/// silently skews the result. Pass [`CorrelationConfig::strict`] (or
/// [`MissingPolicy::Reject`]) to [`spearman_with`] to refuse them instead.
///
/// ```
/// use ndarray::array;
///
/// let x = array![1.0, 2.0, 3.0, 4.0];
/// let y = array![2.0, 3.0, 4.0, 3.0];
/// let rho = tiecorr::spearman(&x, &y).unwrap();
/// assert!((rho - 0.8).abs() < 1e-12);
/// ```
pub fn spearman<S1, S2>(x: &ArrayBase<S1, Ix1>, y: &ArrayBase<S2, Ix1>) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    spearman_with(x, y, &CorrelationConfig::default())
}

/// [`spearman`] with an explicit missing-value policy. The degeneracy policy
/// does not apply: ordinal ranks never have zero spread.
pub fn spearman_with<S1, S2>(
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

    let rank_x = ordinal_ranks(x);
    let rank_y = ordinal_ranks(y);
    let d2: f64 = rank_x.iter().zip(rank_y.iter()).map(|(a, b)| (a - b).powi(2)).sum();

    let n = x.len() as f64;
    Ok(1.0 - 6.0 * d2 / (n.powi(3) - n))
}

fn rank_pair(x: Vec<f64>, y: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    (
        rank_data(&ArrayView1::from(&x[..])).to_vec(),
        rank_data(&ArrayView1::from(&y[..])).to_vec(),
    )
}

/// Tie-tolerant Spearman correlation between every pair of columns of
/// `data`: columns are rank-transformed with averaged ties, then fed to the
/// Pearson engine.
pub fn pairwise<S>(data: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64> + Sync,
{
    pairwise_with(data, &CorrelationConfig::default())
}

/// Like [`pairwise`]. With NaN under [`MissingPolicy::PairwiseComplete`]
/// each pair is cut down to its complete rows and re-ranked on those.
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
        debug!(n_rows, n_cols, "spearman: pairwise-complete path");
        complete_pairwise_by(data, config.degenerate, rank_pair)
    } else {
        debug!(n_rows, n_cols, "spearman: rank then dense pearson");
        dense_matrix(&rank(data), config.degenerate)
    }
}

pub fn upper_triangle<S>(data: &ArrayBase<S, Ix2>) -> Result<Vec<f64>>
where
    S: Data<Elem = f64> + Sync,
{
    pairwise(data).map(|corr| pack(&corr))
}

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
        debug!(lhs = ?lhs.dim(), rhs = ?rhs.dim(), "spearman: pairwise-complete cross path");
        complete_cross_by(lhs, rhs, config.degenerate, rank_pair)
    } else {
        debug!(lhs = ?lhs.dim(), rhs = ?rhs.dim(), "spearman: rank then dense cross");
        dense_cross(&rank(lhs), &rank(rhs), config.degenerate)
    }
}
