use ndarray::{array, Array2};
use tiecorr::{pearson, pearson_pairwise, spearman, spearman_pairwise};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn assert_correlation_matrix(corr: &Array2<f64>, n: usize) {
    assert_eq!(corr.dim(), (n, n));
    for i in 0..n {
        assert_eq!(corr[[i, i]], 1.0);
        for j in 0..n {
            let r = corr[[i, j]];
            assert!((-1.0..=1.0).contains(&r), "entry ({i}, {j}) = {r} out of range");
            assert_eq!(r, corr[[j, i]]);
        }
    }
}

#[test]
fn synthetic_pairwise_checks() {
    let data = Array2::from_shape_vec((4, 2), vec![1.0, 4.0, 2.0, 3.0, 3.0, 2.0, 4.0, 1.0])
        .expect("matrix shape");

    let pearson_corr = pearson_pairwise(&data).unwrap();
    assert!(approx_eq(pearson_corr[[0, 1]], -1.0, 1e-12));

    let spearman_corr = spearman_pairwise(&data).unwrap();
    assert!(approx_eq(spearman_corr[[0, 1]], -1.0, 1e-12));
}

#[test]
fn synthetic_identity_checks() {
    let column = [0.3, -1.2, 4.5, 2.2, 0.0, 7.1];
    let data = Array2::from_shape_fn((6, 3), |(i, _)| column[i]);

    let pearson_corr = pearson_pairwise(&data).unwrap();
    let spearman_corr = spearman_pairwise(&data).unwrap();
    for corr in [&pearson_corr, &spearman_corr] {
        assert_correlation_matrix(corr, 3);
        assert!(corr.iter().all(|&r| approx_eq(r, 1.0, 1e-12)));
    }
}

#[test]
fn matrices_with_ties_keep_correlation_shape() {
    let data = array![
        [1.0, 5.0, 2.0, 9.0],
        [2.0, 3.0, 2.0, 1.0],
        [2.0, 3.0, 7.0, 4.0],
        [4.0, 1.0, 3.0, 4.0],
        [6.0, 0.5, 3.0, 8.0],
        [6.0, 2.0, 1.0, 2.0],
    ];

    assert_correlation_matrix(&pearson_pairwise(&data).unwrap(), 4);
    assert_correlation_matrix(&spearman_pairwise(&data).unwrap(), 4);
}

#[test]
fn spearman_pairwise_averages_ties() {
    let data = array![[1.0, 1.0], [2.0, 3.0], [2.0, 2.0], [4.0, 4.0]];

    let corr = spearman_pairwise(&data).unwrap();
    assert!(approx_eq(corr[[0, 1]], 3.0 / 10f64.sqrt(), 1e-12));

    let ranks = tiecorr::rank(&data);
    let expected = pearson::pair(&ranks.column(0), &ranks.column(1)).unwrap();
    assert!(approx_eq(corr[[0, 1]], expected, 1e-12));
}

#[test]
fn spearman_is_invariant_to_monotone_transforms() {
    let data = array![[1.0, 0.2], [2.0, 0.9], [3.0, 0.4], [4.0, 1.7], [5.0, 1.1]];
    let transformed = data.mapv(|v: f64| v.exp());

    let corr = spearman_pairwise(&data).unwrap();
    let corr_t = spearman_pairwise(&transformed).unwrap();
    assert!(approx_eq(corr[[0, 1]], corr_t[[0, 1]], 1e-12));
    assert!(approx_eq(corr[[0, 1]], 0.8, 1e-12));
}

#[test]
fn two_vector_spearman_closed_form() {
    let x = array![1.0, 2.0, 3.0, 4.0];
    let y = array![2.0, 3.0, 4.0, 3.0];
    assert!(approx_eq(spearman(&x, &y).unwrap(), 0.8, 1e-12));

    let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
    let y = array![50.0, 40.0, 30.0, 20.0, 10.0];
    assert!(approx_eq(spearman(&x, &y).unwrap(), -1.0, 1e-12));
}

#[test]
fn two_vector_spearman_accepts_views() {
    let data = array![[1.0, 2.0], [2.0, 3.0], [3.0, 4.0], [4.0, 3.0]];
    let rho = spearman(&data.column(0), &data.column(1)).unwrap();
    assert!(approx_eq(rho, 0.8, 1e-12));
}

#[test]
fn pearson_pair_matches_matrix_entry() {
    let data = array![[1.0, 2.5], [2.0, 2.0], [4.0, 7.0], [8.0, 8.5]];
    let corr = pearson_pairwise(&data).unwrap();
    let r = pearson::pair(&data.column(0), &data.column(1)).unwrap();
    assert!(approx_eq(corr[[0, 1]], r, 1e-12));
}

#[test]
fn upper_triangle_packs_pairwise_result() {
    let data = array![[1.0, 3.0, 2.0], [2.0, 1.0, 2.5], [3.0, 2.0, 0.5], [4.0, 5.0, 1.0]];

    let corr = pearson_pairwise(&data).unwrap();
    let packed = pearson::upper_triangle(&data).unwrap();
    assert_eq!(packed.len(), tiecorr::upper::upper_triangular_len(3));
    assert_eq!(packed, tiecorr::upper::pack(&corr));
    assert_eq!(tiecorr::upper::unpack(&packed, 3), corr);

    let packed = spearman::upper_triangle(&data).unwrap();
    assert_eq!(packed, tiecorr::upper::pack(&spearman_pairwise(&data).unwrap()));
}
