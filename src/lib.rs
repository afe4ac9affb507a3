//! Spearman and Pearson correlation over `ndarray` matrices.
//!
//! Matrices are laid out with observations in rows and variables in columns.
//! The tie-tolerant Spearman path ranks every column with averaged ties and
//! runs the Pearson engine on the ranks.

pub mod config;
pub mod error;
pub mod pearson;
pub mod rank;
pub mod spearman;
pub mod upper;

pub use config::{CorrelationConfig, DegeneratePolicy, MissingPolicy};
pub use error::{CorrError, Result};
pub use pearson::pairwise as pearson_pairwise;
pub use rank::{rank, rank_data};
pub use spearman::{pairwise as spearman_pairwise, spearman};
