use strum_macros::{Display, EnumString};

/// What to do with NaN entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum MissingPolicy {
    /// Drop NaN observations. Matrix functions drop them per column pair,
    /// the two-vector Spearman shortcut ranks them after every number.
    #[default]
    #[strum(to_string = "pairwise", serialize = "exclude")]
    PairwiseComplete,
    /// Refuse inputs that contain NaN.
    #[strum(to_string = "reject", serialize = "strict")]
    Reject,
}

/// What to do with a column that has no spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum DegeneratePolicy {
    /// Correlations involving the column become NaN. The diagonal stays 1.
    #[default]
    #[strum(serialize = "nan")]
    Nan,
    /// Fail with `CorrError::DegenerateColumn`.
    #[strum(serialize = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CorrelationConfig {
    pub missing: MissingPolicy,
    pub degenerate: DegeneratePolicy,
}

impl CorrelationConfig {
    /// Reject NaN and zero-variance columns instead of degrading to NaN.
    pub fn strict() -> Self {
        Self {
            missing: MissingPolicy::Reject,
            degenerate: DegeneratePolicy::Error,
        }
    }

    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_degenerate(mut self, degenerate: DegeneratePolicy) -> Self {
        self.degenerate = degenerate;
        self
    }
}
