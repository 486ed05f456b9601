use crate::MAX_DECIMALS;

/// Errors raised by the amount codec.
///
/// Codec errors always surface to the caller: there is no fallback to an approximate amount.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("invalid amount `{amount}`: {reason}")]
    InvalidAmount { amount: String, reason: &'static str },
    #[error("invalid decimals {0}, expected at most {MAX_DECIMALS}")]
    InvalidDecimals(u32),
    #[error("`{amount}` cannot be expressed with {decimals} decimals without losing precision")]
    PrecisionLoss { amount: String, decimals: u32 },
    #[error("{0} does not fit in 256 bits")]
    Overflow(String),
}

impl UnitsError {
    pub(crate) fn invalid(amount: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidAmount { amount: amount.into(), reason }
    }
}
