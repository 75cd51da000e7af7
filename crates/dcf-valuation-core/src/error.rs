use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcfError {
    /// Price history, shares outstanding, beta or market cap absent or out of range.
    #[error("Missing market datum: {field} ({reason})")]
    MissingMarketDatum { field: String, reason: String },

    /// Revenue/EBIT history too thin to forecast from.
    #[error("Missing financial history: {0}")]
    MissingFinancialHistory(String),

    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    /// A forecast or discounting step left the representable Decimal range.
    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),
}

impl DcfError {
    pub(crate) fn missing_datum(field: &str, reason: impl Into<String>) -> Self {
        DcfError::MissingMarketDatum {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        DcfError::NumericOverflow {
            context: context.into(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        DcfError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the failures that abort a single ticker but should not stop a batch.
    pub fn is_per_ticker(&self) -> bool {
        matches!(
            self,
            DcfError::MissingMarketDatum { .. }
                | DcfError::MissingFinancialHistory(_)
                | DcfError::NumericOverflow { .. }
        )
    }
}
