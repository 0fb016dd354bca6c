/// A failure to tokenize or parse an expression.
///
/// [`parse`](crate::parse) folds it into
/// [`Expr::Invalid`](crate::Expr::Invalid) together with the original text;
/// [`try_parse`](crate::try_parse) returns it as is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} (at offset {offset})")]
pub struct ParseError {
    /// Character offset into the source text where the problem was detected.
    pub offset: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        ParseError {
            offset,
            reason: reason.into(),
        }
    }
}
