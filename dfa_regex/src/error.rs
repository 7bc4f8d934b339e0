use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    #[error("unmatched '[' at position {position}")]
    UnmatchedBracket { position: usize },
    #[error("nothing to escape after '\\' at position {position}")]
    DanglingEscape { position: usize },
    #[error("invalid range '{lower}-{upper}' in square brackets")]
    InvalidRangeNotation { lower: char, upper: char },
    #[error("invalid quantifier bounds '{0}'")]
    InvalidQuantifierBounds(String),
    #[error("quantifier '{0}' follows another quantifier")]
    ContiguousQuantifiers(String),
    #[error("quantifier '{0}' has nothing to repeat")]
    DanglingQuantifier(String),
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
}

impl RegexError {
    /// Character offset in the pattern, known only for errors raised while tokenizing.
    pub fn position(&self) -> Option<usize> {
        match self {
            RegexError::UnmatchedBracket { position } | RegexError::DanglingEscape { position } => {
                Some(*position)
            }
            _ => None,
        }
    }
}
