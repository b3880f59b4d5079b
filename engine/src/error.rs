use thiserror::Error;

/// Rejected solver configuration. Raised before any search begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown search strategy '{0}', expected one of BT, FC, GAC")]
    UnknownStrategy(String),
    #[error("unknown variable order '{0}', expected one of random, fixed, mrv")]
    UnknownVarOrder(String),
    #[error("unknown guess policy '{0}'")]
    UnknownGuessPolicy(String),
    #[error("balance parameter {0} is outside [0, 1]")]
    BalanceOutOfRange(f64),
}

/// Errors raised while building a constraint problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CspError {
    #[error("constraint '{constraint}' references unknown variable {variable}")]
    UnknownVariable { constraint: String, variable: usize },
    #[error("constraint '{0}' lists a variable more than once")]
    DuplicateScope(String),
    #[error("variable '{0}' has an empty domain")]
    EmptyDomain(String),
}

/// Fatal outcomes of a turn's analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The revealed board admits no mine layout for one of its components.
    #[error("{variables} cells under {constraints} constraints have no layout")]
    Unsolvable {
        variables: usize,
        constraints: usize,
    },
    #[error(transparent)]
    Model(#[from] CspError),
}
