//! A small finite-domain constraint engine: reversible domains, constraint
//! propagation, backtracking search, and component decomposition.

pub mod constraint;
pub mod decompose;
pub mod domain;
pub mod problem;
pub mod propagate;
pub mod search;

pub use constraint::{Constraint, SumConstraint};
pub use decompose::{Component, connected_components};
pub use domain::{DomainStore, Propagation, Prune, Reason, Value, VarId, Variable};
pub use problem::{ConstraintId, Csp};
pub use propagate::{enforce_gac, forward_check};
pub use search::{
    Frontier, SearchOptions, SearchReport, Solution, SolutionCounts, SolutionSink, Strategy,
    VarOrder, search,
};
