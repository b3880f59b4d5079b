use std::fmt;

use itertools::Itertools;

use crate::csp::domain::{DomainStore, Value, VarId};

/// A predicate over an ordered scope of variables.
pub trait Constraint: fmt::Debug {
    fn name(&self) -> &str;

    fn scope(&self) -> &[VarId];

    /// False only when the constraint is already falsified. Any unassigned
    /// scope member makes the constraint pass.
    fn check(&self, store: &DomainStore) -> bool;

    /// Whether `var = value` extends to a satisfying assignment of the rest of
    /// the scope, given current domains.
    fn has_support(&self, store: &DomainStore, var: VarId, value: Value) -> bool;

    /// The same predicate over a renumbered scope.
    fn rescoped(&self, scope: Vec<VarId>) -> Box<dyn Constraint>;

    fn arity(&self) -> usize {
        self.scope().len()
    }

    fn num_unassigned(&self, store: &DomainStore) -> usize {
        self.scope()
            .iter()
            .filter(|&&v| !store.get(v).is_assigned())
            .count()
    }
}

/// Linear equality over integer variables: the scope sums to `target`.
///
/// A revealed number `n` with `f` flagged neighbours becomes a sum constraint
/// over its covered neighbours with target `n - f`.
#[derive(Debug, Clone)]
pub struct SumConstraint {
    name: String,
    scope: Vec<VarId>,
    target: i32,
}

impl SumConstraint {
    pub fn new(name: impl Into<String>, scope: Vec<VarId>, target: i32) -> Self {
        SumConstraint {
            name: name.into(),
            scope,
            target,
        }
    }

    pub fn target(&self) -> i32 {
        self.target
    }
}

impl Constraint for SumConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn check(&self, store: &DomainStore) -> bool {
        let mut sum = 0;
        for &v in &self.scope {
            match store.get(v).value() {
                Some(value) => sum += value,
                None => return true,
            }
        }
        sum == self.target
    }

    fn has_support(&self, store: &DomainStore, var: VarId, value: Value) -> bool {
        if !self.scope.contains(&var) {
            return true;
        }
        if !store.get(var).in_cur_domain(value) {
            return false;
        }

        let mut assigned_sum = 0;
        let mut min_possible = 0;
        let mut max_possible = 0;
        for &other in self.scope.iter().filter(|&&v| v != var) {
            let other = store.get(other);
            if let Some(v) = other.value() {
                assigned_sum += v;
                continue;
            }
            let Some((low, high)) = other.cur_domain().minmax().into_option() else {
                return false;
            };
            min_possible += low;
            max_possible += high;
        }

        let remaining = self.target - (assigned_sum + value);
        (min_possible..=max_possible).contains(&remaining)
    }

    fn rescoped(&self, scope: Vec<VarId>) -> Box<dyn Constraint> {
        Box::new(SumConstraint {
            name: self.name.clone(),
            scope,
            target: self.target,
        })
    }
}
