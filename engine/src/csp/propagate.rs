//! Single-constraint forward checking and worklist GAC.

use std::collections::VecDeque;

use crate::csp::domain::{Propagation, Reason, Value};
use crate::csp::problem::{ConstraintId, Csp};

/// Prunes the only unassigned variable of `constraint` down to the values
/// that keep it satisfied, tagging each prune with `reason`.
///
/// Constraints with zero or several unassigned variables are left alone.
pub fn forward_check(csp: &mut Csp, constraint: ConstraintId, reason: Reason) -> Propagation {
    let Csp {
        store, constraints, ..
    } = csp;
    let constraint = constraints[constraint].as_ref();

    let mut unassigned = constraint
        .scope()
        .iter()
        .copied()
        .filter(|&v| !store.get(v).is_assigned());
    let (Some(var), None) = (unassigned.next(), unassigned.next()) else {
        return Propagation::Consistent;
    };

    let candidates: Vec<Value> = store.get(var).cur_domain().collect();
    for value in candidates {
        store.set_value(var, Some(value));
        let satisfied = constraint.check(store);
        store.set_value(var, None);
        if !satisfied && store.prune_value(var, value, reason) == Propagation::WipeOut {
            return Propagation::WipeOut;
        }
    }
    Propagation::Consistent
}

/// Enforces generalized arc consistency starting from `queue`.
///
/// Every value without support is pruned under `reason`. A prune re-queues
/// the other constraints on that variable. Returns at the first wipe-out.
pub fn enforce_gac(
    csp: &mut Csp,
    queue: impl IntoIterator<Item = ConstraintId>,
    reason: Reason,
) -> Propagation {
    let Csp {
        store,
        constraints,
        constraints_of,
        ..
    } = csp;

    let mut queued = vec![false; constraints.len()];
    let mut worklist: VecDeque<ConstraintId> = VecDeque::new();
    for cid in queue {
        if !queued[cid] {
            queued[cid] = true;
            worklist.push_back(cid);
        }
    }

    while let Some(cid) = worklist.pop_front() {
        queued[cid] = false;
        let constraint = constraints[cid].as_ref();
        for &var in constraint.scope() {
            let candidates: Vec<Value> = store.get(var).cur_domain().collect();
            for value in candidates {
                if constraint.has_support(store, var, value) {
                    continue;
                }
                if store.prune_value(var, value, reason) == Propagation::WipeOut {
                    return Propagation::WipeOut;
                }
                for &other in &constraints_of[var] {
                    if other != cid && !queued[other] {
                        queued[other] = true;
                        worklist.push_back(other);
                    }
                }
            }
        }
    }
    Propagation::Consistent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::constraint::{Constraint, SumConstraint};

    fn sum(name: &str, scope: Vec<usize>, target: i32) -> Box<dyn Constraint> {
        Box::new(SumConstraint::new(name, scope, target))
    }

    fn chain() -> Csp {
        // a + b = 1, b + c = 1, c = 1
        let mut csp = Csp::new("chain");
        for name in ["a", "b", "c"] {
            csp.add_variable(name, [0, 1]).unwrap();
        }
        csp.add_constraint(sum("ab", vec![0, 1], 1)).unwrap();
        csp.add_constraint(sum("bc", vec![1, 2], 1)).unwrap();
        csp.add_constraint(sum("c", vec![2], 1)).unwrap();
        csp
    }

    fn domain(csp: &Csp, var: usize) -> Vec<Value> {
        csp.variable(var).cur_domain().collect()
    }

    #[test]
    fn test_forward_check_prunes_last_variable() {
        let mut csp = chain();
        let reason = Reason::Decision(0, 1);
        csp.store.set_value(0, Some(1));

        assert_eq!(forward_check(&mut csp, 0, reason), Propagation::Consistent);
        assert_eq!(domain(&csp, 1), vec![0]);

        csp.store.restore_values(reason);
        assert_eq!(domain(&csp, 1), vec![0, 1]);
    }

    #[test]
    fn test_forward_check_skips_multiple_unassigned() {
        let mut csp = chain();
        assert_eq!(
            forward_check(&mut csp, 0, Reason::Root),
            Propagation::Consistent
        );
        assert!(csp.store().ledger().is_empty());
    }

    #[test]
    fn test_forward_check_wipe_out() {
        let mut csp = chain();
        let reason = Reason::Decision(1, 1);
        csp.store.set_value(1, Some(1));
        // b = 1 forces c = 0, contradicting the unary c = 1.
        assert_eq!(forward_check(&mut csp, 1, reason), Propagation::Consistent);
        assert_eq!(forward_check(&mut csp, 2, reason), Propagation::WipeOut);
    }

    #[test]
    fn test_gac_propagates_transitively() {
        let mut csp = chain();
        let all: Vec<_> = (0..csp.constraints().len()).collect();
        assert_eq!(
            enforce_gac(&mut csp, all, Reason::Root),
            Propagation::Consistent
        );
        assert_eq!(domain(&csp, 2), vec![1]);
        assert_eq!(domain(&csp, 1), vec![0]);
        assert_eq!(domain(&csp, 0), vec![1]);
    }

    #[test]
    fn test_gac_detects_wipe_out_after_assignment() {
        let mut csp = chain();
        let reason = Reason::Decision(0, 0);
        csp.store.set_value(0, Some(0));
        let touching = csp.constraints_of(0).to_vec();
        let outcome = enforce_gac(&mut csp, touching, reason);
        assert_eq!(outcome, Propagation::WipeOut);

        csp.store.restore_values(reason);
        csp.store.set_value(0, None);
        assert!(csp.store().ledger().is_empty());
        assert_eq!(domain(&csp, 1), vec![0, 1]);
        assert_eq!(domain(&csp, 2), vec![0, 1]);
    }
}
