use std::collections::VecDeque;

use crate::csp::domain::VarId;
use crate::csp::problem::{ConstraintId, Csp};

/// A maximal set of variables linked through shared constraint scopes,
/// together with the constraints lying entirely inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Sorted by declaration order.
    pub variables: Vec<VarId>,
    /// Sorted by declaration order.
    pub constraints: Vec<ConstraintId>,
}

/// Splits the constraint hypergraph into independent components.
///
/// Variables that appear in no constraint are free and belong to no component.
pub fn connected_components(csp: &Csp) -> Vec<Component> {
    let n = csp.num_variables();
    let mut membership: Vec<Option<usize>> = vec![None; n];
    let mut components = Vec::new();

    for start in csp.variables() {
        if membership[start].is_some() || csp.constraints_of(start).is_empty() {
            continue;
        }

        let index = components.len();
        let mut variables = Vec::new();
        let mut queue = VecDeque::from([start]);
        membership[start] = Some(index);

        while let Some(var) = queue.pop_front() {
            variables.push(var);
            for &cid in csp.constraints_of(var) {
                for &neighbor in csp.constraint(cid).scope() {
                    if membership[neighbor].is_none() {
                        membership[neighbor] = Some(index);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        variables.sort_unstable();
        components.push(Component {
            variables,
            constraints: Vec::new(),
        });
    }

    for (cid, constraint) in csp.constraints().iter().enumerate() {
        let scope = constraint.scope();
        let Some(&first) = scope.first() else {
            continue;
        };
        let Some(index) = membership[first] else {
            continue;
        };
        if scope.iter().all(|&v| membership[v] == Some(index)) {
            components[index].constraints.push(cid);
        }
    }

    components
}
