use std::collections::HashMap;

use itertools::Itertools;

use crate::csp::constraint::Constraint;
use crate::csp::decompose::Component;
use crate::csp::domain::{DomainStore, Value, VarId, Variable};
use crate::error::CspError;

/// Index of a constraint inside its [`Csp`].
pub type ConstraintId = usize;

/// Variables, constraints, and the variable → constraints index.
///
/// After construction only variable domains change, through the store.
#[derive(Debug)]
pub struct Csp {
    name: String,
    pub(crate) store: DomainStore,
    pub(crate) constraints: Vec<Box<dyn Constraint>>,
    pub(crate) constraints_of: Vec<Vec<ConstraintId>>,
}

impl Csp {
    pub fn new(name: impl Into<String>) -> Self {
        Csp {
            name: name.into(),
            store: DomainStore::new(),
            constraints: Vec::new(),
            constraints_of: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        domain: impl IntoIterator<Item = Value>,
    ) -> Result<VarId, CspError> {
        let variable = Variable::new(name, domain);
        if variable.domain().is_empty() {
            return Err(CspError::EmptyDomain(variable.name().to_string()));
        }
        self.constraints_of.push(Vec::new());
        Ok(self.store.push(variable))
    }

    pub fn add_constraint(
        &mut self,
        constraint: Box<dyn Constraint>,
    ) -> Result<ConstraintId, CspError> {
        if let Some(&unknown) = constraint.scope().iter().find(|&&v| v >= self.store.len()) {
            return Err(CspError::UnknownVariable {
                constraint: constraint.name().to_string(),
                variable: unknown,
            });
        }
        if !constraint.scope().iter().all_unique() {
            return Err(CspError::DuplicateScope(constraint.name().to_string()));
        }

        let id = self.constraints.len();
        for &v in constraint.scope() {
            self.constraints_of[v].push(id);
        }
        self.constraints.push(constraint);
        Ok(id)
    }

    pub fn num_variables(&self) -> usize {
        self.store.len()
    }

    pub fn variables(&self) -> std::ops::Range<VarId> {
        0..self.store.len()
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        self.store.get(id)
    }

    pub fn store(&self) -> &DomainStore {
        &self.store
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    pub fn constraint(&self, id: ConstraintId) -> &dyn Constraint {
        self.constraints[id].as_ref()
    }

    pub fn constraints_of(&self, var: VarId) -> &[ConstraintId] {
        &self.constraints_of[var]
    }

    /// A fresh problem over one component, with variables renumbered in
    /// component order. Domains start unpruned.
    pub fn subproblem(&self, component: &Component) -> Result<Csp, CspError> {
        let mut sub = Csp::new(format!("{}/component", self.name));
        let mut renumber = HashMap::with_capacity(component.variables.len());
        for &old in &component.variables {
            let var = self.store.get(old);
            let new = sub.add_variable(var.name(), var.domain().iter().copied())?;
            renumber.insert(old, new);
        }
        for &cid in &component.constraints {
            let constraint = &self.constraints[cid];
            let unknown = |v: &VarId| CspError::UnknownVariable {
                constraint: constraint.name().to_string(),
                variable: *v,
            };
            let scope = constraint
                .scope()
                .iter()
                .map(|v| renumber.get(v).copied().ok_or_else(|| unknown(v)))
                .collect::<Result<Vec<_>, _>>()?;
            sub.add_constraint(constraint.rescoped(scope))?;
        }
        Ok(sub)
    }
}
