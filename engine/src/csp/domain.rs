//! Variables, their live domains, and the reason-tagged pruning ledger.
//!
//! Pruning never copies a domain. Each removal is recorded as a [`Prune`]
//! carrying the decision that caused it, so backtracking undoes exactly the
//! removals a decision made even when several propagation paths interleave.

use itertools::Itertools;

/// Index of a variable inside its [`DomainStore`]. Also its declaration order.
pub type VarId = usize;

/// A domain value. Minesweeper cells use `0` (safe) and `1` (mine).
pub type Value = i32;

/// The decision active when a value was pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// Pruned before any decision was made.
    Root,
    /// Pruned while exploring `variable = value`.
    Decision(VarId, Value),
}

/// Outcome of a pruning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Consistent,
    /// A variable's current domain became empty. A dead branch, not an error.
    WipeOut,
}

/// One ledger entry: `value` was removed from `variable` because of `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prune {
    pub variable: VarId,
    pub value: Value,
    pub reason: Reason,
}

#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    domain: Vec<Value>,
    /// `live[i]` is true while `domain[i]` has not been pruned.
    live: Vec<bool>,
    live_count: usize,
    value: Option<Value>,
}

impl Variable {
    /// Creates an unassigned variable. Repeated domain values are dropped.
    pub fn new(name: impl Into<String>, domain: impl IntoIterator<Item = Value>) -> Self {
        let domain: Vec<Value> = domain.into_iter().unique().collect();
        let live_count = domain.len();
        Variable {
            name: name.into(),
            live: vec![true; domain.len()],
            domain,
            live_count,
            value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original, never-pruned domain.
    pub fn domain(&self) -> &[Value] {
        &self.domain
    }

    pub fn value(&self) -> Option<Value> {
        self.value
    }

    pub fn is_assigned(&self) -> bool {
        self.value.is_some()
    }

    /// Trial-assigns (or unassigns with `None`). Pruned values are kept pruned.
    pub fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    /// Values currently possible. An assigned variable exposes only its value,
    /// and nothing at all once that value has been pruned.
    pub fn cur_domain(&self) -> impl Iterator<Item = Value> + '_ {
        let assigned = self.value;
        self.domain
            .iter()
            .zip(&self.live)
            .filter(move |&(&v, &live)| live && assigned.is_none_or(|a| a == v))
            .map(|(&v, _)| v)
    }

    pub fn cur_domain_size(&self) -> usize {
        match self.value {
            Some(v) => usize::from(self.in_cur_domain(v)),
            None => self.live_count,
        }
    }

    pub fn in_cur_domain(&self, value: Value) -> bool {
        if self.value.is_some_and(|a| a != value) {
            return false;
        }
        self.position(value).is_some_and(|i| self.live[i])
    }

    /// Clears the assignment and restores the full original domain.
    pub fn reset(&mut self) {
        self.value = None;
        self.live.iter_mut().for_each(|l| *l = true);
        self.live_count = self.domain.len();
    }

    fn position(&self, value: Value) -> Option<usize> {
        self.domain.iter().position(|&v| v == value)
    }

    /// Returns false when the value was already pruned or is foreign.
    fn remove(&mut self, value: Value) -> bool {
        match self.position(value) {
            Some(i) if self.live[i] => {
                self.live[i] = false;
                self.live_count -= 1;
                true
            }
            _ => false,
        }
    }

    fn restore(&mut self, value: Value) {
        if let Some(i) = self.position(value) {
            if !self.live[i] {
                self.live[i] = true;
                self.live_count += 1;
            }
        }
    }
}

/// Arena of variables plus the shared undo ledger.
#[derive(Debug, Clone, Default)]
pub struct DomainStore {
    variables: Vec<Variable>,
    ledger: Vec<Prune>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, variable: Variable) -> VarId {
        self.variables.push(variable);
        self.variables.len() - 1
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, id: VarId) -> &Variable {
        &self.variables[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables.iter().enumerate()
    }

    pub fn set_value(&mut self, id: VarId, value: Option<Value>) {
        self.variables[id].set_value(value);
    }

    /// Removes `value` from `id`'s current domain and records why.
    ///
    /// Pruning an already-pruned value changes nothing and records nothing.
    pub fn prune_value(&mut self, id: VarId, value: Value, reason: Reason) -> Propagation {
        let variable = &mut self.variables[id];
        if variable.remove(value) {
            self.ledger.push(Prune {
                variable: id,
                value,
                reason,
            });
        }
        if variable.cur_domain_size() == 0 {
            Propagation::WipeOut
        } else {
            Propagation::Consistent
        }
    }

    /// Undoes every prune tagged with `reason`, on every variable.
    pub fn restore_values(&mut self, reason: Reason) {
        let ledger = std::mem::take(&mut self.ledger);
        let (undo, keep): (Vec<Prune>, Vec<Prune>) =
            ledger.into_iter().partition(|p| p.reason == reason);
        for prune in undo {
            self.variables[prune.variable].restore(prune.value);
        }
        self.ledger = keep;
    }

    /// Every current domain is a subset of its original domain.
    pub fn domains_within_original(&self) -> bool {
        self.variables
            .iter()
            .all(|v| v.cur_domain().all(|value| v.domain.contains(&value)))
    }

    pub fn ledger(&self) -> &[Prune] {
        &self.ledger
    }

    /// Empties the ledger and resets every variable. Called before and after
    /// each top-level search so no prune outlives it.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.variables.iter_mut().for_each(Variable::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_store(n: usize) -> DomainStore {
        let mut store = DomainStore::new();
        for i in 0..n {
            store.push(Variable::new(i.to_string(), [0, 1]));
        }
        store
    }

    #[test]
    fn test_prune_and_restore_round_trip() {
        let mut store = binary_store(2);
        let reason = Reason::Decision(1, 0);

        assert_eq!(store.prune_value(0, 1, reason), Propagation::Consistent);
        assert_eq!(store.get(0).cur_domain().collect::<Vec<_>>(), vec![0]);
        assert_eq!(store.prune_value(0, 0, reason), Propagation::WipeOut);
        assert_eq!(store.get(0).cur_domain_size(), 0);

        store.restore_values(reason);
        assert_eq!(store.get(0).cur_domain().collect::<Vec<_>>(), vec![0, 1]);
        assert!(store.ledger().is_empty());
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut store = binary_store(1);
        store.prune_value(0, 1, Reason::Root);
        store.prune_value(0, 1, Reason::Decision(0, 0));
        assert_eq!(store.ledger().len(), 1);
        assert_eq!(store.get(0).cur_domain_size(), 1);
    }

    #[test]
    fn test_restore_only_touches_matching_reason() {
        let mut store = binary_store(3);
        let a = Reason::Decision(0, 1);
        let b = Reason::Decision(1, 0);

        // Interleave prunes from two decisions across variables.
        store.prune_value(2, 0, a);
        store.prune_value(1, 1, b);
        store.prune_value(0, 0, a);
        store.prune_value(2, 1, b);

        store.restore_values(a);
        assert!(store.get(0).in_cur_domain(0));
        assert!(store.get(2).in_cur_domain(0));
        assert!(!store.get(2).in_cur_domain(1));
        assert!(!store.get(1).in_cur_domain(1));
        assert_eq!(store.ledger().len(), 2);
        assert!(store.ledger().iter().all(|p| p.reason == b));
    }

    #[test]
    fn test_assigned_domain_is_singleton() {
        let mut store = binary_store(1);
        store.set_value(0, Some(1));
        assert_eq!(store.get(0).cur_domain().collect::<Vec<_>>(), vec![1]);
        assert!(!store.get(0).in_cur_domain(0));
        assert_eq!(store.get(0).cur_domain_size(), 1);

        // Pruning the assigned value wipes the domain out.
        assert_eq!(store.prune_value(0, 1, Reason::Root), Propagation::WipeOut);

        store.set_value(0, None);
        assert_eq!(store.get(0).cur_domain().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_current_domain_is_subset_of_original() {
        let mut store = binary_store(1);
        store.prune_value(0, 0, Reason::Root);
        store.prune_value(0, 7, Reason::Root);
        let var = store.get(0);
        assert!(var.cur_domain().all(|v| var.domain().contains(&v)));
        assert_eq!(store.ledger().len(), 1);
        assert!(store.domains_within_original());
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut store = binary_store(2);
        store.set_value(0, Some(0));
        store.prune_value(1, 0, Reason::Decision(0, 0));
        store.reset();
        assert!(store.ledger().is_empty());
        assert!(!store.get(0).is_assigned());
        assert_eq!(store.get(1).cur_domain_size(), 2);
    }

    #[test]
    fn test_duplicate_domain_values_collapse() {
        let var = Variable::new("x", [1, 0, 1]);
        assert_eq!(var.domain(), &[1, 0]);
    }
}
