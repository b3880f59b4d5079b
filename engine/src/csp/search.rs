//! Backtracking search over a [`Csp`].
//!
//! BT, FC and GAC share one recursive skeleton; they differ only in the
//! propagation run after each trial assignment and in which domain the
//! skeleton iterates (original for BT, current for FC and GAC).

use std::fmt;
use std::str::FromStr;

use rand::{Rng, RngCore};
use tracing::trace;

use crate::csp::domain::{Propagation, Reason, Value, VarId};
use crate::csp::problem::Csp;
use crate::csp::propagate::{enforce_gac, forward_check};
use crate::error::ConfigError;

/// Propagation run after each decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Plain backtracking: only fully assigned constraints are checked.
    Backtracking,
    ForwardChecking,
    Gac,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BT" => Ok(Strategy::Backtracking),
            "FC" => Ok(Strategy::ForwardChecking),
            "GAC" => Ok(Strategy::Gac),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Backtracking => "BT",
            Strategy::ForwardChecking => "FC",
            Strategy::Gac => "GAC",
        })
    }
}

/// Which unassigned variable the search decides next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarOrder {
    /// Uniform pick.
    Random,
    /// Declaration order.
    Fixed,
    /// Smallest current domain, ties broken by declaration order.
    Mrv,
}

impl FromStr for VarOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(VarOrder::Random),
            "fixed" => Ok(VarOrder::Fixed),
            "mrv" => Ok(VarOrder::Mrv),
            _ => Err(ConfigError::UnknownVarOrder(s.to_string())),
        }
    }
}

impl fmt::Display for VarOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VarOrder::Random => "random",
            VarOrder::Fixed => "fixed",
            VarOrder::Mrv => "mrv",
        })
    }
}

/// The not-yet-assigned variables.
#[derive(Debug, Clone)]
pub struct Frontier {
    order: VarOrder,
    unassigned: Vec<VarId>,
}

impl Frontier {
    pub fn new(order: VarOrder, variables: impl IntoIterator<Item = VarId>) -> Self {
        let mut unassigned: Vec<VarId> = variables.into_iter().collect();
        if order == VarOrder::Fixed {
            // Extract and reinsert at the back.
            unassigned.reverse();
        }
        Frontier { order, unassigned }
    }

    pub fn is_empty(&self) -> bool {
        self.unassigned.is_empty()
    }

    pub fn len(&self) -> usize {
        self.unassigned.len()
    }

    pub fn extract(&mut self, csp: &Csp, rng: &mut dyn RngCore) -> Option<VarId> {
        if self.unassigned.is_empty() {
            return None;
        }
        match self.order {
            VarOrder::Random => {
                let i = rng.random_range(0..self.unassigned.len());
                Some(self.unassigned.swap_remove(i))
            }
            VarOrder::Fixed => self.unassigned.pop(),
            VarOrder::Mrv => {
                let (i, _) = self
                    .unassigned
                    .iter()
                    .enumerate()
                    .min_by_key(|&(_, &v)| (csp.variable(v).cur_domain_size(), v))?;
                Some(self.unassigned.swap_remove(i))
            }
        }
    }

    pub fn insert(&mut self, var: VarId) {
        self.unassigned.push(var);
    }
}

/// A complete assignment, indexed by [`VarId`].
pub type Solution = Vec<Value>;

/// Per-variable value totals folded over every solution found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionCounts {
    pub total: u64,
    /// Sum of each variable's value across solutions. For `{0,1}` domains this
    /// is the number of solutions assigning it `1`.
    pub value_sums: Vec<u64>,
}

impl SolutionCounts {
    pub fn new(variables: usize) -> Self {
        SolutionCounts {
            total: 0,
            value_sums: vec![0; variables],
        }
    }

    /// Fraction of solutions assigning `var` the value `1`, or `None` when
    /// nothing was counted.
    pub fn marginal(&self, var: VarId) -> Option<f64> {
        (self.total > 0).then(|| self.value_sums[var] as f64 / self.total as f64)
    }
}

/// Where solutions go: materialized, or folded into counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionSink {
    Collect(Vec<Solution>),
    /// Only meaningful for `{0,1}` domains: values are summed per variable.
    Count(SolutionCounts),
}

impl SolutionSink {
    pub fn collect() -> Self {
        SolutionSink::Collect(Vec::new())
    }

    pub fn count(csp: &Csp) -> Self {
        SolutionSink::Count(SolutionCounts::new(csp.num_variables()))
    }

    pub fn len(&self) -> u64 {
        match self {
            SolutionSink::Collect(solutions) => solutions.len() as u64,
            SolutionSink::Count(counts) => counts.total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Folds collected solutions into counts over `variables` variables.
    pub fn into_counts(self, variables: usize) -> SolutionCounts {
        match self {
            SolutionSink::Count(counts) => counts,
            SolutionSink::Collect(solutions) => {
                let mut counts = SolutionSink::Count(SolutionCounts::new(variables));
                for solution in solutions {
                    counts.accept(solution.into_iter());
                }
                counts.into_counts(variables)
            }
        }
    }

    fn accept(&mut self, solution: impl Iterator<Item = Value>) {
        match self {
            SolutionSink::Collect(solutions) => solutions.push(solution.collect()),
            SolutionSink::Count(counts) => {
                counts.total += 1;
                for (sum, value) in counts.value_sums.iter_mut().zip(solution) {
                    debug_assert!(value >= 0, "counted a negative value {value}");
                    *sum += u64::try_from(value).unwrap_or(0);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub strategy: Strategy,
    pub order: VarOrder,
    pub all_solutions: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            strategy: Strategy::Gac,
            order: VarOrder::Mrv,
            all_solutions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub sink: SolutionSink,
    /// Non-terminal recursive calls made.
    pub nodes: u64,
}

/// Runs one top-level search. Domains are reset before it starts and again
/// when it returns, so the ledger never leaks into the next search.
pub fn search(
    csp: &mut Csp,
    options: &SearchOptions,
    sink: SolutionSink,
    rng: &mut dyn RngCore,
) -> SearchReport {
    csp.store.reset();
    let mut search = Search {
        csp,
        options: *options,
        sink,
        nodes: 0,
        rng,
    };
    search.run();

    let Search {
        csp, sink, nodes, ..
    } = search;
    debug_assert!(
        csp.store.ledger().iter().all(|p| p.reason == Reason::Root),
        "decision prunes left in the ledger"
    );
    csp.store.reset();
    trace!(
        csp = csp.name(),
        nodes,
        solutions = sink.len(),
        "search finished"
    );
    SearchReport { sink, nodes }
}

struct Search<'a> {
    csp: &'a mut Csp,
    options: SearchOptions,
    sink: SolutionSink,
    nodes: u64,
    rng: &'a mut dyn RngCore,
}

impl Search<'_> {
    fn run(&mut self) {
        let root = match self.options.strategy {
            Strategy::Backtracking => Propagation::Consistent,
            Strategy::ForwardChecking => {
                let unary: Vec<_> = (0..self.csp.constraints.len())
                    .filter(|&c| self.csp.constraint(c).arity() == 1)
                    .collect();
                unary
                    .into_iter()
                    .map(|c| forward_check(self.csp, c, Reason::Root))
                    .find(|&p| p == Propagation::WipeOut)
                    .unwrap_or(Propagation::Consistent)
            }
            Strategy::Gac => {
                let all = 0..self.csp.constraints.len();
                enforce_gac(self.csp, all, Reason::Root)
            }
        };
        if root == Propagation::WipeOut {
            return;
        }

        let mut frontier = Frontier::new(self.options.order, self.csp.variables());
        self.descend(&mut frontier);
    }

    /// Returns true once the search should stop.
    fn descend(&mut self, frontier: &mut Frontier) -> bool {
        if frontier.is_empty() {
            let store = &self.csp.store;
            self.sink
                .accept(store.iter().map(|(_, v)| v.value().unwrap_or_default()));
            return !self.options.all_solutions;
        }

        self.nodes += 1;
        debug_assert!(
            self.csp.store.domains_within_original(),
            "current domain escaped its original domain"
        );
        let Some(var) = frontier.extract(self.csp, &mut *self.rng) else {
            return false;
        };

        let values: Vec<Value> = match self.options.strategy {
            Strategy::Backtracking => self.csp.variable(var).domain().to_vec(),
            _ => self.csp.variable(var).cur_domain().collect(),
        };

        let mut stop = false;
        for value in values {
            self.csp.store.set_value(var, Some(value));
            let reason = Reason::Decision(var, value);

            if self.propagate(var, reason) == Propagation::Consistent {
                stop = self.descend(frontier);
            }
            if self.options.strategy != Strategy::Backtracking {
                self.csp.store.restore_values(reason);
            }
            if stop {
                break;
            }
        }

        self.csp.store.set_value(var, None);
        frontier.insert(var);
        stop
    }

    fn propagate(&mut self, var: VarId, reason: Reason) -> Propagation {
        let touching = self.csp.constraints_of(var).to_vec();
        match self.options.strategy {
            Strategy::Backtracking => {
                let store = &self.csp.store;
                let violated = touching.iter().any(|&c| {
                    let constraint = self.csp.constraint(c);
                    constraint.num_unassigned(store) == 0 && !constraint.check(store)
                });
                if violated {
                    Propagation::WipeOut
                } else {
                    Propagation::Consistent
                }
            }
            Strategy::ForwardChecking => {
                for c in touching {
                    if self.csp.constraint(c).num_unassigned(&self.csp.store) == 1
                        && forward_check(self.csp, c, reason) == Propagation::WipeOut
                    {
                        return Propagation::WipeOut;
                    }
                }
                Propagation::Consistent
            }
            Strategy::Gac => enforce_gac(self.csp, touching, reason),
        }
    }
}
