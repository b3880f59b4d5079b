use std::fmt;
use std::str::FromStr;

use crate::csp::{SearchOptions, Strategy, VarOrder};
use crate::error::ConfigError;

/// How to pick a cell when no cell is forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuessPolicy {
    /// Uniform over covered cells.
    Random,
    /// Lowest mine probability, frontier or not. Parsed from `safest` and
    /// `frontier`.
    Safest,
    /// Like [`GuessPolicy::Safest`], but keeps the best frontier cell unless an
    /// unconstrained cell beats it by more than the balance margin. Parsed from
    /// `frontier_balanced` and `frontier_relative_balanced`.
    Balanced,
    /// [`GuessPolicy::Balanced`] over cells of high-information constraints
    /// only. Parsed from `useful_relative_balanced` and `most_useful`.
    Useful,
}

impl FromStr for GuessPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(GuessPolicy::Random),
            "safest" | "frontier" => Ok(GuessPolicy::Safest),
            "frontier_balanced" | "frontier_relative_balanced" | "balanced" => {
                Ok(GuessPolicy::Balanced)
            }
            "useful_relative_balanced" | "most_useful" => Ok(GuessPolicy::Useful),
            _ => Err(ConfigError::UnknownGuessPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for GuessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GuessPolicy::Random => "random",
            GuessPolicy::Safest => "safest",
            GuessPolicy::Balanced => "frontier_relative_balanced",
            GuessPolicy::Useful => "useful_relative_balanced",
        })
    }
}

/// Everything the solve loop needs to know up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub strategy: Strategy,
    pub order: VarOrder,
    pub guess: GuessPolicy,
    /// Margin in `[0, 1]` used by the balanced policies.
    pub balance: f64,
    /// Seeds random variable ordering and guess tie-breaks.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            strategy: Strategy::Gac,
            order: VarOrder::Mrv,
            guess: GuessPolicy::Safest,
            balance: 0.0,
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Parses and validates string-named policies.
    pub fn parse(
        strategy: &str,
        order: &str,
        guess: &str,
        balance: f64,
    ) -> Result<Self, ConfigError> {
        let config = SolverConfig {
            strategy: strategy.parse()?,
            order: order.parse()?,
            guess: guess.parse()?,
            balance,
            seed: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.balance) {
            return Err(ConfigError::BalanceOutOfRange(self.balance));
        }
        Ok(())
    }

    /// All-solutions search with the configured strategy and order.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            strategy: self.strategy,
            order: self.order,
            all_solutions: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        let aliases = [
            ("frontier", GuessPolicy::Safest),
            ("Safest", GuessPolicy::Safest),
            ("frontier_balanced", GuessPolicy::Balanced),
            ("frontier_relative_balanced", GuessPolicy::Balanced),
            ("most_useful", GuessPolicy::Useful),
            ("useful_relative_balanced", GuessPolicy::Useful),
        ];
        for (name, policy) in aliases {
            assert_eq!(name.parse::<GuessPolicy>(), Ok(policy), "{name}");
        }
        assert_eq!(
            "optimal".parse::<GuessPolicy>(),
            Err(ConfigError::UnknownGuessPolicy("optimal".to_string()))
        );
    }

    #[test]
    fn test_parse_config() {
        let config = SolverConfig::parse("FC", "random", "random", 0.5).unwrap();
        assert_eq!(config.strategy, Strategy::ForwardChecking);
        assert_eq!(config.order, VarOrder::Random);
        assert_eq!(config.guess, GuessPolicy::Random);

        assert!(matches!(
            SolverConfig::parse("DFS", "mrv", "safest", 0.0),
            Err(ConfigError::UnknownStrategy(_))
        ));
        assert!(matches!(
            SolverConfig::parse("GAC", "queue", "safest", 0.0),
            Err(ConfigError::UnknownVarOrder(_))
        ));
    }

    #[test]
    fn test_balance_range() {
        assert_eq!(
            SolverConfig::parse("GAC", "mrv", "most_useful", 1.5),
            Err(ConfigError::BalanceOutOfRange(1.5))
        );
        let nan = SolverConfig {
            balance: f64::NAN,
            ..SolverConfig::default()
        };
        assert!(nan.validate().is_err());
        assert!(SolverConfig::default().validate().is_ok());
    }
}
