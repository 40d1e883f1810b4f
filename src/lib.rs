//! # retspec
//!
//! retspec infers per-function error-return specifications from recorded
//! call-path logs and checks a program's call sites against a persisted
//! specification, flagging return values that are never checked.
//!
//! ## Core components
//!
//! - **PathModel** (`path`): parses one call-path log line into its callee
//!   chain and caller segment.
//! - **ValueDomain / RangeAlgebra** (`value`, `range`): the bool/pointer/
//!   integer value domain and the weighted interval algebra integer
//!   ranges are merged with.
//! - **ValueStats** (`stats`): per-(function, return-type) branch
//!   statistics built from a stream of observed values.
//! - **PerProgramAggregator** (`aggregator`): groups call sites by
//!   function, tracks wrapped-vs-unwrapped call sites, and runs the
//!   per-program election.
//! - **Voters** (`vote`): the generic threshold voters used at every
//!   election tier.
//! - **InterProgramElection** (`inter_election`): merges every program's
//!   verdict into the final [`spec::ErrorSpec`].
//! - **SpecChecker** (`checker`): applies a persisted spec to a freshly
//!   parsed program, producing bug reports.
//!
//! ## Usage
//!
//! This library backs the `retspec-infer` and `retspec-check` binaries,
//! but every component here is usable directly for programmatic analysis.

/// Per-program call-site aggregation, wrapping detection, and the
/// per-program election tiers.
pub mod aggregator;
/// Applies a persisted ErrorSpec to a parsed program, producing bug reports.
pub mod checker;
/// Command-line interface definitions.
pub mod cli;
/// Per-input-source diagnostic line history.
pub mod context;
/// Tunable election parameters.
pub mod config;
/// Comprehensive error handling with context.
pub mod error;
/// Merges per-program verdicts into the final ErrorSpec.
pub mod inter_election;
/// Call-path parsing and loop normalization.
pub mod path;
/// Weighted interval algebra over integer values.
pub mod range;
/// Shell completion utilities.
pub mod shells;
/// The persisted error specification format.
pub mod spec;
/// Per-function branch statistics.
pub mod stats;
/// The bool/pointer/integer value domain.
pub mod value;
/// Generic threshold-based voters.
pub mod vote;

#[cfg(test)]
mod tests {
    #[test]
    fn test_module_structure() {
        use crate::config::Tunables;
        use crate::range::{Count, RangeNode};
        use crate::shells::Shell;
        use crate::value::BoolValue;

        let _tunables = Tunables::default();
        let _node = RangeNode::point(5, Count::scalar(1));
        let _shell = Shell::Bash;
        let _value = BoolValue::True;
    }
}
