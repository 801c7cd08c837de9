//! Pure computation engines for the spread strategy and its ledger.
//!
//! Nothing here performs I/O; callers load rows, hand them to an engine and persist
//! whatever comes back.

pub mod grid;
pub mod grouper;
pub mod matcher;
pub mod planner;
pub mod pricer;
pub mod valuation;

pub use grid::{Evaluation, GridLayerEngine, Hold, RebalanceSignal};
pub use grouper::{GroupRejection, GroupingReport, RejectedGroup, TradeGrouper};
pub use matcher::{LedgerState, LegBook, Pairing, PositionPnLMatcher};
pub use planner::{LegOrder, PlanOutcome, RebalancePolicy, TargetPositionPlanner};
pub use pricer::{HedgeRatios, SpreadPricer};
pub use valuation::{ContractHealth, HealthWarning, Valuation};
