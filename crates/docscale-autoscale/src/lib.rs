//! docscale-autoscale: reconciliation for a document database's reader fleet.
//!
//! Turns raw cluster and instance snapshots into the scaling status a
//! target-tracking controller expects, and decides which readers to
//! create or delete when the fleet has to change.
//!
//! # Status precedence
//!
//! ```text
//! status = Successful
//! if available != desired: status = Pending
//! if pending  > 0:         status = InProgress
//! if failed   > 0:         status = Failed
//! ```
//!
//! Only a `Pending` apply-scaling call acts on the cluster:
//!
//! ```text
//! delta = available - desired
//! delta < 0  → create |delta| readers copying an existing reader's class/engine
//! delta > 0  → delete delta readers, each from the zone with the most readers
//! ```

pub mod adapter;
pub mod error;
pub mod evaluator;
pub mod selector;

pub use adapter::{ScalingAdapter, SeedFn};
pub use error::{ScalingError, ScalingResult};
pub use evaluator::{ReaderCounts, evaluate};
pub use selector::{AzTally, ReaderTemplate, Removal, plan_creation, plan_removal};
