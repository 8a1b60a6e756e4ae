//! Planning module for deployment operations.
//!
//! This module resolves the domain name, compares the desired configuration
//! with the observed domain, and turns the result into a plan.

mod diff;
mod naming;
mod plan;

pub use diff::{DomainDiff, FieldChange};
pub use naming::{
    NameResolution, NameResolver, ANONYMOUS_PREFIX, ANONYMOUS_SUFFIX_LEN, GENERATED_SUFFIX_LEN,
};
pub use plan::{DomainPlan, PlanAction};
