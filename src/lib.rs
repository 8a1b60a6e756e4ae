// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # es-domain-deploy
//!
//! A declarative, idempotent deployer for a single AWS Elasticsearch Service
//! domain.
//!
//! ## Overview
//!
//! Given the desired configuration of a domain (engine version, instance
//! sizing, EBS storage, access policy, snapshot schedule), a deploy converges
//! the remote domain on it:
//!
//! - Caller inputs are merged over defaults and normalized
//! - The domain name is generated once and reused across deploys
//! - A missing domain is created, a differing one is updated, a matching one
//!   is left alone
//! - Any change already in flight is waited out before deciding
//!
//! Between invocations the name, ARN, endpoint, region and last name input are
//! persisted, so repeated deploys are idempotent.
//!
//! ## Modules
//!
//! - [`config`]: Deployment file parsing, input normalization and validation
//! - [`state`]: State storage backends (local, S3) and locking
//! - [`elasticsearch`]: Control-plane client and activation polling
//! - [`planner`]: Name resolution, field diff and plans
//! - [`reconciler`]: Deploy and remove
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! state:
//!   backend: local
//!
//! inputs:
//!   name: logs
//!   region: eu-west-1
//!   elasticsearchClusterConfig:
//!     InstanceCount: 2
//!     InstanceType: m5.large.elasticsearch
//!   ebsOptions:
//!     VolumeSize: 20
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod state;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{normalize, ConfigParser, ConfigValidator, DeploymentFile, DomainConfig};
pub use elasticsearch::{AwsConnector, DomainApi, DomainConnector, DomainStatus, WaitPolicy};
pub use error::{DeployError, Result};
pub use planner::{DomainPlan, NameResolver};
pub use reconciler::{DeployOutputs, Reconciler, RemoveOutputs};
pub use state::{ComponentState, LocalStateStore, S3StateStore, StateStore};
