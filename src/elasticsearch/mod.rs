//! Elasticsearch Service integration module.
//!
//! This module provides the control-plane client used to describe, create,
//! update and delete a domain, plus the polling that waits for it to settle.

mod client;
mod types;
mod waiter;

pub use client::{AwsConnector, AwsDomainClient, DomainApi, DomainConnector};
pub use types::{parse_access_policies, CreateDomainRequest, DomainStatus, UpdateDomainRequest};
pub use waiter::{wait_for_active, WaitPolicy, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS};
