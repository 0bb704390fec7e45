//! configure-alertmanager-operator library
//!
//! Renders the Alertmanager configuration of an OpenShift cluster from the
//! PagerDuty, Dead Man's Snitch, GoAlert and OCM Agent inputs stored in the
//! monitoring namespace, and writes it to the `alertmanager-main` secret.
//!
//! ## Quick Start
//!
//! ```rust
//! use configure_alertmanager_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod alertmanager;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
