//! # Alertmanager
//!
//! Data model and builder for the Alertmanager configuration document written to the
//! `alertmanager-main` secret.

pub mod builder;
pub mod inhibit;
pub mod receivers;
pub mod routes;
pub mod types;

pub use builder::{build_config, ConfigInputs};
pub use types::{
    Config, ConfigError, EmailConfig, GlobalConfig, HttpConfig, InhibitRule, NamespaceConfig,
    NotifierConfig, PagerdutyConfig, Receiver, Route, WebhookConfig,
};
