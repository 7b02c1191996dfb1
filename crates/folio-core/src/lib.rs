//! Core types and trait definitions for the Folio publishing model.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the edition documents, their validations, cloning and nested-node update
//! planning, downtime notices, and the [`store::PublishingStore`] trait that
//! storage backends implement.

pub mod artefact;
pub mod clock;
pub mod downtime;
pub mod edition;
pub mod error;
pub mod fact_check;
pub mod safe_html;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "factories"))]
pub mod factories;

pub use error::{Error, Result};
pub use validation::{Category, Lifecycle, Validate, ValidationContext, ValidationErrors};
