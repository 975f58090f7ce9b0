//! Read models of [domain] definitions.
//!
//! [domain]: crate::domain

pub mod offer;
pub mod posting;
