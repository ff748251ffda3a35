// src/lib.rs
//! Converging crawler and differential repair for recruiting-class rankings.
//!
//! A full crawl drives a ranking list to convergence ([`listing`]), then
//! reconciles every entity page ([`profile`]) in bounded windows
//! ([`batch`]). A repair run maps missing ranks to entities ([`gaps`]) and
//! re-fetches only those.

#[macro_use]
pub mod macros;

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod csv;
pub mod diagnostics;
pub mod error;
pub mod gaps;
pub mod identity;
pub mod listing;
pub mod log;
pub mod profile;
pub mod progress;
pub mod record;
pub mod scrape;
pub mod sink;
pub mod specs;
pub mod store;
pub mod validate;
