//! Civicast - social post generation and scheduling for civic newsrooms
//!
//! This library turns articles (or freeform text) into platform-specific
//! promotional copy, lets an operator curate the result, and fans the chosen
//! posts out through an external scheduling provider while keeping a local
//! record of every submission.

pub mod config;
pub mod curation;
pub mod db;
pub mod error;
pub mod generation;
pub mod logging;
pub mod media;
pub mod provider;
pub mod registry;
pub mod scheduling;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use curation::CurationSession;
pub use db::{Database, PostQuery};
pub use error::{CivicastError, Result};
pub use types::{Article, Platform, PlatformAccount, Post, PostStatus, Variation};
