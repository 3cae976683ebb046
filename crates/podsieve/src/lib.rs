//! PodSieve - Episode Insight Presentation
//!
//! Filters, groups and projects per-channel company insights extracted from
//! podcast episodes, and records anonymous helpful / not-helpful votes.

pub mod analytics;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod grouping;
pub mod identity;
pub mod model;
pub mod page;
pub mod projection;
pub mod store;

pub use error::{ConfigError, FeedbackError, PageError, StoreError};
pub use model::{InsightId, InsightRecord, Sentiment, VoteType};
pub use page::{InsightPage, PageOptions, PageStatus};
