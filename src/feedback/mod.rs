pub mod aggregator;
pub mod client;
pub mod error;
pub mod generator;
pub mod service;

pub use aggregator::FeedbackAggregator;
pub use client::{FeedbackClient, HttpFeedbackClient};
pub use error::FeedbackError;
pub use generator::llm_generators;
pub use service::{FeedbackRequest, FeedbackResponse, FeedbackService};
