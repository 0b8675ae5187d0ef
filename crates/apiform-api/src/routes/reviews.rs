//! # Review Operation
//!
//! - POST /reviews — Submit a review.
//!
//! Storing reviews is not this service's concern. The handler hands each
//! validated [`Review`] to a [`ReviewSink`]; a sink failure surfaces as a
//! [`HandlerError`] and becomes a 500.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use apiform_schema::{FieldSchema, Method, OperationSchema, ValidatedInput};

use crate::dispatch::{handler, Handler, HandlerError, HandlerOutput};

pub const OPERATION_ID: &str = "post-review";

/// A validated review submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Destination for accepted reviews.
pub trait ReviewSink: Send + Sync {
    fn save(&self, review: &Review) -> Result<(), HandlerError>;
}

/// Sink that accepts every review and keeps none of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardReviews;

impl ReviewSink for DiscardReviews {
    fn save(&self, review: &Review) -> Result<(), HandlerError> {
        tracing::debug!(author = %review.author, rating = review.rating, "review discarded");
        Ok(())
    }
}

pub fn schema() -> OperationSchema {
    OperationSchema::new(OPERATION_ID, Method::Post, "/reviews")
        .summary("Post a review")
        .tag("Reviews")
        .default_status(201)
        .input(
            FieldSchema::string("author")
                .required()
                .max_length(10)
                .description("Author of the review"),
        )
        .input(
            FieldSchema::integer("rating")
                .required()
                .minimum(1)
                .maximum(5)
                .description("Rating from 1 to 5"),
        )
        .input(
            FieldSchema::string("message")
                .max_length(100)
                .description("Review message"),
        )
}

pub fn handler_for(sink: Arc<dyn ReviewSink>) -> Handler {
    handler(move |input: &ValidatedInput| {
        let review: Review = input.deserialize()?;
        sink.save(&review)?;
        Ok(HandlerOutput::empty())
    })
}
