//! Recipe suggestions from a text-generation API.
//!
//! The product page lets shoppers ask how to cook what they are looking at.
//! The answer is opaque text shown in an HTMX fragment. Without an API key
//! the feature is off and the fragment says so.

mod client;
mod error;
mod types;

pub use client::RecipeClient;
pub use error::RecipeError;
