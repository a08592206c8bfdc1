//! Client for the paginated Graph-style read API that feedwatch mirrors.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

mod retry;

pub use api::GraphApi;
pub use client::{GraphClient, ListingParams, COMMENT_FIELDS, POST_FIELDS};
pub use error::GraphError;
pub use types::{parse_graph_time, Page};
