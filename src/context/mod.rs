//! Per-request context
//!
//! Every request handled by the server is wrapped in an [`Event`], which
//! owns the client's [`Input`] and the [`Output`] written back to it.

pub mod event;
pub mod input;
pub mod output;

pub use event::{Event, EventSummary, REQUEST_ID_HEADER};
pub use input::{Input, Params};
pub use output::{Output, HTML_CONTENT_TYPE};
