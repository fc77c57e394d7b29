//! Temporal Viewer core
//!
//! Turns a lookup request into the history of one record of a temporal table:
//!
//! - [`lookup`]: validates key input and coerces it into typed parameters
//! - [`diff`]: compares consecutive row versions (diff matrix, delta list,
//!   column history)
//! - [`results`]: the three response shapes
//! - [`processor`]: drives the above against `tempview_db` backends

pub mod diff;
pub mod lookup;
pub mod processor;
pub mod request;
pub mod results;

pub use diff::{ChangedColumn, ColumnHistoryEntry, DiffEngine, DiffError, DiffInterval};
pub use lookup::{validate_lookup, LookupValidation};
pub use processor::{ProcessError, TemporalViewerProcessor};
pub use request::{LookupInput, TemporalViewerRequest};
pub use results::{
    TableNames, TemporalViewerColumnHistoryResults, TemporalViewerDeltaResults,
    TemporalViewerResults,
};
