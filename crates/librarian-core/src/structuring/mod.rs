//! Knowledge structuring session engine
//!
//! Turns one large source document into a tree of tagged, addressable
//! section files through a multi-step protocol driven by an external agent:
//! acquire and line-index the source, commit a file plan, inspect windows of
//! the source, compose sections from line ranges and literal insertions, and
//! finish once the plan is realized.

pub mod compose;
pub mod fetch;
pub mod format;
pub mod session;

pub use compose::compose_content;
pub use fetch::{source_document_to_lines, HttpSourceFetcher, SourceFetcher};
pub use session::{PendingSession, SectionInput, Session, SessionManager, MAX_SECTIONS_PER_CALL};
