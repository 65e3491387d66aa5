//! Convenience re-exports for common `ssamnote` types.
//!
//! ```ignore
//! use ssamnote::prelude::*;
//! ```
//!
//! Covers the refinement service, the editing workflow, and the record
//! types. Gateway wire types and the prompt builder stay in their modules.

// ── Refinement ──────────────────────────────────────────────────────
pub use crate::client::TransformClient;
pub use crate::config::RefineConfig;
pub use crate::error::{GenerationError, RefineError, StoreError, WorkflowError};
pub use crate::generation::{CannedGenerator, OpenRouterGenerator, OutputSchema, TextGenerator};
pub use crate::refine::{RefinementRequest, RefinementResult, RefinementService, Refiner};

// ── Workflow and records ────────────────────────────────────────────
pub use crate::record::{DomainTag, LogEntry, LogInput, Student, TimeBlock, Weather};
pub use crate::store::{LogSink, MemoryLogStore};
pub use crate::workflow::{EditableDraft, NoteSession, SessionState};

// ── Reading back ────────────────────────────────────────────────────
pub use crate::report::{StudentReport, WeeklySummary};
pub use crate::timeline::DayTimeline;
