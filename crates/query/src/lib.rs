//! Swasya Query
//!
//! Front ends over [`ConsultationQueryEngine`](swasya_common::ConsultationQueryEngine):
//! - `query`: one question in, one JSON envelope out
//! - `console`: interactive question loop

pub mod console;
pub mod envelope;

pub use envelope::{run_single_shot, Envelope};
