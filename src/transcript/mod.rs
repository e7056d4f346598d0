pub mod archival;
pub mod store;
pub mod types;

pub use archival::ArchivalPolicy;
pub use store::TranscriptStore;
pub use types::{ArchivedSummary, Message, Speaker};
