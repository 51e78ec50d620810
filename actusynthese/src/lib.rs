// Library interface for actusynthese modules
// This allows tests and the binary to import modules

pub mod aggregator;
pub mod catalog;
pub mod error;
pub mod llm;
pub mod render;
pub mod session;
pub mod sources;
pub mod topic;

pub use error::{SummaryError, TopicError};
pub use llm::{Source, SummaryProvider, SummaryResult};
pub use session::{RequestStatus, SummaryController, SummaryState};
