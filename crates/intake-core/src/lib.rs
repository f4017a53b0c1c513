pub mod accumulator;
pub mod actions;
pub mod config;
pub mod error;
pub mod persistence;
pub mod prefill;
pub mod presenter;
pub mod reducer;
pub mod schema;
pub mod state;
pub mod submission;
pub mod validation;

pub use actions::*;
pub use config::*;
pub use error::*;
pub use reducer::*;
pub use state::*;

pub use persistence::*;
pub use presenter::ResultView;
pub use submission::AnalysisRequest;
pub use submission::AnalysisResponse;
pub use submission::PROGRESS_STAGES;
