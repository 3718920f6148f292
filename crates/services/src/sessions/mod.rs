mod controller;
mod progress;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{FEEDBACK_CORRECT, FEEDBACK_INCORRECT, SessionController};
pub use progress::{ScoreReport, SessionProgress};
pub use state::SessionState;
pub use workflow::{AnswerOutcome, StudyLoopService};
