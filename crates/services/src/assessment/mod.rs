mod controller;
mod countdown;
mod view;
mod workflow;

// Public API of the assessment subsystem.
pub use controller::{AssessmentConfig, AssessmentController, ExitReport};
pub use countdown::CountdownHandle;
pub use view::{AttemptHistoryService, AttemptListItem};
pub use workflow::{AssessmentLoopService, AssessmentRun};
