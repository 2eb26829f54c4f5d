#![forbid(unsafe_code)]

pub mod assessment;
pub mod error;

pub use quiz_core::Clock;

pub use error::SessionError;

pub use assessment::{
    AssessmentConfig, AssessmentController, AssessmentLoopService, AssessmentRun,
    AttemptHistoryService, AttemptListItem, CountdownHandle, ExitReport,
};
