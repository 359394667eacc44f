pub mod assessments;
pub mod submissions;

pub use assessments::AssessmentService;
pub use submissions::SubmissionService;
