pub mod assessments;

pub mod submissions;

pub use assessments::configure_assessments_routes;
pub use submissions::configure_submissions_routes;
