pub mod submit;

pub use submit::{SubmissionGateway, SubmitError, SubmitImportCommand, SubmitImportResponse};
