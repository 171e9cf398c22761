pub mod astronomer;
pub mod body;
pub mod error;
pub mod observation;
pub mod patch;
pub mod query;
pub mod security;
pub mod stats;
pub mod user;
pub mod validation;

pub use error::AppError;
pub use query::{Fetch, Page, Sort, SortOrder};
pub use validation::{Validate, ValidationErrors};
