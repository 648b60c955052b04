pub mod error;
pub mod feedback;
pub mod order;
pub mod validate;

pub use error::ValidationError;
pub use feedback::{CreateFeedback, Feedback};
pub use order::{Catalog, CreateOrder, Locator, Order, OrderDraft, OrderOption, OrderSummary};
pub use validate::Submission;
