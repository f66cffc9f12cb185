pub mod collaborators;
pub mod manager;
pub mod services;

pub use collaborators::{CoreEvent, Hooks, NotificationSink, StatementAggregator};
pub use manager::BooksManager;
