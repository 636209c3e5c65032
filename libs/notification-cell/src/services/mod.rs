pub mod dispatcher;
pub mod templates;

pub use dispatcher::{deliver, HttpEmailDispatcher, NotificationDispatcher};
