// notifier/mod.rs
// Daily newsletter composition and delivery

pub mod errors;
pub mod newsletter;
pub mod outbox;

pub use errors::NotifyError;
pub use newsletter::{Newsletter, NewsletterComposer, NewsletterInput};
pub use outbox::{FileOutbox, Notifier};
