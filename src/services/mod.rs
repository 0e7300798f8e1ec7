pub mod credentials;
pub mod notifier;
pub mod pipeline;
pub mod progress_store;

pub use credentials::CredentialStore;
pub use notifier::{Notifier, SmtpNotifier, LogNotifier};
pub use pipeline::{SearchPipeline, CommandPipeline};
pub use progress_store::{ProgressStore, RedisProgressStore, MemoryProgressStore};
