#![forbid(unsafe_code)]

pub mod classifier;
pub mod error;
pub mod sessions;

pub use monitor_core::Clock;

pub use classifier::{Classifier, PlaceholderClassifier};
pub use error::{ClassifierError, SessionServiceError};
pub use sessions::{PollEvent, PollHandle, SessionPoller, SessionService};
