mod poller;
mod service;

// Public API of the session subsystem.
pub use crate::error::SessionServiceError;
pub use poller::{PollEvent, PollHandle, SessionPoller};
pub use service::SessionService;
