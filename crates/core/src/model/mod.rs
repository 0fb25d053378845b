mod ids;
mod result;
mod session;

pub use ids::{ParseIdError, SessionId};
pub use result::{
    ActivityLabel, ActivityResult, Distribution, ResultError, ResultMeta, TimelineWindow,
};
pub use session::{SessionRecord, SessionRecordError, SessionSnapshot, SessionStatus};
