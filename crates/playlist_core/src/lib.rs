pub mod access;
pub mod backoff;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod machine;
pub mod ports;
pub mod progress;
pub mod validation;

pub use access::{can_access, TopicAction, TopicView};
pub use dashboard::{Dashboard, DashboardState, PollSettings, RefreshOutcome};
pub use domain::{
    DocumentFile, DocumentOutline, GenerationTicket, Phase, Plan, SubscriptionState, Topic,
    UploadJob, UploadReceipt, Video, VideoStatus,
};
pub use error::{PipelineError, PipelineResult, ValidationError};
pub use machine::{CompletionMode, MachineSettings, MachineState, UploadMachine};
pub use ports::{DocumentService, PortError, PortResult};
