pub mod context;
pub mod error;
pub mod file;
pub mod service;
pub mod settings;
pub mod watch;

// Public library API. Hosts should only need these; the component modules
// stay public for embedding and tests.
pub use error::{ErrorCode, WorkspaceError};
pub use service::protocol::{RequestEnvelope, ServiceMessage, WorkspaceRequest, WorkspaceResponse};
pub use service::{PresetRoot, RootPicker, WorkspaceService};
pub use settings::{Settings, SettingsManager};
