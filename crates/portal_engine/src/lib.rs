//! Portal engine: collaborator I/O and the async controllers that drive the core state machines.
mod api;
mod connection;
mod dashboard;
mod relay;
mod types;
mod upload;

pub use api::{ApplicationSource, PortalSettings, ProgressSink, ReqwestPortalClient, ResumeApi};
pub use connection::ConnectionController;
pub use dashboard::load_dashboard;
pub use relay::{
    ExtensionProbe, FixedExtensionProbe, RelayConnector, RelaySession, TcpExtensionProbe,
    WsRelayConnector,
};
pub use types::{ApiError, RelayError, ResumeUpload, TransferProgress};
pub use upload::{UploadController, UploadSettings};
