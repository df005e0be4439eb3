pub mod channel;
pub mod error;
pub mod http;
pub mod info;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod timing;
pub mod wifi;

// Re-export the main entry points for easy access
pub use error::GpError;
pub use http::{DownloadObserver, MediaClient};
pub use info::DeviceInfo;
pub use media::MediaFile;
pub use session::{ApCredentials, Camera};
pub use timing::{DEFAULT_ATTEMPTS, RetryEvent, retry};
