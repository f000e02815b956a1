pub mod error;
pub mod extractor;
pub mod fetch;
pub mod intercept;
pub mod patterns;
pub mod quick;
pub mod result;
pub mod sources;
pub mod transport;
pub mod verifier;

pub use error::ScanError;
pub use extractor::{ScanOptions, extract};
pub use fetch::PageFetcher;
pub use intercept::{NetworkLog, NetworkRecorder, ObservedTransport, RequestObserver};
pub use quick::QuickScanner;
pub use result::{Category, HttpMethod, OrderedSet, ProbeStatus, ResultSet, VerificationOutcome};
pub use sources::PageSources;
pub use transport::{HttpTransport, Transport};
pub use verifier::{ProbeMode, VerificationReport, Verifier};
