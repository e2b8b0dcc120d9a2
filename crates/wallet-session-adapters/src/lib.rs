pub mod clock;
pub mod config;
pub mod eip1193;
pub mod sink;

pub use clock::SystemClockAdapter;
pub use config::{RuntimeProfile, SessionConfig};
pub use eip1193::{DeterministicFaults, Eip1193Adapter, ProviderStats};
pub use sink::{RecordingSink, SinkNotification, TracingSink};
