pub mod snapshot;

pub use snapshot::{content_digest, file_digest, GateDecision, SnapshotGate};
