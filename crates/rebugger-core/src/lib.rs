//! Purpose: capture-and-replay core. Intercepts a marked call site, records
//! the arguments its callee binds, snapshots every frame of a failing command
//! and renders snapshots as editable replay blocks.

pub mod callee;
pub mod caller;
pub mod capability;
pub mod config;
pub mod copy;
pub mod error;
pub mod instrument;
pub mod natives;
pub mod overwrite;
pub mod render;
pub mod session;
pub mod signature;
pub mod stacktrace;
pub mod store;

// Re-export key components
pub use callee::{capture_callee, CaptureTools, ShadowCache};
pub use caller::{capture_caller, CaptureOutcome, CapturedCall};
pub use capability::{CallResolver, Definition, Instrument, InstrumentMode, SourceLookup, TrackedSources};
pub use config::{ConfigError, RebugConfig};
pub use copy::{DeepCopy, StructuralCopy};
pub use error::{CaptureError, CaptureResult, SignatureError};
pub use instrument::BodyInstrumenter;
pub use natives::StashedCall;
pub use overwrite::Overwrites;
pub use render::Renderer;
pub use session::{Rebugger, StepIn};
pub use signature::{analyze, SignatureNames};
pub use stacktrace::{capture_stacktrace, CapturedFrame, CapturedTrace};
pub use store::{SharedStore, Snapshot, SnapshotStore};
