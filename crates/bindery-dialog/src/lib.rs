#![forbid(unsafe_code)]

//! Dialogs: independently lifecycled view models, registered weakly,
//! rendered as overlays.

pub mod control;
pub mod registry;
pub mod service;

pub use control::{DialogControl, DialogCore, DialogState};
pub use registry::{DialogRegistry, DialogSlot};
pub use service::{DialogPlugin, DialogService, DialogSurface};
