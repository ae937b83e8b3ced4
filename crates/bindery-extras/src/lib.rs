#![forbid(unsafe_code)]

//! Optional feature-gated extensions for Bindery.
//!
//! Each module sits behind a Cargo feature and is built entirely on the
//! public contracts of the core and dialog crates.
//!
//! | Feature  | Module     | Description                                  |
//! |----------|------------|----------------------------------------------|
//! | `alert`  | [`alert`]  | Alert/confirm dialogs with handshake tickets |
//! | `router` | [`router`] | Guarded, observable in-memory routing        |

#[cfg(feature = "alert")]
pub mod alert;

#[cfg(feature = "router")]
pub mod router;
