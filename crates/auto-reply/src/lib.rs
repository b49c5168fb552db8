//! Inbound image processing pipeline, the glue between a channel and a
//! classifier backend.
//!
//! Flow: inbound event → extract image → decode → prepare backend input →
//! classify → format → reply to the originating message.

pub mod dispatch;

pub use dispatch::{Dispatcher, Outcome, Rejection, Stage};
