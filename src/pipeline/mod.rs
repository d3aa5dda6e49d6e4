//! Asynchronous frame acquisition.
//!
//! A [`session::Session`] owns one worker thread that pulls frames from a
//! device and converts them, and a tick-driven [`clock::ConsumerClock`] that
//! paces display. The two sides coordinate only through
//! [`state::PipelineState`].

pub mod buffers;
pub mod clock;
pub mod session;
pub mod sink;
pub mod state;
mod worker;
