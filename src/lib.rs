//! Frame acquisition for ZWO ASI cameras.
//!
//! Open a camera with [`pipeline::session::Session::open_asi`] (or start a
//! session on any [`camera::source::FrameSource`]) and call `tick` from the
//! display loop to receive paced, display-ready RGBA frames.

pub mod camera;
pub mod diagnostics;
pub mod pipeline;
pub mod settings;
