// Camera domain: SDK access, discovery, controls, and frame sources.

pub mod asi;
pub mod error;
pub mod source;
pub mod types;
