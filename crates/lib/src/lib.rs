//! rtcbuild-lib: Core types and logic for rtcbuild
//!
//! This crate drives a WebRTC build from revision resolution to a packaged
//! artifact:
//! - `BuildRequest`: the immutable description of one build run
//! - `Revision`: the resolved commit SHA and its revision number
//! - `pattern`: package naming templates such as `webrtc-%rn%-%sr%-%to%-%tc%`
//! - `Pipeline`: the fail-fast driver wiring the external tools together

pub mod compile;
pub mod consts;
pub mod git;
pub mod package;
pub mod pattern;
pub mod pipeline;
pub mod platform;
pub mod request;
pub mod revision;
pub mod source;
pub mod tool;
pub mod util;
pub mod validate;
