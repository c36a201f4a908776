//! # flipscreen-view
//!
//! Terminal front end for `flipscreen-core`. Connects to a device bridge,
//! draws the remote 128x64 screen in the terminal and optionally records
//! the session to a YUV4MPEG2 file.

pub mod config;
pub mod display;
pub mod recorder;
