//! Command line front end for termlink: replay captured terminal streams and
//! watch live ones

pub mod cli;
pub mod render;
pub mod screen_guard;
