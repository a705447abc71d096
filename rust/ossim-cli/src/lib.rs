//! OSSIM command surface: parsing, rendering and the interactive driver
//! around [`ossim_runtime::Kernel`].

pub mod colors;
pub mod command;
pub mod config;
pub mod render;
pub mod repl;
pub mod session;
