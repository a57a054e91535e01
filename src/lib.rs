pub mod app;
pub mod buffer;
pub mod config;
pub mod display;
pub mod file_io;
pub mod ndpc;
pub mod process;
pub mod session;
pub mod terminal;
