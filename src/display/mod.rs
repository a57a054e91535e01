pub mod file_dialog;
pub mod frame;
pub mod input;
pub mod renderer;
pub mod theme;
