pub mod cli;
pub mod marks;
pub mod panic_handler;
pub mod pdf;
pub mod settings;
