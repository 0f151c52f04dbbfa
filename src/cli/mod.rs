pub mod app;
pub mod commands;
pub mod display;

pub use app::{App, Config};
pub use commands::{Cli, Commands, GamesCommand, PageArgs, PlayCommand};
