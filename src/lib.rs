pub mod app;
pub mod display;
pub mod error;
pub mod input;
pub mod machine;
pub mod player;
