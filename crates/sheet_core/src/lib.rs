pub mod animation;
pub mod config;
pub mod dimension;
pub mod scale;
pub mod spritesheet;
pub mod time;
