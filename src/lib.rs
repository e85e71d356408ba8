pub mod app;
pub mod audio;
pub mod config;
pub mod media;
pub mod scheduler;
pub mod shader;
pub mod tracking;
