//! Process-wide locations and settings, resolved once at startup.

pub mod dirs;
pub mod settings;
