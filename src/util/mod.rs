//! Shared utilities: aligned buffers, CPU accounting and phase timers

pub mod buffer;
pub mod resource;
pub mod time;
