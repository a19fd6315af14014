//! Brightness gesture engine: a long press on a touch surface followed by a
//! horizontal drag adjusts a bounded output value, and a vertical flick
//! toggles between manual and automatic mode.

pub mod config;
pub mod curve;
pub mod gesture;
pub mod output;
pub mod ports;
pub mod sample_buffer;
pub mod speed;
pub mod timers;

pub use config::{AutomaticModePolicy, ConfigError, GestureConfig};
pub use gesture::{
    AbortReason, GestureController, GesturePhase, GestureTrace, TouchEvent, TouchPhase,
};
pub use output::{OutputMode, OutputRange};
pub use ports::{GestureHost, HapticKind, MemoryHost};
