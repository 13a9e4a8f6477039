//! Printer farm dispatcher: routes an uploaded G-code file to the first
//! ready Moonraker printer in a fixed, ordered pool.

pub mod config;
pub mod moonraker;
pub mod pool;
pub mod web;
