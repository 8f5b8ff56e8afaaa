// Rusted Input - device-agnostic input with rebindable actions

pub mod core;
pub mod engine;
