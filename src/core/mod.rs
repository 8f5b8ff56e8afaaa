// Core utilities shared by the input engine

pub mod math;
