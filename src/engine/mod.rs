// Engine modules: input and the update clock that drives it

pub mod input;
pub mod update_loop;
