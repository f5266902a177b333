pub mod object;
pub mod compare;
pub mod interpreter;
