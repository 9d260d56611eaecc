// Domain layer: language data structures and ports. No phase logic lives here.

pub mod ast;
pub mod ir;
pub mod model;
pub mod ports;
pub mod scope;
pub mod types;
pub mod value;
