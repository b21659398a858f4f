pub use engine::*;
pub use errors::*;

mod engine;
mod errors;
