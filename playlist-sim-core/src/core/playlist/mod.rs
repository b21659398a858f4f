pub use playlist::*;
pub use simulation::*;
pub use track::*;

mod playlist;
mod simulation;
mod track;
