pub mod energy;
pub mod state;

pub use state::{FlipDelta, InitPattern, ModelParams, SpinState};
