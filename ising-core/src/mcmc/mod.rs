pub mod sweep;

pub use sweep::{checkerboard_sweep, metropolis_sweep, random_site_step, SweepStats};
