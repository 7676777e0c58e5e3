mod utils;
pub mod wolff;

pub use wolff::{add_probability, wolff_step, wolff_step_with, ClusterStats, WolffScratch};
