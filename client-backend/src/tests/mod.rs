mod polling;
pub mod utils;
