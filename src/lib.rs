pub mod authorization;
pub mod config;
pub mod models;
pub mod startup;
pub mod subscription;
#[cfg(test)]
pub mod test_utils;
pub mod utils;
pub mod web;

pub use utils::state;
