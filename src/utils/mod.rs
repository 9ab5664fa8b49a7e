pub mod cache;
pub mod state;
