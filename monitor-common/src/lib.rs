pub mod analysis;
pub mod data;
