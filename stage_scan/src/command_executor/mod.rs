pub mod meter;
pub mod stage;
