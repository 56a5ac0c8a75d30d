pub mod data;

pub use data::load_seed_data;
