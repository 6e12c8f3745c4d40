pub mod error;
pub mod network;
pub mod provider;
pub mod providers;
pub mod reference;
pub mod types;
pub mod utils;
