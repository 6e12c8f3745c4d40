pub mod freshpay;

pub use freshpay::{FreshPayConfig, FreshPayProvider};
