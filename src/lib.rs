//! Africanite Payment Hub: mobile-money collection through the FreshPay
//! aggregator for several client applications.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod services;
