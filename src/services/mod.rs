//! Business flows behind the HTTP handlers

pub mod ip_lookup;
pub mod payment_initiation;
pub mod webhook_reconciler;
