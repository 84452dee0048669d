//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod eastmoney_adapter;
pub mod file_config_adapter;
pub mod holiday_adapter;
pub mod memory_store_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
