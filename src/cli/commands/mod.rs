pub mod check;
pub mod principal;
pub mod save_config;
