pub mod config_read;
pub mod csv_read;
