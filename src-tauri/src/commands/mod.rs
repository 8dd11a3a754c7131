pub mod check;
pub mod clipboard;
pub mod config;
pub mod keychain;
pub mod offline;
