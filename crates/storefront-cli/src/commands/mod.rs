pub mod cart;
pub mod config;
pub mod context;
pub mod listen;
