pub mod aggregate;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod output;
pub mod parser;
pub mod scale;
pub mod view;
