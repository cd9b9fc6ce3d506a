// src/lib.rs
pub mod api;
pub mod config;
pub mod controller;
pub mod errors;
pub mod form;
pub mod result_view;
pub mod strategy;
pub mod symbols;
pub mod types;
