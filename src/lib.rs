// src/lib.rs

//! Metrobus line status watcher library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
