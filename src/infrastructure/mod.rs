//! Infrastructure layer - Store implementations and services

pub mod cache;
pub mod logging;
pub mod services;
