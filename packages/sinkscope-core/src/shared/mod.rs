//! Shared models and utilities used across features.

pub mod models;
