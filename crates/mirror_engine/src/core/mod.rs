//! Core engine configuration

pub mod config;
