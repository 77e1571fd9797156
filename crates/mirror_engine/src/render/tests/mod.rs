//! Cross-module scenarios run against the headless backend

mod frame_integration;
