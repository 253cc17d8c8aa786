//! Core data types shared between the pool and its workers.

pub mod worker;

pub use worker::WorkerState;
