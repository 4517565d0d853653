//! Core types: particle records and observation frame buffers

pub mod frame;
pub mod particle;
