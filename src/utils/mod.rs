// src/utils/mod.rs

pub mod disposition;
pub mod jwt;
