// src/handlers/mod.rs

pub mod certificate;
pub mod exam;
pub mod material_test;
pub mod progress;
pub mod score;
