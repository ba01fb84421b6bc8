// src/models/mod.rs

pub mod material;
pub mod progress;
pub mod question;
pub mod session;
pub mod user;
mod wire;
