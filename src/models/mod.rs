// src/models/mod.rs

pub mod answer;
pub mod feedback;
pub mod paper;
pub mod question;
