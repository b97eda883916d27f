// src/utils/mod.rs

pub mod html;
pub mod jwt;
pub mod quiz_code;
pub mod scoring;
