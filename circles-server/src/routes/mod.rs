//! HTTP route handlers

pub mod catalog;
pub mod game;
pub mod status;
