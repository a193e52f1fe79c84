// src/lib.rs
//! Point cloud slider viewer library.
//!
//! Loads a PLY point cloud into one interleaved GPU vertex buffer and
//! renders it as sized points under three rotation sliders.

pub mod app;
pub mod data;
pub mod renderer;
pub mod ui;
pub mod view;
