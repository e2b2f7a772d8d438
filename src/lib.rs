//! nutrilens: client for a food image-classification backend.
//!
//! Looks up nutrition metadata for a class, posts images to the backend's
//! `/predict` endpoint and renders the results, either through the embedded
//! web dashboard or from the command line.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod events;
pub mod page;
pub mod predict;
pub mod render;
pub mod web;
