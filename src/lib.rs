pub mod errors;
pub mod config;
pub mod graphs;
pub mod bubbles;
pub mod editor;
pub mod mapping;
pub mod io;
