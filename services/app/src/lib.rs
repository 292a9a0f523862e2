pub mod adapters;
pub mod config;
pub mod error;
pub mod presenters;
pub mod state;
