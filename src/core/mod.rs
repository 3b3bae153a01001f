pub mod capture;
pub mod config;
pub mod io;
pub mod navigation;
pub mod slides;
pub mod state;
