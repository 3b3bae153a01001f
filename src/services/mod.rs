pub mod api;
pub mod concerns;
pub mod selection;
pub mod session;
#[cfg(not(target_arch = "wasm32"))]
pub mod walkthrough;
