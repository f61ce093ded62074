/// Site Timer - Chrome Extension measuring active time per website
/// Built with Rust + WASM + Yew

pub mod badge;
pub mod background;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod presence;
pub mod schedule;
pub mod site_info;
pub mod stats;
pub mod store;
pub mod tab_data;
pub mod tracker;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export core domain functions for JavaScript access
#[wasm_bindgen]
pub fn extract_domain(url: &str) -> Option<String> {
    domain::extract_domain(url)
}

// Start time tracking in the background service worker
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
