//! Diffa heatmap console entry point

use std::cell::RefCell;
use std::sync::OnceLock;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use zoon::*;

/// Stores the main application task handle to prevent it from being dropped.
static MAIN_TASK: OnceLock<TaskHandle> = OnceLock::new();

mod app;
mod config;
mod connection;
mod dataflow;
mod diffs;
mod logging;
mod router;
mod visualizer;

#[cfg(test)]
mod test_support;

thread_local! {
    /// The running console; its timers and loops stop when it is dropped.
    static APP: RefCell<Option<app::DiffaApp>> = const { RefCell::new(None) };
}

pub fn main() {
    let handle = Task::start_droppable(async {
        let config = config::load_config().await;
        let app = app::DiffaApp::new(config);
        let root_element = app.root();
        APP.with(|slot| *slot.borrow_mut() = Some(app));
        start_app("app", move || root_element);
        shutdown_on_page_hide();
    });
    let _ = MAIN_TASK.set(handle);
}

fn shutdown_on_page_hide() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let listener = Closure::<dyn FnMut()>::new(|| {
        if let Some(mut app) = APP.with(|slot| slot.borrow_mut().take()) {
            app.shutdown();
        }
    });
    window.set_onpagehide(Some(listener.as_ref().unchecked_ref()));
    // Lives as long as the page.
    listener.forget();
}
