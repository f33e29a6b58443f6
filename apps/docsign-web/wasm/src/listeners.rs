//! DOM event listeners tied to Rust ownership
//!
//! A guard keeps its closure alive and unregisters it when dropped, so a
//! listener lives exactly as long as the page object that installed it.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget};

pub struct EventListenerGuard {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListenerGuard {
    pub fn new<F>(target: &EventTarget, event: &'static str, handler: F) -> Result<Self, JsValue>
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }

    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl Drop for EventListenerGuard {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}
