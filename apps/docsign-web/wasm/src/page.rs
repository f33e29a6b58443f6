//! The signer's page
//!
//! [`SigningPage`] owns the signing controller, the DOM listeners it installs
//! and the JS event callback. Listener closures only hold a `Weak` to the
//! page, so freeing the page from JS unregisters everything.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use docsign_core::{
    ControlState, OtpControls, Point, ReviewProgress, SessionState, SignatureRequestId,
    SigningConfig, SigningFlow, SigningSessionController,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{
    console, CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlImageElement,
    MouseEvent,
};

use crate::listeners::EventListenerGuard;
use crate::transport::FetchTransport;

/// Everything the page's buttons and labels depend on
#[derive(Serialize)]
struct PageControls {
    state: SessionState,
    current_index: usize,
    progress: ReviewProgress,
    navigation: ControlState,
    otp: OtpControls,
    modal_open: bool,
    read_labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy)]
enum PadAction {
    Begin,
    Extend,
    End,
}

struct SignaturePad {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    _listeners: Vec<EventListenerGuard>,
}

struct PageInner {
    flow: SigningFlow<FetchTransport>,
    document: Document,
    viewer: Element,
    scroll_listener: RefCell<Option<EventListenerGuard>>,
    image_listeners: RefCell<Vec<EventListenerGuard>>,
    /// Page images of the shown document still waiting for `load` or `error`
    pending_images: Cell<usize>,
    pad: RefCell<Option<SignaturePad>>,
    on_event: RefCell<Option<js_sys::Function>>,
}

fn to_js(e: impl ToString) -> JsValue {
    JsValue::from_str(&e.to_string())
}

impl PageInner {
    fn viewer_metrics(&self) -> (f64, f64, f64) {
        (
            self.viewer.scroll_top() as f64,
            self.viewer.scroll_height() as f64,
            self.viewer.client_height() as f64,
        )
    }

    /// Replace the viewer's content with the current document's pages
    fn render_current(self: &Rc<Self>) -> Result<(), JsValue> {
        let (index, urls) = {
            let controller = self.flow.controller();
            let tracker = controller.tracker();
            let urls = tracker
                .current()
                .map(|d| d.page_urls().to_vec())
                .unwrap_or_default();
            (tracker.current_index(), urls)
        };

        self.image_listeners.borrow_mut().clear();
        self.viewer.set_inner_html("");
        self.viewer.set_scroll_top(0);

        // Page heights are only known once every image has settled
        self.pending_images.set(urls.len());
        let mut listeners = Vec::with_capacity(urls.len() * 2);
        for url in &urls {
            let img: HtmlImageElement = self.document.create_element("img")?.dyn_into()?;
            img.set_class_name("document-page");
            for event in ["load", "error"] {
                let weak = Rc::downgrade(self);
                listeners.push(EventListenerGuard::new(&img, event, move |_| {
                    if let Some(page) = weak.upgrade() {
                        page.on_image_settled(index);
                    }
                })?);
            }
            img.set_src(url);
            self.viewer.append_child(&img)?;
        }
        *self.image_listeners.borrow_mut() = listeners;

        if urls.is_empty() {
            self.check_displayed(index);
        }
        Ok(())
    }

    fn on_image_settled(&self, index: usize) {
        let remaining = self.pending_images.get().saturating_sub(1);
        self.pending_images.set(remaining);
        if remaining == 0 {
            self.check_displayed(index);
        }
    }

    /// True once the shown document's pages have all loaded or failed
    fn pages_settled(&self) -> bool {
        self.pending_images.get() == 0
    }

    fn check_displayed(&self, index: usize) {
        let (_, height, viewport) = self.viewer_metrics();
        self.flow
            .controller_mut()
            .on_document_displayed(index, height, viewport);
        self.flush_events();
    }

    fn on_scroll(&self) {
        // Partial content can look fully scrolled
        if !self.pages_settled() {
            return;
        }
        let index = self.flow.controller().tracker().current_index();
        let (top, height, viewport) = self.viewer_metrics();
        self.flow
            .controller_mut()
            .on_scroll(index, top, height, viewport);
        self.flush_events();
    }

    fn pad_listener(
        self: &Rc<Self>,
        canvas: &HtmlCanvasElement,
        event: &'static str,
        action: PadAction,
    ) -> Result<EventListenerGuard, JsValue> {
        let weak = Rc::downgrade(self);
        EventListenerGuard::new(canvas, event, move |event| {
            let Some(page) = weak.upgrade() else {
                return;
            };
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                let point = Point::new(mouse.offset_x() as f64, mouse.offset_y() as f64);
                page.on_pad_event(action, point);
            }
        })
    }

    fn on_pad_event(&self, action: PadAction, point: Point) {
        let accepted = {
            let mut controller = self.flow.controller_mut();
            match action {
                PadAction::Begin => controller.begin_stroke(point),
                PadAction::Extend => controller.extend_stroke(point),
                PadAction::End => controller.end_stroke(),
            }
        };
        if !accepted {
            return;
        }

        if let Some(pad) = self.pad.borrow().as_ref() {
            match action {
                PadAction::Begin => {
                    pad.context.begin_path();
                    pad.context.move_to(point.x, point.y);
                    pad.context.line_to(point.x, point.y);
                    pad.context.stroke();
                }
                PadAction::Extend => {
                    pad.context.line_to(point.x, point.y);
                    pad.context.stroke();
                }
                PadAction::End => {}
            }
        }
    }

    fn clear_pad(&self) {
        if let Some(pad) = self.pad.borrow().as_ref() {
            pad.context.clear_rect(
                0.0,
                0.0,
                pad.canvas.width() as f64,
                pad.canvas.height() as f64,
            );
        }
    }

    /// Hand queued events to the JS callback, if one is registered
    fn flush_events(&self) {
        let Some(callback) = self.on_event.borrow().clone() else {
            return;
        };
        let events = self.flow.controller_mut().drain_events();
        for event in events {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                        console::warn_1(&e);
                    }
                }
                Err(e) => console::warn_1(&to_js(e)),
            }
        }
    }

    fn redirect_after_signing(&self) -> Result<(), JsValue> {
        self.clear_pad();
        let redirect = self.flow.controller().config().success_redirect.clone();
        web_sys::window()
            .ok_or("No window")?
            .location()
            .set_href(&redirect)
    }
}

/// Review-gated, OTP-gated signing page
#[wasm_bindgen]
pub struct SigningPage {
    inner: Rc<PageInner>,
}

#[wasm_bindgen]
impl SigningPage {
    /// `documents` holds one `data-urls` attribute value per document, in
    /// display order. `api_base` prefixes the endpoint paths.
    #[wasm_bindgen(constructor)]
    pub fn new(
        viewer_id: &str,
        email: &str,
        signature_request_id: &str,
        documents: js_sys::Array,
        api_base: Option<String>,
    ) -> Result<SigningPage, JsValue> {
        let id: u64 = signature_request_id.trim().parse().map_err(|_| {
            JsValue::from_str(&format!(
                "Invalid signature request id: {}",
                signature_request_id
            ))
        })?;

        let mut page_lists = Vec::with_capacity(documents.length() as usize);
        for raw in documents.iter() {
            let raw = raw.as_string().ok_or("Document page lists must be strings")?;
            page_lists.push(shared_types::parse_page_urls(&raw).map_err(to_js)?);
        }

        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        let viewer = document
            .get_element_by_id(viewer_id)
            .ok_or_else(|| JsValue::from_str(&format!("No element with id {}", viewer_id)))?;

        let config = SigningConfig {
            base_url: api_base.unwrap_or_default(),
            ..SigningConfig::default()
        };
        let transport = FetchTransport::new(&config);
        let controller =
            SigningSessionController::new(config, email, SignatureRequestId(id), page_lists)
                .map_err(to_js)?;

        let inner = Rc::new(PageInner {
            flow: SigningFlow::new(controller, transport),
            document,
            viewer,
            scroll_listener: RefCell::new(None),
            image_listeners: RefCell::new(Vec::new()),
            pending_images: Cell::new(0),
            pad: RefCell::new(None),
            on_event: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let scroll = EventListenerGuard::new(&inner.viewer, "scroll", move |_| {
            if let Some(page) = weak.upgrade() {
                page.on_scroll();
            }
        })?;
        *inner.scroll_listener.borrow_mut() = Some(scroll);

        inner.render_current()?;
        Ok(SigningPage { inner })
    }

    /// Receive each session event as a JSON string
    pub fn set_on_event(&self, callback: Option<js_sys::Function>) {
        *self.inner.on_event.borrow_mut() = callback;
        self.inner.flush_events();
    }

    /// Queued events as a JSON array, for pages without a callback
    pub fn drain_events(&self) -> Result<String, JsValue> {
        let events = self.inner.flow.controller_mut().drain_events();
        serde_json::to_string(&events).map_err(to_js)
    }

    /// Current control state as JSON
    pub fn controls(&self) -> Result<String, JsValue> {
        let controller = self.inner.flow.controller();
        let tracker = controller.tracker();
        let snapshot = PageControls {
            state: controller.state(),
            current_index: tracker.current_index(),
            progress: controller.progress(),
            navigation: controller.controls(),
            otp: controller.otp_controls(),
            modal_open: controller.is_modal_open(),
            read_labels: tracker.documents().iter().map(|d| d.read_label()).collect(),
        };
        serde_json::to_string(&snapshot).map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn current_index(&self) -> usize {
        self.inner.flow.controller().tracker().current_index()
    }

    /// False while page images of the shown document are still loading
    #[wasm_bindgen(getter)]
    pub fn pages_loaded(&self) -> bool {
        self.inner.pages_settled()
    }

    #[wasm_bindgen(getter)]
    pub fn document_count(&self) -> usize {
        self.inner.flow.controller().tracker().document_count()
    }

    /// Jump to a document from its link. Returns false for a bad index.
    pub fn show_document(&self, index: usize) -> Result<bool, JsValue> {
        if !self.inner.flow.controller_mut().select_document(index) {
            return Ok(false);
        }
        self.inner.render_current()?;
        Ok(true)
    }

    pub fn next(&self) -> Result<bool, JsValue> {
        if !self.inner.flow.controller_mut().next_document() {
            return Ok(false);
        }
        self.inner.render_current()?;
        Ok(true)
    }

    pub fn prev(&self) -> Result<bool, JsValue> {
        if !self.inner.flow.controller_mut().prev_document() {
            return Ok(false);
        }
        self.inner.render_current()?;
        Ok(true)
    }

    pub fn open_modal(&self) -> Result<(), JsValue> {
        let result = self.inner.flow.controller_mut().open_signing_modal();
        self.inner.clear_pad();
        self.inner.flush_events();
        result.map_err(to_js)
    }

    pub fn dismiss_modal(&self) -> bool {
        let closed = self.inner.flow.controller_mut().dismiss_modal();
        self.inner.clear_pad();
        self.inner.flush_events();
        closed
    }

    /// Bind the signature canvas. Replaces any previously attached canvas.
    pub fn attach_canvas(&self, canvas_id: &str) -> Result<(), JsValue> {
        let canvas: HtmlCanvasElement = self
            .inner
            .document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("No element with id {}", canvas_id)))?
            .dyn_into()?;

        let config = self.inner.flow.controller().config().canvas;
        canvas.set_width(config.width);
        canvas.set_height(config.height);

        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("Canvas 2d context unavailable")?
            .dyn_into()?;
        context.set_line_width(config.stroke_width);
        context.set_line_cap("round");
        context.set_line_join("round");

        let listeners = vec![
            self.inner.pad_listener(&canvas, "mousedown", PadAction::Begin)?,
            self.inner.pad_listener(&canvas, "mousemove", PadAction::Extend)?,
            self.inner.pad_listener(&canvas, "mouseup", PadAction::End)?,
            self.inner.pad_listener(&canvas, "mouseleave", PadAction::End)?,
        ];

        *self.inner.pad.borrow_mut() = Some(SignaturePad {
            canvas,
            context,
            _listeners: listeners,
        });
        Ok(())
    }

    pub fn clear_signature(&self) {
        self.inner.flow.controller_mut().clear_signature();
        self.inner.clear_pad();
    }

    /// Render the pad. Returns the PNG data URL, or `None` when nothing was drawn.
    pub fn save_signature(&self) -> Result<Option<String>, JsValue> {
        let result = self
            .inner
            .flow
            .controller_mut()
            .save_signature()
            .map(|image| image.map(|i| i.to_data_url()));
        self.inner.flush_events();
        result.map_err(to_js)
    }

    pub fn set_otp_code(&self, code: &str) {
        self.inner.flow.controller_mut().set_otp_code(code);
    }

    /// Request a code. Resolves to the new OTP phase, or `null` if the modal
    /// was closed while the request was in flight.
    pub fn send_otp(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let result = inner.flow.send_otp().await;
            inner.flush_events();
            let phase = result.map_err(to_js)?;
            Ok(phase
                .map(|p| JsValue::from_str(&p.to_string()))
                .unwrap_or(JsValue::NULL))
        })
    }

    /// Verify the entered code and finalize once it is accepted.
    /// Navigates to the success page after signing.
    pub fn verify_otp(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let result = inner.flow.submit_otp().await;
            inner.flush_events();
            let state = result.map_err(to_js)?;
            if state == SessionState::Signed {
                inner.redirect_after_signing()?;
            }
            Ok(JsValue::from_str(&state.to_string()))
        })
    }

    /// Retry finalization after a verified code when the first attempt failed
    pub fn finalize(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let result = inner.flow.finalize().await;
            inner.flush_events();
            match result.map_err(to_js)? {
                Some(SessionState::Signed) => {
                    inner.redirect_after_signing()?;
                    Ok(JsValue::from_str(&SessionState::Signed.to_string()))
                }
                Some(state) => Ok(JsValue::from_str(&state.to_string())),
                None => Ok(JsValue::NULL),
            }
        })
    }
}
