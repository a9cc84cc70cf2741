//! Browser host built on `web-sys`.
//!
//! Timers map to `setInterval` / `setTimeout`, script injection appends `<script>` elements to
//! `<head>`, and element queries go through the live document on every call. [`ArWidget`] is the
//! JavaScript-facing entry point: it owns a session, renders the overlay into a container and
//! routes clicks on the controls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::config::session::SessionConfig;
use crate::foundation::core::TargetEvent;
use crate::foundation::error::{ArError, ArResult};
use crate::host::api::{
    Document, Host, Layering, ListenerGuard, MediaElement, PlayError, RenderSurface, SceneRoot,
    Scheduler, ScriptInjector, ScriptOutcome, TimerId,
};
use crate::session::controller::ArSession;
use crate::session::overlay::{MUTE_CONTROL_ID, OverlayView, RETRY_CONTROL_ID};
use crate::session::playback::UserGesture;

/// Session collaborators backed by `window` and its document.
pub(crate) fn web_host(window: &web_sys::Window, config: &SessionConfig) -> ArResult<Host> {
    let document = window
        .document()
        .ok_or_else(|| ArError::host("window has no document"))?;
    Ok(Host {
        scheduler: Rc::new(WebScheduler {
            window: window.clone(),
            intervals: RefCell::new(HashMap::new()),
        }),
        scripts: Rc::new(WebScripts {
            document: document.clone(),
        }),
        document: Rc::new(WebDocument {
            document,
            scene_selector: config.scene_selector.clone(),
            surface_selector: config.surface_selector.clone(),
        }),
    })
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn millis(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

struct WebScheduler {
    window: web_sys::Window,
    intervals: RefCell<HashMap<TimerId, Closure<dyn FnMut()>>>,
}

impl Scheduler for WebScheduler {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerId {
        let cb = Closure::wrap(tick);
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                millis(period),
            ) {
            Ok(handle) => {
                let id = TimerId(handle as u64);
                self.intervals.borrow_mut().insert(id, cb);
                id
            }
            Err(e) => {
                tracing::warn!(error = %describe(&e), "setInterval failed");
                TimerId(0)
            }
        }
    }

    fn set_timeout(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> TimerId {
        // Frees itself after the single call.
        let cb = Closure::once_into_js(move || fire());
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.unchecked_ref(),
                millis(delay),
            ) {
            Ok(handle) => TimerId(handle as u64),
            Err(e) => {
                tracing::warn!(error = %describe(&e), "setTimeout failed");
                TimerId(0)
            }
        }
    }

    fn clear(&self, id: TimerId) {
        let Ok(handle) = i32::try_from(id.0) else {
            return;
        };
        // Timeouts and intervals share one handle space.
        self.window.clear_timeout_with_handle(handle);
        let released = self.intervals.borrow_mut().remove(&id);
        drop(released);
    }
}

struct WebScripts {
    document: web_sys::Document,
}

impl WebScripts {
    fn append(
        &self,
        src: &str,
        settle: &Rc<RefCell<Option<Box<dyn FnOnce(ScriptOutcome)>>>>,
    ) -> Result<(), JsValue> {
        let head = self
            .document
            .head()
            .ok_or_else(|| JsValue::from_str("document has no <head>"))?;
        let script = self
            .document
            .create_element("script")?
            .dyn_into::<web_sys::HtmlScriptElement>()?;
        script.set_src(src);
        // Execute in insertion order.
        script.set_async(false);

        let on_load = Rc::clone(settle);
        let onload = Closure::wrap(Box::new(move |_ev: web_sys::Event| {
            let settle = on_load.borrow_mut().take();
            if let Some(settle) = settle {
                settle(ScriptOutcome::Loaded);
            }
        }) as Box<dyn FnMut(_)>);
        script.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();

        let on_error = Rc::clone(settle);
        let failed_src = src.to_string();
        let onerror = Closure::wrap(Box::new(move |_ev: web_sys::Event| {
            let settle = on_error.borrow_mut().take();
            if let Some(settle) = settle {
                settle(ScriptOutcome::Failed(format!("failed to load {failed_src}")));
            }
        }) as Box<dyn FnMut(_)>);
        script.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        head.append_child(&script)?;
        Ok(())
    }
}

impl ScriptInjector for WebScripts {
    fn inject(&self, src: &str, on_settled: Box<dyn FnOnce(ScriptOutcome)>) {
        let settle = Rc::new(RefCell::new(Some(on_settled)));
        if let Err(e) = self.append(src, &settle) {
            let reason = describe(&e);
            tracing::warn!(%src, %reason, "script injection failed");
            let settle = settle.borrow_mut().take();
            if let Some(settle) = settle {
                settle(ScriptOutcome::Failed(reason));
            }
        }
    }
}

struct WebDocument {
    document: web_sys::Document,
    scene_selector: String,
    surface_selector: String,
}

impl WebDocument {
    fn query(&self, selector: &str) -> Option<web_sys::Element> {
        self.document.query_selector(selector).ok().flatten()
    }
}

impl Document for WebDocument {
    fn scene_root(&self) -> Option<Rc<dyn SceneRoot>> {
        let element = self.query(&self.scene_selector)?;
        Some(Rc::new(WebScene { element }))
    }

    fn media_element(&self, id: &str) -> Option<Rc<dyn MediaElement>> {
        let element = self
            .document
            .get_element_by_id(id)?
            .dyn_into::<web_sys::HtmlMediaElement>()
            .ok()?;
        Some(Rc::new(WebMedia { element }))
    }

    fn render_surface(&self) -> Option<Rc<dyn RenderSurface>> {
        let element = self
            .query(&self.surface_selector)?
            .dyn_into::<web_sys::HtmlElement>()
            .ok()?;
        Some(Rc::new(WebSurface { element }))
    }
}

struct WebScene {
    element: web_sys::Element,
}

fn listen(
    target: &web_sys::EventTarget,
    name: &'static str,
    cb: Closure<dyn FnMut(web_sys::Event)>,
) -> ListenerGuard {
    if let Err(e) = target.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref()) {
        tracing::warn!(event = name, error = %describe(&e), "addEventListener failed");
    }
    let target = target.clone();
    ListenerGuard::new(move || {
        let callback = cb.as_ref().unchecked_ref();
        if let Err(e) = target.remove_event_listener_with_callback(name, callback) {
            tracing::warn!(event = name, error = %describe(&e), "removeEventListener failed");
        }
        drop(cb);
    })
}

impl SceneRoot for WebScene {
    fn listen(&self, event: TargetEvent, mut handler: Box<dyn FnMut()>) -> ListenerGuard {
        let cb = Closure::wrap(
            Box::new(move |_ev: web_sys::Event| handler()) as Box<dyn FnMut(web_sys::Event)>
        );
        listen(&self.element, event.dom_name(), cb)
    }
}

struct WebMedia {
    element: web_sys::HtmlMediaElement,
}

fn play_error(value: JsValue) -> PlayError {
    match value.dyn_ref::<web_sys::DomException>() {
        Some(ex) if ex.name() == "NotAllowedError" => PlayError::NotAllowed,
        Some(ex) if ex.name() == "AbortError" => PlayError::Aborted,
        Some(ex) => PlayError::Other(format!("{}: {}", ex.name(), ex.message())),
        None => PlayError::Other(describe(&value)),
    }
}

fn await_play(promise: js_sys::Promise, settled: Box<dyn FnOnce(Result<(), PlayError>)>) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = JsFuture::from(promise).await;
        settled(result.map(|_| ()).map_err(play_error));
    });
}

impl MediaElement for WebMedia {
    fn muted(&self) -> bool {
        self.element.muted()
    }

    fn set_muted(&self, muted: bool) {
        self.element.set_muted(muted);
    }

    fn play(&self, settled: Box<dyn FnOnce(Result<(), PlayError>)>) {
        match self.element.play() {
            Ok(promise) => await_play(promise, settled),
            Err(e) => settled(Err(play_error(e))),
        }
    }

    fn pause(&self) {
        if let Err(e) = self.element.pause() {
            tracing::warn!(error = %describe(&e), "pause() threw");
        }
    }
}

struct WebSurface {
    element: web_sys::HtmlElement,
}

impl RenderSurface for WebSurface {
    fn apply_layering(&self, layering: &Layering) {
        let style = self.element.style();
        for (property, value) in layering.declarations() {
            if let Err(e) = style.set_property(property, &value) {
                tracing::warn!(property, error = %describe(&e), "style update failed");
            }
        }
    }
}

fn to_js(e: ArError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Renders [`OverlayView`]s into a container element.
///
/// The scene markup is written once when the view becomes active; afterwards only the mute button
/// is replaced so the engine's scene graph is never rebuilt.
struct OverlayRenderer {
    document: web_sys::Document,
    container: web_sys::Element,
    shown: RefCell<Option<OverlayView>>,
}

impl OverlayRenderer {
    fn render(&self, view: OverlayView) {
        let mut shown = self.shown.borrow_mut();
        if shown.as_ref() == Some(&view) {
            return;
        }
        match (shown.as_ref(), &view) {
            (Some(OverlayView::Active(_)), OverlayView::Active(active)) => {
                if let Some(button) = self.document.get_element_by_id(MUTE_CONTROL_ID) {
                    button.set_outer_html(&active.control_html());
                }
            }
            _ => self.container.set_inner_html(&view.to_html()),
        }
        *shown = Some(view);
    }
}

/// AR widget for embedding pages.
///
/// ```js
/// const widget = new ArWidget("ar-root", null);
/// widget.mount();
/// ```
#[wasm_bindgen]
pub struct ArWidget {
    session: Rc<ArSession>,
    container: web_sys::Element,
    clicks: Option<ListenerGuard>,
}

#[wasm_bindgen]
impl ArWidget {
    /// Build a widget rendering into the element with id `container_id`. `config_json` overrides
    /// the default session configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, config_json: Option<String>) -> Result<ArWidget, JsValue> {
        let window = web_sys::window().ok_or(JsValue::from_str("no global window"))?;
        let document = window
            .document()
            .ok_or(JsValue::from_str("window has no document"))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id '{container_id}'")))?;

        let config = match config_json {
            Some(json) => SessionConfig::from_json_str(&json).map_err(to_js)?,
            None => SessionConfig::default(),
        };
        let host = web_host(&window, &config).map_err(to_js)?;
        let view_config = config.clone();
        let session = Rc::new(ArSession::new(config, host).map_err(to_js)?);

        let renderer = OverlayRenderer {
            document,
            container: container.clone(),
            shown: RefCell::new(None),
        };
        session.on_change(move |snapshot| {
            renderer.render(OverlayView::from_snapshot(snapshot, &view_config));
        });

        let clicks = listen(&container, "click", click_handler(Rc::downgrade(&session)));
        Ok(ArWidget {
            session,
            container,
            clicks: Some(clicks),
        })
    }

    /// Start loading the engines.
    pub fn mount(&self) {
        self.session.mount();
    }

    /// Tear the session down and clear the container.
    pub fn teardown(&mut self) {
        self.session.teardown();
        self.clicks.take();
        self.container.set_inner_html("");
    }

    /// Current session state as JSON.
    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.snapshot())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn click_handler(session: Weak<ArSession>) -> Closure<dyn FnMut(web_sys::Event)> {
    let mute = format!("#{MUTE_CONTROL_ID}");
    let retry = format!("#{RETRY_CONTROL_ID}");
    Closure::wrap(Box::new(move |ev: web_sys::Event| {
        let Some(session) = session.upgrade() else {
            return;
        };
        let Some(target) = ev.target().and_then(|t| t.dyn_into::<web_sys::Element>().ok()) else {
            return;
        };
        if matches!(target.closest(&mute), Ok(Some(_))) {
            session.toggle_audio(UserGesture::within_handler());
        } else if matches!(target.closest(&retry), Ok(Some(_))) {
            if let Err(e) = session.retry() {
                tracing::warn!(error = %e, "retry rejected");
            }
        }
    }) as Box<dyn FnMut(web_sys::Event)>)
}
