//! Toasts and the reload advisory

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Window};

use crate::timers::after;

const STYLE_ID: &str = "jb-styles";
const ADVISORY_ID: &str = "jb-reload-advisory";

const TOAST_SHOW_DELAY_MS: i32 = 100;
const TOAST_FADE_MS: i32 = 300;

const STYLES: &str = r#"
  .jb-toast {
    position: fixed;
    top: 20px;
    right: 20px;
    background-color: #255898;
    color: #ffffff;
    padding: 10px 20px;
    border-radius: 5px;
    box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
    font-size: 14px;
    z-index: 10000;
    opacity: 0;
    transform: translateY(-20px);
    transition: opacity 0.3s ease, transform 0.3s ease;
  }
  .jb-toast.jb-error { background-color: #b3261e; }
  .jb-toast.show { opacity: 1; transform: translateY(0); }

  #jb-reload-advisory {
    position: fixed;
    bottom: 20px;
    left: 50%;
    transform: translateX(-50%);
    display: flex;
    align-items: center;
    gap: 12px;
    background-color: #333333;
    color: #ffffff;
    padding: 10px 16px;
    border-radius: 6px;
    font-size: 14px;
    z-index: 10001;
  }
  #jb-reload-advisory button {
    border: none;
    border-radius: 4px;
    padding: 4px 10px;
    cursor: pointer;
  }

  .block-company { cursor: pointer; }
  .block-company svg { fill: #255898; transition: fill 0.3s ease; }
  .block-company:hover svg { fill: #005582; }
"#;

/// Labels for the reload advisory.
pub struct AdvisoryText {
    pub message: String,
    pub reload: String,
    pub dismiss: String,
}

pub struct Ui {
    window: Window,
    document: Document,
    toast_ms: i32,
}

impl Ui {
    pub fn new(window: Window, document: Document, toast_ms: u32) -> Self {
        Self {
            window,
            document,
            toast_ms: i32::try_from(toast_ms).unwrap_or(i32::MAX),
        }
    }

    /// Inject the stylesheet once per page.
    pub fn inject_styles(&self) -> Result<(), JsValue> {
        if self.document.get_element_by_id(STYLE_ID).is_some() {
            return Ok(());
        }
        let style = self.document.create_element("style")?;
        style.set_id(STYLE_ID);
        style.set_text_content(Some(STYLES));
        match self.document.head() {
            Some(head) => head.append_child(&style)?,
            None => self.body()?.append_child(&style)?,
        };
        Ok(())
    }

    fn body(&self) -> Result<Element, JsValue> {
        self.document
            .body()
            .map(Into::into)
            .ok_or_else(|| JsValue::from_str("document has no body"))
    }

    /// Transient message; fades in, then removes itself.
    pub fn toast(&self, message: &str, is_error: bool) {
        if let Err(e) = self.try_toast(message, is_error) {
            log::warn!("Failed to show toast: {:?}", e);
        }
    }

    fn try_toast(&self, message: &str, is_error: bool) -> Result<(), JsValue> {
        let toast = self.document.create_element("div")?;
        toast.set_class_name(if is_error { "jb-toast jb-error" } else { "jb-toast" });
        toast.set_attribute("role", "alert")?;
        toast.set_attribute("aria-live", "polite")?;
        toast.set_text_content(Some(message));
        self.body()?.append_child(&toast)?;

        let shown = toast.clone();
        after(&self.window, TOAST_SHOW_DELAY_MS, move || {
            if let Err(e) = shown.class_list().add_1("show") {
                log::debug!("Failed to show toast: {:?}", e);
            }
        });

        let window = self.window.clone();
        after(&self.window, self.toast_ms, move || {
            if let Err(e) = toast.class_list().remove_1("show") {
                log::debug!("Failed to fade toast: {:?}", e);
            }
            after(&window, TOAST_FADE_MS, move || toast.remove());
        });
        Ok(())
    }

    /// Persistent banner offering a reload. Only one is shown at a time.
    pub fn show_advisory(&self, text: &AdvisoryText) -> Result<(), JsValue> {
        if self.document.get_element_by_id(ADVISORY_ID).is_some() {
            return Ok(());
        }

        let banner = self.document.create_element("div")?;
        banner.set_id(ADVISORY_ID);
        banner.set_attribute("role", "status")?;

        let message = self.document.create_element("span")?;
        message.set_text_content(Some(&text.message));
        banner.append_child(&message)?;

        let reload = self.document.create_element("button")?;
        reload.set_text_content(Some(&text.reload));
        let location = self.window.location();
        let on_reload = Closure::<dyn FnMut()>::new(move || {
            if let Err(e) = location.reload() {
                log::warn!("Reload failed: {:?}", e);
            }
        });
        reload.add_event_listener_with_callback("click", on_reload.as_ref().unchecked_ref())?;
        banner.append_child(&reload)?;

        let dismiss = self.document.create_element("button")?;
        dismiss.set_text_content(Some(&text.dismiss));
        let dismissed = banner.clone();
        let on_dismiss = Closure::<dyn FnMut()>::new(move || dismissed.remove());
        dismiss.add_event_listener_with_callback("click", on_dismiss.as_ref().unchecked_ref())?;
        banner.append_child(&dismiss)?;

        self.body()?.append_child(&banner)?;

        // Banners are rare; their handlers live for the page lifetime.
        on_reload.forget();
        on_dismiss.forget();
        Ok(())
    }
}
