//! Host page DOM binding

use jb_core::config::{HostSelectors, Markers};
use jb_core::reconcile::HostDocument;
use jb_core::types::CandidateNode;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Node};

/// Attribute on a block control carrying its company name.
pub const COMPANY_ATTR: &str = "data-jb-company";

const BLOCK_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 16 16" aria-hidden="true" focusable="false"><path d="m10.79 12.912-1.614-1.615a3.5 3.5 0 0 1-4.474-4.474l-2.06-2.06C.938 6.278 0 8 0 8s3 5.5 8 5.5a7 7 0 0 0 2.79-.588M5.21 3.088A7 7 0 0 1 8 2.5c5 0 8 5.5 8 5.5s-.939 1.721-2.641 3.238l-2.062-2.062a3.5 3.5 0 0 0-4.474-4.474z"></path><path d="M5.525 7.646a2.5 2.5 0 0 0 2.829 2.829zm4.95.708-2.829-2.83a2.5 2.5 0 0 1 2.829 2.829zm3.171 6-12-12 .708-.708 12 12z"></path></svg>"#;

pub struct WebDocument {
    document: Document,
    selectors: HostSelectors,
    markers: Markers,
    control_selector: String,
    tooltip: String,
}

impl WebDocument {
    pub fn new(document: Document, selectors: HostSelectors, markers: Markers, tooltip: String) -> Self {
        let control_selector = format!(".{}", markers.control_class);
        Self {
            document,
            selectors,
            markers,
            control_selector,
            tooltip,
        }
    }

    /// Selector matching injected block controls.
    pub fn control_selector(&self) -> &str {
        &self.control_selector
    }

    /// Narrowest ancestor holding the list, or the body.
    pub fn observation_root(&self) -> Option<Node> {
        if !self.selectors.list_container.trim().is_empty() {
            if let Ok(Some(container)) = self.document.query_selector(&self.selectors.list_container) {
                return Some(container.into());
            }
            log::debug!("List container not found, observing the document body");
        }
        self.document.body().map(Into::into)
    }

    fn find(&self, node: &Element, selector: &str) -> Option<Element> {
        if selector.trim().is_empty() {
            return None;
        }
        node.query_selector(selector).ok().flatten()
    }

    fn text(&self, node: &Element, selector: &str) -> Option<String> {
        self.find(node, selector).and_then(|el| el.text_content())
    }

    fn footer(&self, node: &Element) -> Option<Element> {
        self.find(node, &self.selectors.footer)
    }

    fn build_control(&self, company: &str) -> Result<Element, JsValue> {
        let control = self.document.create_element("li")?;
        control.set_class_name(&format!(
            "job-card-container__footer-item inline-flex align-items-center {}",
            self.markers.control_class
        ));
        control.set_attribute(COMPANY_ATTR, company)?;
        control.set_attribute("role", "button")?;
        control.set_attribute("tabindex", "0")?;
        control.set_attribute("title", &self.tooltip)?;
        control.set_attribute("aria-label", &format!("{}: {}", self.tooltip, company))?;
        control.set_inner_html(BLOCK_ICON);
        Ok(control)
    }
}

impl HostDocument for WebDocument {
    type Node = Element;

    fn candidates(&self) -> Vec<Element> {
        let list = match self.document.query_selector_all(&self.selectors.list_item) {
            Ok(list) => list,
            Err(e) => {
                log::debug!("List item selector failed: {:?}", e);
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn is_hidden(&self, node: &Element) -> bool {
        node.class_list().contains(&self.markers.hidden_class)
    }

    fn snapshot(&self, node: &Element) -> CandidateNode {
        let dismissed_marker = !self.selectors.dismissed_marker.trim().is_empty()
            && (node.matches(&self.selectors.dismissed_marker).unwrap_or(false)
                || self.find(node, &self.selectors.dismissed_marker).is_some());

        CandidateNode {
            company_name: self.text(node, &self.selectors.company_name),
            footer_text: self.text(node, &self.selectors.footer).unwrap_or_default(),
            dismiss_text: self.text(node, &self.selectors.dismiss_text).unwrap_or_default(),
            dismissed_marker,
            hidden_marker: self.is_hidden(node),
            has_block_control: self.find(node, &self.control_selector).is_some(),
        }
    }

    fn hide(&self, node: &Element) {
        if let Some(html) = node.dyn_ref::<HtmlElement>() {
            if let Err(e) = html.style().set_property("display", "none") {
                log::debug!("Failed to hide listing: {:?}", e);
            }
        }
        if let Err(e) = node.class_list().add_1(&self.markers.hidden_class) {
            log::debug!("Failed to mark listing hidden: {:?}", e);
        }
    }

    fn attach_block_control(&self, node: &Element, company: &str) -> bool {
        let Some(footer) = self.footer(node) else {
            return false;
        };
        if self.find(&footer, &self.control_selector).is_some() {
            return false;
        }
        match self.build_control(company).and_then(|control| footer.append_child(&control)) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Failed to attach block control: {:?}", e);
                false
            }
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use jb_core::reconcile::Reconciler;
    use jb_core::settings::{BlockedCompanies, Settings};
    use jb_core::types::FilterFlags;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn listing(document: &Document, company: &str, footer: &str) -> Element {
        let item = document.create_element("li").unwrap();
        item.set_class_name("discovery-templates-entity-item");
        item.set_inner_html(&format!(
            r#"<div class="artdeco-entity-lockup__subtitle"><span>{}</span></div>
               <ul class="job-card-list__footer-wrapper"><li>{}</li></ul>"#,
            company, footer
        ));
        item
    }

    fn page() -> (Document, Element) {
        let document = web_sys::window().unwrap().document().unwrap();
        let list = document.create_element("ul").unwrap();
        list.set_class_name("scaffold-layout__list");
        document.body().unwrap().append_child(&list).unwrap();
        for (company, footer) in [("Acme", ""), ("Beta", "Applied"), ("Gamma", "")] {
            list.append_child(&listing(&document, company, footer)).unwrap();
        }
        (document, list)
    }

    #[wasm_bindgen_test]
    fn test_pass_hides_and_attaches_controls() {
        let (document, list) = page();
        let doc = WebDocument::new(document, HostSelectors::default(), Markers::default(), "Block".to_string());
        let settings = Settings {
            blocked_companies: BlockedCompanies::from_names(["Acme"]),
            filters: FilterFlags::APPLIED,
            ..Settings::default()
        };

        let report = Reconciler::default().run(&doc, &settings).unwrap();
        assert_eq!(report.hidden_by_company, 1);
        assert_eq!(report.hidden_by_status, 1);
        assert_eq!(report.controls_added, 1);

        let controls = list.query_selector_all(doc.control_selector()).unwrap();
        assert_eq!(controls.length(), 1);
        let control: Element = controls.get(0).unwrap().dyn_into().unwrap();
        assert_eq!(control.get_attribute(COMPANY_ATTR).as_deref(), Some("Gamma"));

        let again = Reconciler::default().run(&doc, &settings).unwrap();
        assert_eq!(again.hidden(), 0);
        assert_eq!(again.controls_added, 0);
        list.remove();
    }
}
