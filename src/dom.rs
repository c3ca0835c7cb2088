//! In-memory document the views render into.
//!
//! Elements are addressed by id only. Every mutation helper here treats a
//! missing element as a no-op so that partial page layouts keep working.

use crate::ui::Fragment;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// How long a changed value stays highlighted after a write.
pub const HIGHLIGHT_FADE: Duration = Duration::from_millis(1200);

pub type SharedDocument = Arc<Mutex<Document>>;

#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub text: String,
    pub html: String,
    pub visible: bool,
    pub classes: BTreeSet<String>,
    /// State of the element itself when it is a checkbox control.
    pub checked: bool,
    /// Checkbox values of the rows currently rendered inside this element.
    pub row_ids: Vec<String>,
    /// Row checkboxes that are ticked.
    pub selection: BTreeSet<String>,
    pub writes: u64,
    #[serde(skip)]
    pub highlighted_at: Option<Instant>,
}

impl Default for Element {
    fn default() -> Self {
        Self {
            text: String::new(),
            html: String::new(),
            visible: true,
            classes: BTreeSet::new(),
            checked: false,
            row_ids: Vec::new(),
            selection: BTreeSet::new(),
            writes: 0,
            highlighted_at: None,
        }
    }
}

impl Element {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::default()
        }
    }

    pub fn checkbox(checked: bool) -> Self {
        Self {
            checked,
            ..Self::default()
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.html.clear();
        self.writes += 1;
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
        self.text.clear();
        self.writes += 1;
    }

    /// Replaces the rendered rows. Any previous row selection is discarded,
    /// exactly as a wholesale `innerHTML` swap would.
    pub fn set_fragment(&mut self, fragment: Fragment) {
        self.set_html(fragment.html);
        self.row_ids = fragment.row_ids;
        self.selection.clear();
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn pulse(&mut self, now: Instant) {
        self.highlighted_at = Some(now);
    }

    pub fn is_highlighted(&self, now: Instant) -> bool {
        self.highlighted_at
            .is_some_and(|start| now.saturating_duration_since(start) < HIGHLIGHT_FADE)
    }

    /// Ticks a row checkbox. Returns false when no such row is rendered.
    pub fn check_row(&mut self, row_id: &str) -> bool {
        if self.row_ids.iter().any(|id| id == row_id) {
            self.selection.insert(row_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_row_checked(&self, row_id: &str) -> bool {
        self.selection.contains(row_id)
    }

    pub fn capture_selection(&self) -> BTreeSet<String> {
        self.selection.clone()
    }

    /// Re-ticks captured rows that survived a rebuild; the rest are dropped.
    pub fn apply_selection(&mut self, selection: &BTreeSet<String>) {
        for id in selection {
            self.check_row(id);
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Document {
    elements: BTreeMap<String, Element>,
    alerts: Vec<String>,
    reload_requested: bool,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document pre-populated with empty, visible elements.
    pub fn with_elements(ids: &[&str]) -> Self {
        let mut doc = Self::new();
        for id in ids {
            doc.insert(id, Element::default());
        }
        doc
    }

    pub fn shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn insert(&mut self, id: &str, element: Element) {
        self.elements.insert(id.to_string(), element);
    }

    pub fn remove(&mut self, id: &str) -> Option<Element> {
        self.elements.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Returns the element, creating it with `init` when absent.
    pub fn get_or_insert_with(&mut self, id: &str, init: impl FnOnce() -> Element) -> &mut Element {
        self.elements.entry(id.to_string()).or_insert_with(init)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).map(|el| el.text.as_str())
    }

    pub fn html(&self, id: &str) -> Option<&str> {
        self.get(id).map(|el| el.html.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.elements.iter().map(|(id, el)| (id.as_str(), el))
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.alerts.push(message.into());
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }
}

/// Writes `new_text` into `field_id` only if the trimmed text differs, and
/// starts a highlight on the element when it does. Returns whether it wrote.
pub fn update_field(doc: &mut Document, field_id: &str, new_text: &str) -> bool {
    let Some(el) = doc.get_mut(field_id) else {
        return false;
    };
    if el.text.trim() == new_text.trim() {
        return false;
    }
    el.set_text(new_text);
    el.pulse(Instant::now());
    true
}

/// Unconditional text write, without a highlight.
pub fn set_text(doc: &mut Document, field_id: &str, text: &str) -> bool {
    match doc.get_mut(field_id) {
        Some(el) => {
            el.set_text(text);
            true
        }
        None => false,
    }
}

/// Swaps the rows of a table body while keeping ticked rows that still exist.
pub fn replace_rows(doc: &mut Document, body_id: &str, fragment: Fragment) -> bool {
    let Some(body) = doc.get_mut(body_id) else {
        return false;
    };
    let selection = body.capture_selection();
    body.set_fragment(fragment);
    body.apply_selection(&selection);
    true
}
