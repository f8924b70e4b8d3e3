use serde::{Deserialize, Serialize};

use crate::pdf::{NormRect, PageGeometry, Rect, mark_rect_at_zoom};

/// A labeled rectangular annotation on one page.
///
/// Records arrive already deserialized from the persistence backend. The
/// rect is normalized against the unrotated page and is kept as loaded, even
/// when it reaches past the page edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: String,
    pub page_index: usize,
    /// Dense position in the owning collection
    #[serde(default)]
    pub order_index: usize,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub rect: NormRect,
    /// Preferred zoom when navigating to this mark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_hint: Option<f32>,
    /// Derived from `order_index`, never edited directly
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f32>,
}

impl Mark {
    pub fn new(id: impl Into<String>, page_index: usize, rect: NormRect) -> Self {
        Self {
            id: id.into(),
            page_index,
            order_index: 0,
            name: String::new(),
            rect,
            zoom_hint: None,
            label: String::new(),
            instrument: None,
            is_required: false,
            required_value: None,
            ocr_confidence: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_zoom_hint(mut self, zoom: f32) -> Self {
        self.zoom_hint = Some(zoom);
        self
    }

    /// Pixel rect on the displayed page, rotation applied
    #[must_use]
    pub fn rect_at_zoom(&self, page: &PageGeometry, zoom: f32) -> Rect {
        mark_rect_at_zoom(self.rect, page, zoom)
    }
}

/// A named region referencing an ordered subset of marks.
///
/// The group rect is independent of its members' rects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub page_index: usize,
    #[serde(flatten)]
    pub rect: NormRect,
    #[serde(default)]
    pub mark_ids: Vec<String>,
}

impl Group {
    pub fn new(id: impl Into<String>, page_index: usize, rect: NormRect) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            page_index,
            rect,
            mark_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, mark_id: &str) -> bool {
        self.mark_ids.iter().any(|id| id == mark_id)
    }

    /// Append a member. Returns false if it was already present.
    pub fn add_member(&mut self, mark_id: &str) -> bool {
        if self.contains(mark_id) {
            return false;
        }
        self.mark_ids.push(mark_id.to_string());
        true
    }

    pub fn remove_member(&mut self, mark_id: &str) -> bool {
        let before = self.mark_ids.len();
        self.mark_ids.retain(|id| id != mark_id);
        self.mark_ids.len() != before
    }

    #[must_use]
    pub fn rect_at_zoom(&self, page: &PageGeometry, zoom: f32) -> Rect {
        mark_rect_at_zoom(self.rect, page, zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::Rotation;

    #[test]
    fn mark_json_uses_flat_rect_fields() {
        let json = r#"{
            "id": "m1",
            "page_index": 2,
            "order_index": 4,
            "name": "Total",
            "nx": 0.1, "ny": 0.2, "nw": 0.3, "nh": 0.1,
            "zoom_hint": 1.5,
            "is_required": true
        }"#;
        let mark: Mark = serde_json::from_str(json).unwrap();
        assert_eq!(mark.page_index, 2);
        assert_eq!(mark.rect, NormRect::new(0.1, 0.2, 0.3, 0.1));
        assert_eq!(mark.zoom_hint, Some(1.5));
        assert!(mark.is_required);
        assert_eq!(mark.instrument, None);

        let back = serde_json::to_value(&mark).unwrap();
        assert!(back.get("nx").is_some());
        assert!(back.get("instrument").is_none());
    }

    #[test]
    fn out_of_page_rect_survives_loading() {
        let json = r#"{"id":"m","page_index":0,"nx":0.9,"ny":0.0,"nw":0.3,"nh":0.1}"#;
        let mark: Mark = serde_json::from_str(json).unwrap();
        assert!(mark.rect.exceeds_page());
    }

    #[test]
    fn rotated_mark_rect() {
        let page = PageGeometry::new(0, 600.0, 800.0, Rotation::Cw90);
        let mark = Mark::new("m", 0, NormRect::new(0.1, 0.2, 0.3, 0.1));
        let rect = mark.rect_at_zoom(&page, 1.0);
        assert!(rect.approx_eq(Rect::new(160.0, 360.0, 80.0, 180.0), 1e-3));
    }

    #[test]
    fn group_membership() {
        let mut group = Group::new("g", 0, NormRect::new(0.0, 0.0, 0.5, 0.5));
        assert!(group.add_member("a"));
        assert!(!group.add_member("a"));
        assert!(group.add_member("b"));
        assert_eq!(group.mark_ids, vec!["a", "b"]);
        assert!(group.remove_member("a"));
        assert!(!group.remove_member("a"));
        assert!(!group.contains("a"));
    }
}
