use std::collections::HashSet;

use log::debug;
use uuid::Uuid;

use super::label::label;
use super::model::{Group, Mark};
use crate::pdf::{NormRect, PageGeometry, drag_to_norm};

/// Drags shorter than this on either axis, in CSS pixels, create nothing
pub const DEFAULT_MIN_DRAG_PX: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkError {
    #[error("no mark with id {0}")]
    UnknownMark(String),

    #[error("no group with id {0}")]
    UnknownGroup(String),

    #[error("index {index} out of range for {len} marks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("reorder must list every mark exactly once ({expected} marks, got {got} ids)")]
    OrderMismatch { expected: usize, got: usize },

    #[error("mark id {0} already exists")]
    DuplicateId(String),
}

/// An ordered mark collection and the groups that reference it.
///
/// Array order is document order. After every structural edit the order
/// indexes are rewritten as `0..N-1` and labels are recomputed; mark ids are
/// never touched by relabeling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkSet {
    marks: Vec<Mark>,
    groups: Vec<Group>,
}

impl MarkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from backend records, ordered by their stored order index.
    ///
    /// Fails on the first repeated mark id.
    pub fn from_records(mut marks: Vec<Mark>, groups: Vec<Group>) -> Result<Self, MarkError> {
        let mut seen = HashSet::with_capacity(marks.len());
        let repeated = marks
            .iter()
            .find(|m| !seen.insert(m.id.as_str()))
            .map(|m| m.id.clone());
        drop(seen);
        if let Some(id) = repeated {
            return Err(MarkError::DuplicateId(id));
        }
        marks.sort_by_key(|m| m.order_index);
        let mut set = Self { marks, groups };
        set.relabel();
        Ok(set)
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.marks.iter().position(|m| m.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.marks.iter().map(|m| m.id.clone()).collect()
    }

    pub fn on_page(&self, page: usize) -> impl Iterator<Item = &Mark> {
        self.marks.iter().filter(move |m| m.page_index == page)
    }

    /// Append a mark at the end of document order
    pub fn push(&mut self, mark: Mark) -> Result<&Mark, MarkError> {
        let index = self.marks.len();
        self.insert(index, mark)
    }

    pub fn insert(&mut self, index: usize, mark: Mark) -> Result<&Mark, MarkError> {
        if index > self.marks.len() {
            return Err(MarkError::IndexOutOfRange {
                index,
                len: self.marks.len(),
            });
        }
        if self.get(&mark.id).is_some() {
            return Err(MarkError::DuplicateId(mark.id));
        }
        self.marks.insert(index, mark);
        self.relabel();
        Ok(&self.marks[index])
    }

    /// Remove a mark and drop it from every group
    pub fn remove(&mut self, id: &str) -> Result<Mark, MarkError> {
        let index = self.index_of(id)?;
        let mark = self.marks.remove(index);
        for group in &mut self.groups {
            group.remove_member(id);
        }
        self.relabel();
        debug!("Removed mark {id} ({} left)", self.marks.len());
        Ok(mark)
    }

    /// Move one mark to `to` in document order
    pub fn move_to(&mut self, id: &str, to: usize) -> Result<(), MarkError> {
        let from = self.index_of(id)?;
        if to >= self.marks.len() {
            return Err(MarkError::IndexOutOfRange {
                index: to,
                len: self.marks.len(),
            });
        }
        let mark = self.marks.remove(from);
        self.marks.insert(to, mark);
        self.relabel();
        Ok(())
    }

    /// Apply a complete new order given as mark ids
    pub fn set_order(&mut self, ids: &[String]) -> Result<(), MarkError> {
        if ids.len() != self.marks.len() {
            return Err(MarkError::OrderMismatch {
                expected: self.marks.len(),
                got: ids.len(),
            });
        }
        let mut remaining = std::mem::take(&mut self.marks);
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            match remaining.iter().position(|m| &m.id == id) {
                Some(i) => ordered.push(remaining.swap_remove(i)),
                None => {
                    // Restore the original order before failing
                    ordered.append(&mut remaining);
                    ordered.sort_by_key(|m| m.order_index);
                    self.marks = ordered;
                    return Err(MarkError::UnknownMark(id.clone()));
                }
            }
        }
        self.marks = ordered;
        self.relabel();
        Ok(())
    }

    /// Create a mark from a pointer drag on the displayed page.
    ///
    /// Start and end are page-local CSS pixels at `zoom`. The rect is clipped
    /// to the page first; if what remains is shorter than `min_drag_px` on
    /// either axis, nothing is created.
    pub fn create_from_drag(
        &mut self,
        page: &PageGeometry,
        zoom: f32,
        start: (f32, f32),
        end: (f32, f32),
        min_drag_px: f32,
    ) -> Option<&Mark> {
        let rect = drag_to_norm(start, end, page, zoom, min_drag_px)?;
        let id = Uuid::new_v4().to_string();
        let index = self.marks.len();
        let mut mark = Mark::new(id, page.page_index, rect);
        mark.name = format!("Mark {}", label(index));
        debug!("Created mark {} on page {}", mark.id, page.page_index);
        self.push(mark).ok()
    }

    /// Move a mark by a normalized delta
    pub fn translate(&mut self, id: &str, dx: f32, dy: f32) -> Result<(), MarkError> {
        let mark = self.mark_mut(id)?;
        mark.rect = mark.rect.translate(dx, dy);
        Ok(())
    }

    pub fn resize(&mut self, id: &str, rect: NormRect) -> Result<(), MarkError> {
        self.mark_mut(id)?.rect = rect;
        Ok(())
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<(), MarkError> {
        self.mark_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_zoom_hint(&mut self, id: &str, zoom: Option<f32>) -> Result<(), MarkError> {
        self.mark_mut(id)?.zoom_hint = zoom;
        Ok(())
    }

    pub fn set_instrument(&mut self, id: &str, instrument: Option<String>) -> Result<(), MarkError> {
        self.mark_mut(id)?.instrument = instrument;
        Ok(())
    }

    pub fn set_required(&mut self, id: &str, required: bool) -> Result<(), MarkError> {
        self.mark_mut(id)?.is_required = required;
        Ok(())
    }

    /// Record the value read for a required mark
    pub fn set_required_value(
        &mut self,
        id: &str,
        value: Option<String>,
        confidence: Option<f32>,
    ) -> Result<(), MarkError> {
        let mark = self.mark_mut(id)?;
        mark.required_value = value;
        mark.ocr_confidence = confidence;
        Ok(())
    }

    /// Topmost mark on `page` under a normalized point.
    ///
    /// Later marks are drawn over earlier ones, so the search runs backwards.
    pub fn hit_test(&self, page: usize, nx: f32, ny: f32) -> Option<&Mark> {
        self.marks
            .iter()
            .rev()
            .find(|m| m.page_index == page && m.rect.contains(nx, ny))
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub fn remove_group(&mut self, id: &str) -> Result<Group, MarkError> {
        let index = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| MarkError::UnknownGroup(id.to_string()))?;
        Ok(self.groups.remove(index))
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn add_to_group(&mut self, group_id: &str, mark_id: &str) -> Result<bool, MarkError> {
        self.index_of(mark_id)?;
        Ok(self.group_mut(group_id)?.add_member(mark_id))
    }

    pub fn remove_from_group(&mut self, group_id: &str, mark_id: &str) -> Result<bool, MarkError> {
        Ok(self.group_mut(group_id)?.remove_member(mark_id))
    }

    /// Members of a group in the group's own order. Stale ids are skipped.
    pub fn group_members(&self, group_id: &str) -> Result<Vec<&Mark>, MarkError> {
        let group = self
            .group(group_id)
            .ok_or_else(|| MarkError::UnknownGroup(group_id.to_string()))?;
        Ok(group.mark_ids.iter().filter_map(|id| self.get(id)).collect())
    }

    pub fn groups_containing(&self, mark_id: &str) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(move |g| g.contains(mark_id))
    }

    fn relabel(&mut self) {
        for (i, mark) in self.marks.iter_mut().enumerate() {
            mark.order_index = i;
            mark.label = label(i);
        }
    }

    fn index_of(&self, id: &str) -> Result<usize, MarkError> {
        self.position(id)
            .ok_or_else(|| MarkError::UnknownMark(id.to_string()))
    }

    fn mark_mut(&mut self, id: &str) -> Result<&mut Mark, MarkError> {
        self.marks
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| MarkError::UnknownMark(id.to_string()))
    }

    fn group_mut(&mut self, id: &str) -> Result<&mut Group, MarkError> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| MarkError::UnknownGroup(id.to_string()))
    }
}
