//! Client-side paging and single-expansion state for already-loaded lists.

/// Items shown before the first "load more"
pub const INITIAL_VISIBLE: usize = 15;
/// Items added per "load more"
pub const REVEAL_STEP: usize = 10;

/// Visible-count cursor over a fully loaded list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    visible: usize,
    total: usize,
}

impl Reveal {
    pub fn new(total: usize) -> Self {
        Self::with_initial(INITIAL_VISIBLE, total)
    }

    pub fn with_initial(initial: usize, total: usize) -> Self {
        Self {
            visible: initial.min(total),
            total,
        }
    }

    /// Show up to `REVEAL_STEP` more items; returns whether anything changed
    pub fn reveal_more(&mut self) -> bool {
        let next = self.visible.saturating_add(REVEAL_STEP).min(self.total);
        let changed = next != self.visible;
        self.visible = next;
        changed
    }

    pub const fn visible_count(&self) -> usize {
        self.visible
    }

    pub const fn total(&self) -> usize {
        self.total
    }

    pub const fn has_more(&self) -> bool {
        self.visible < self.total
    }

    /// Re-clamp after the underlying list was reloaded
    pub fn reset(&mut self, total: usize) {
        *self = Self::new(total);
    }

    /// The visible prefix of `items`
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible.min(items.len())]
    }
}

/// At most one expanded item at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accordion<K> {
    expanded: Option<K>,
}

impl<K> Default for Accordion<K> {
    fn default() -> Self {
        Self { expanded: None }
    }
}

impl<K: Copy + PartialEq> Accordion<K> {
    /// Expand `key`, or collapse it if it is already expanded
    pub fn toggle(&mut self, key: K) -> Option<K> {
        self.expanded = if self.expanded == Some(key) {
            None
        } else {
            Some(key)
        };
        self.expanded
    }

    pub fn is_expanded(&self, key: K) -> bool {
        self.expanded == Some(key)
    }

    pub const fn expanded(&self) -> Option<K> {
        self.expanded
    }
}
