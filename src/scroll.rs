use std::cell::RefCell;
use std::rc::Rc;

use ratatui::widgets::TableState as RatatuiTableState;

/// Virtualizing render host that can bring a rendered row into view.
pub trait ScrollHost {
    fn scroll_to_index(&mut self, index: usize);
}

impl<H: ScrollHost + ?Sized> ScrollHost for Box<H> {
    fn scroll_to_index(&mut self, index: usize) {
        (**self).scroll_to_index(index);
    }
}

/// Lets the host keep its own handle to the scroll state.
impl<H: ScrollHost + ?Sized> ScrollHost for Rc<RefCell<H>> {
    fn scroll_to_index(&mut self, index: usize) {
        self.borrow_mut().scroll_to_index(index);
    }
}

/// Ratatui's table state: selects the row and lets the widget scroll to it on render.
impl ScrollHost for RatatuiTableState {
    fn scroll_to_index(&mut self, index: usize) {
        self.select(Some(index));
    }
}

/// Scroll policy when bringing a row into view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScrollPolicy {
    #[default]
    KeepInView,
    CenterOnTarget,
}

/// Viewport offset tracking for hosts that virtualize rows themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportScroll {
    offset: usize,
    viewport_height: usize,
    total: usize,
    policy: ScrollPolicy,
}

impl ViewportScroll {
    pub fn new(viewport_height: usize, policy: ScrollPolicy) -> Self {
        Self {
            offset: 0,
            viewport_height: viewport_height.max(1),
            total: 0,
            policy,
        }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Updates the number of rendered rows, clamping the offset.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.offset = self.offset.min(self.max_offset());
    }

    const fn max_offset(&self) -> usize {
        self.total.saturating_sub(self.viewport_height)
    }

    /// Range of row indices currently in view.
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        let start = self.offset.min(self.total);
        start..(start + self.viewport_height).min(self.total)
    }
}

impl ScrollHost for ViewportScroll {
    fn scroll_to_index(&mut self, index: usize) {
        let index = index.min(self.total.saturating_sub(1));
        match self.policy {
            ScrollPolicy::KeepInView => {
                if index < self.offset {
                    self.offset = index;
                } else if index >= self.offset + self.viewport_height {
                    self.offset = index + 1 - self.viewport_height;
                }
            }
            ScrollPolicy::CenterOnTarget => {
                if self.total <= self.viewport_height {
                    self.offset = 0;
                    return;
                }
                // Center, then clamp to valid scroll range.
                let half = self.viewport_height / 2;
                self.offset = index.saturating_sub(half).min(self.max_offset());
            }
        }
    }
}
