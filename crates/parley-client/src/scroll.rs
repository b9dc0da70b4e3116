//! Backward pagination driven by scroll position.
//!
//! The host owns the scroll container; the engine sees it through the
//! [`ScrollViewport`] contract.  Prepending history must not move what
//! the user is looking at, so the controller follows a two-phase
//! protocol: snapshot the content height before the fetch, apply the
//! prepend, wait one deferred tick for the host to incorporate it, then
//! shift the offset by the height delta.

use std::time::Duration;

use tracing::debug;

use parley_shared::constants::{
    FIRST_PAGE, JUMP_BUTTON_THRESHOLD_PX, SCROLL_RESTORE_DELAY_MS, SCROLL_TOP_THRESHOLD_PX,
};

/// Read/write contract onto the host scroll container.  Heights are only
/// trusted after the host has laid out the current content.
pub trait ScrollViewport {
    fn scroll_top(&self) -> f64;
    fn scroll_height(&self) -> f64;
    fn client_height(&self) -> f64;
    fn set_scroll_top(&mut self, offset: f64);
}

/// Whether the jump-to-bottom affordance should be visible.  Purely a
/// function of distance from the bottom; independent of paging state.
pub fn jump_button_visible(view: &impl ScrollViewport) -> bool {
    let distance = view.scroll_height() - view.scroll_top() - view.client_height();
    distance > JUMP_BUTTON_THRESHOLD_PX
}

/// Token for one in-flight older-page fetch, carrying the page number
/// and the height snapshot taken before the prepend.
#[derive(Debug, Clone, Copy)]
pub struct PrependFetch {
    pub page: u32,
    prev_scroll_height: f64,
}

impl PrependFetch {
    /// Offset that keeps the viewport visually stable once the host has
    /// incorporated the prepended content.
    pub fn restored_offset(&self, view: &impl ScrollViewport) -> f64 {
        view.scroll_height() - self.prev_scroll_height + view.scroll_top()
    }

    /// Defer one tick, then restore the offset.
    pub async fn restore(&self, view: &mut impl ScrollViewport) {
        tokio::time::sleep(Duration::from_millis(SCROLL_RESTORE_DELAY_MS)).await;
        let offset = self.restored_offset(view);
        debug!(page = self.page, offset, "Restoring scroll offset after prepend");
        view.set_scroll_top(offset);
    }
}

/// State machine gating older-page fetches.
///
/// `is_loading_more` guards the whole fetch-and-restore cycle against
/// overlap; `has_more` turns false on the first empty page and stays
/// false for the room's lifetime in memory.
#[derive(Debug)]
pub struct Paginator {
    page: u32,
    is_loading_more: bool,
    has_more: bool,
}

impl Paginator {
    pub fn new() -> Self {
        Self {
            page: FIRST_PAGE,
            is_loading_more: false,
            has_more: true,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Evaluate the near-top trigger for one scroll event.  When a fetch
    /// should start, arms the in-flight guard, advances the page counter
    /// and snapshots the current content height.
    pub fn on_scroll(&mut self, view: &impl ScrollViewport) -> Option<PrependFetch> {
        if view.scroll_top() > SCROLL_TOP_THRESHOLD_PX || self.is_loading_more || !self.has_more {
            return None;
        }

        self.is_loading_more = true;
        self.page += 1;
        debug!(page = self.page, "Near-top scroll, fetching older page");
        Some(PrependFetch {
            page: self.page,
            prev_scroll_height: view.scroll_height(),
        })
    }

    /// Record a resolved fetch.  An empty page is the terminal
    /// end-of-history signal.
    ///
    /// The in-flight guard stays armed: this fetch's deferred restore has
    /// not run yet, and a fetch started underneath it would snapshot a
    /// height the pending restore is still working from.  The guard
    /// clears in [`release`](Self::release).
    pub fn finish(&mut self, fetch: &PrependFetch, page_len: usize) {
        if page_len == 0 {
            debug!(page = fetch.page, "Empty page, end of history");
            self.has_more = false;
        }
    }

    /// Clear the in-flight guard once the fetch has fully settled, i.e.
    /// after the deferred restore ran (or was skipped for an empty page).
    pub fn release(&mut self, fetch: &PrependFetch) {
        debug!(page = fetch.page, "Older-page fetch settled");
        self.is_loading_more = false;
    }

    /// Record a rejected fetch.  The guard clears so further scrolling
    /// retries; `has_more` stays as it was.
    pub fn abort(&mut self, fetch: &PrependFetch) {
        debug!(page = fetch.page, "Older-page fetch failed");
        self.is_loading_more = false;
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}
