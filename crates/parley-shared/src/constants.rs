/// Trailing-edge delay before a stop-typing signal is emitted, in
/// milliseconds.  Every keystroke while announcing restarts this timer.
pub const TYPING_STOP_DELAY_MS: u64 = 1200;

/// Scroll offset from the top of the message container, in pixels, at or
/// below which the next older page is fetched.
pub const SCROLL_TOP_THRESHOLD_PX: f64 = 10.0;

/// Distance from the bottom of the message container, in pixels, beyond
/// which the jump-to-bottom affordance is shown.
pub const JUMP_BUTTON_THRESHOLD_PX: f64 = 100.0;

/// Delay before the scroll offset is restored after a prepend, in
/// milliseconds.  The container height is only accurate once the host has
/// incorporated the prepended content, so the restore step is deferred.
pub const SCROLL_RESTORE_DELAY_MS: u64 = 50;

/// Page number of the most recent history page.
pub const FIRST_PAGE: u32 = 1;

/// Body text substituted in place when a message is recalled.  Deletion
/// rewrites the entry; it never removes it from the list.
pub const RECALLED_MESSAGE_TEXT: &str = "Message has been recalled";

/// Sentinel percent meaning "no upload in flight".
pub const UPLOAD_PROGRESS_NONE: i32 = -1;
