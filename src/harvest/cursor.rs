/// Number of scroll increments needed for a page of `page_height` pixels.
///
/// The remainder is dropped, so the last partial segment is not scrolled to.
pub fn step_count(page_height: u64, step_px: u64) -> u64 {
    if step_px == 0 {
        return 0;
    }
    page_height / step_px
}

/// Viewport offset that walks down the page in fixed increments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    position: u64,
    step_px: u64,
    total_steps: u64,
    taken: u64,
}

impl PageCursor {
    /// Cursor at the top of a page of `page_height` pixels.
    pub fn new(page_height: u64, step_px: u64) -> Self {
        Self {
            position: 0,
            step_px,
            total_steps: step_count(page_height, step_px),
            taken: 0,
        }
    }

    /// Move one step down. Returns the new offset, or `None` once exhausted.
    pub fn advance(&mut self) -> Option<u64> {
        if self.is_exhausted() {
            return None;
        }
        self.taken += 1;
        self.position += self.step_px;
        Some(self.position)
    }

    /// Re-derive the step total from a taller page, never exceeding `max_steps`.
    /// A page that shrank does not reduce the total.
    pub fn extend_to(&mut self, page_height: u64, max_steps: u64) {
        let wanted = step_count(page_height, self.step_px).min(max_steps);
        self.total_steps = self.total_steps.max(wanted);
    }

    pub fn is_exhausted(&self) -> bool {
        self.taken >= self.total_steps
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn step_px(&self) -> u64 {
        self.step_px
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Steps taken so far.
    pub fn taken(&self) -> u64 {
        self.taken
    }
}
