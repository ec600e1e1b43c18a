//! Cursor and scroll movement for bb.
//!
//! Both setters clamp their argument, so callers can pass any offset
//! computed from user input. The scroll-off margin keeps a few rows visible
//! above and below the cursor whenever the view is taller than the viewport.

use crate::app::state::BrowserState;

impl BrowserState {
    /// Effective scroll-off margin for the current viewport.
    pub fn margin(&self) -> usize {
        self.scroll_margin.min(self.viewport_height.saturating_sub(1) / 2)
    }

    pub fn max_scroll(&self) -> usize {
        self.view.len().saturating_sub(self.viewport_height)
    }

    /// Moves the cursor to `i`, clamped to the view, and scrolls so it stays
    /// inside the margin.
    pub fn set_cursor(&mut self, i: isize) {
        let n = self.view.len();
        if n == 0 {
            self.cursor = 0;
            self.scroll = 0;
            return;
        }
        let cursor = i.clamp(0, n as isize - 1) as usize;
        self.cursor = cursor;

        let h = self.viewport_height;
        if n <= h {
            self.scroll = 0;
            return;
        }
        let m = self.margin();
        let mut scroll = self.scroll;
        if cursor < scroll + m {
            scroll = cursor.saturating_sub(m);
        } else if cursor + m >= scroll + h {
            scroll = cursor + m + 1 - h;
        }
        self.scroll = scroll.min(self.max_scroll());
    }

    /// Scrolls to `i`, clamped to the valid range. The cursor follows by the
    /// same delta, then is pulled back inside the margin window. At the ends
    /// of the list the margin does not apply.
    pub fn set_scroll(&mut self, i: isize) {
        let n = self.view.len();
        if n == 0 {
            return;
        }
        let scroll = i.clamp(0, self.max_scroll() as isize) as usize;
        let delta = scroll as isize - self.scroll as isize;
        self.scroll = scroll;

        let h = self.viewport_height;
        let m = self.margin();
        let lo = if scroll == 0 { 0 } else { scroll + m };
        let hi = if scroll + h >= n {
            n - 1
        } else {
            (scroll + h - 1).saturating_sub(m)
        };

        let moved = (self.cursor as isize + delta).clamp(0, n as isize - 1) as usize;
        self.cursor = moved.clamp(lo.min(hi), hi).min(n - 1);
    }

    /// Moves by `delta` rows relative to the cursor.
    pub fn move_cursor_by(&mut self, delta: isize) {
        self.set_cursor(self.cursor as isize + delta);
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.set_scroll(self.scroll as isize + delta);
    }
}

#[cfg(test)]
mod tests {
    use crate::app::state::{BrowserSettings, BrowserState};
    use std::fs::File;
    use tempfile::tempdir;

    fn state_with(files: usize, height: usize) -> Result<BrowserState, Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        for i in 0..files {
            File::create(tmp.path().join(format!("f{i:03}")))?;
        }
        let settings = BrowserSettings {
            viewport_height: height,
            ..BrowserSettings::default()
        };
        // `..` adds one row to the view.
        let state = BrowserState::open(tmp.path(), settings)?;
        assert_eq!(state.nfiles(), files + 1);
        Ok(state)
    }

    #[test]
    fn cursor_is_clamped() -> Result<(), Box<dyn std::error::Error>> {
        let mut state = state_with(30, 10)?;
        state.set_cursor(-100);
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.scroll(), 0);
        state.set_cursor(10_000);
        assert_eq!(state.cursor(), state.nfiles() - 1);
        assert_eq!(state.scroll(), state.max_scroll());
        Ok(())
    }

    #[test]
    fn cursor_keeps_margin() -> Result<(), Box<dyn std::error::Error>> {
        let mut state = state_with(50, 10)?;
        // margin = min(5, (10 - 1) / 2) = 4
        assert_eq!(state.margin(), 4);
        state.set_cursor(9);
        assert_eq!(state.scroll(), 4);
        state.set_cursor(5);
        assert_eq!(state.scroll(), 1);
        Ok(())
    }

    #[test]
    fn short_list_never_scrolls() -> Result<(), Box<dyn std::error::Error>> {
        let mut state = state_with(3, 10)?;
        state.set_cursor(3);
        assert_eq!(state.scroll(), 0);
        state.set_scroll(5);
        assert_eq!(state.scroll(), 0);
        assert_eq!(state.cursor(), 3);
        Ok(())
    }

    #[test]
    fn scroll_carries_cursor_along() -> Result<(), Box<dyn std::error::Error>> {
        let mut state = state_with(199, 40)?;
        state.set_cursor(20);
        assert_eq!(state.scroll(), 0);
        state.scroll_by(20);
        assert_eq!(state.scroll(), 20);
        assert_eq!(state.cursor(), 40);
        Ok(())
    }

    #[test]
    fn scroll_pulls_cursor_into_margin() -> Result<(), Box<dyn std::error::Error>> {
        let mut state = state_with(99, 20)?;
        state.set_cursor(0);
        state.set_scroll(50);
        assert_eq!(state.scroll(), 50);
        assert_eq!(state.cursor(), 55);

        state.set_scroll(1_000);
        assert_eq!(state.scroll(), state.max_scroll());
        Ok(())
    }
}
