//! The long-press menu.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Back,
    PlayPause,
    Mute,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [MenuItem::Back, MenuItem::PlayPause, MenuItem::Mute];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Back => "Back",
            MenuItem::PlayPause => "Play / Pause",
            MenuItem::Mute => "Mute",
        }
    }
}

/// Move selection cursor one item up.
pub fn select_prev(selected: usize) -> usize {
    selected.saturating_sub(1)
}

/// Move selection cursor one item down if another item exists.
pub fn select_next(selected: usize, item_count: usize) -> usize {
    if selected + 1 < item_count {
        selected + 1
    } else {
        selected
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    selected: usize,
}

impl Menu {
    pub fn reset(&mut self) {
        self.selected = 0;
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn current(&self) -> MenuItem {
        MenuItem::ALL[self.selected.min(MenuItem::ALL.len() - 1)]
    }

    /// One step per detent; stops at either end.
    pub fn scroll(&mut self, delta: i32) {
        for _ in 0..delta.unsigned_abs() {
            self.selected = if delta > 0 {
                select_next(self.selected, MenuItem::ALL.len())
            } else {
                select_prev(self.selected)
            };
        }
    }

    pub fn labels() -> [&'static str; 3] {
        MenuItem::ALL.map(MenuItem::label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_clamps_at_ends() {
        let mut menu = Menu::default();
        menu.scroll(-1);
        assert_eq!(menu.current(), MenuItem::Back);
        menu.scroll(1);
        assert_eq!(menu.current(), MenuItem::PlayPause);
        menu.scroll(5);
        assert_eq!(menu.current(), MenuItem::Mute);
        menu.reset();
        assert_eq!(menu.selected(), 0);
    }
}
