#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityAction {
    ShowAndFocus,
    Hide,
    Unchanged,
}

/// Whether the floating input window is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityState {
    visible: bool,
}

impl VisibilityState {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) -> VisibilityAction {
        if self.visible {
            return VisibilityAction::Unchanged;
        }
        self.visible = true;
        VisibilityAction::ShowAndFocus
    }

    pub fn hide(&mut self) -> VisibilityAction {
        if !self.visible {
            return VisibilityAction::Unchanged;
        }
        self.visible = false;
        VisibilityAction::Hide
    }

    /// Hotkey, tray "Open / Hide" and the trigger file all land here.
    pub fn toggle(&mut self) -> VisibilityAction {
        if self.visible {
            self.hide()
        } else {
            self.show()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{VisibilityAction, VisibilityState};

    #[test]
    fn toggle_alternates() {
        let mut state = VisibilityState::default();
        assert_eq!(state.toggle(), VisibilityAction::ShowAndFocus);
        assert!(state.is_visible());
        assert_eq!(state.toggle(), VisibilityAction::Hide);
        assert!(!state.is_visible());
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let mut state = VisibilityState::default();
        assert_eq!(state.hide(), VisibilityAction::Unchanged);
        assert_eq!(state.show(), VisibilityAction::ShowAndFocus);
        assert_eq!(state.show(), VisibilityAction::Unchanged);
        assert_eq!(state.hide(), VisibilityAction::Hide);
    }
}
