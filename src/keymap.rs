use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::TableAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeymapProfile {
    #[default]
    Default,
    Vim,
}

#[derive(Clone, Copy, Debug)]
pub struct TableKeyBindings {
    profile: KeymapProfile,
}

impl Default for TableKeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl TableKeyBindings {
    pub const fn new() -> Self {
        Self {
            profile: KeymapProfile::Default,
        }
    }

    pub const fn with_profile(profile: KeymapProfile) -> Self {
        Self { profile }
    }

    pub const fn profile(&self) -> KeymapProfile {
        self.profile
    }

    pub const fn set_profile(&mut self, profile: KeymapProfile) {
        self.profile = profile;
    }

    pub fn resolve<C>(&self, key: KeyEvent) -> Option<TableAction<C>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('a') => Some(TableAction::SelectAll),
                _ => None,
            };
        }

        let nav_action = match self.profile {
            KeymapProfile::Default => Self::resolve_default_nav(key),
            KeymapProfile::Vim => Self::resolve_vim_nav(key),
        };
        if nav_action.is_some() {
            return nav_action;
        }

        Self::resolve_common(key)
    }

    pub fn resolve_with<C, F>(&self, key: KeyEvent, custom: F) -> Option<TableAction<C>>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        if let Some(action) = custom(key) {
            return Some(TableAction::Custom(action));
        }

        self.resolve(key)
    }

    const fn resolve_default_nav<C>(key: KeyEvent) -> Option<TableAction<C>> {
        match key.code {
            KeyCode::Up => Some(TableAction::ActivatePrev),
            KeyCode::Down => Some(TableAction::ActivateNext),
            KeyCode::Left | KeyCode::Right | KeyCode::Enter => Some(TableAction::ToggleCollapse),
            KeyCode::Home => Some(TableAction::ActivateFirst),
            KeyCode::End => Some(TableAction::ActivateLast),
            _ => None,
        }
    }

    const fn resolve_vim_nav<C>(key: KeyEvent) -> Option<TableAction<C>> {
        match key.code {
            KeyCode::Char('k') => Some(TableAction::ActivatePrev),
            KeyCode::Char('j') => Some(TableAction::ActivateNext),
            KeyCode::Char('h' | 'l') | KeyCode::Enter => Some(TableAction::ToggleCollapse),
            KeyCode::Char('g') => Some(TableAction::ActivateFirst),
            KeyCode::Char('G') => Some(TableAction::ActivateLast),
            _ => None,
        }
    }

    fn resolve_common<C>(key: KeyEvent) -> Option<TableAction<C>> {
        match key.code {
            KeyCode::Char(' ') => Some(TableAction::ToggleSelect),
            KeyCode::Char('a') => Some(TableAction::SelectAll),
            KeyCode::Esc => Some(TableAction::ClearSelection),
            KeyCode::Char('c') => Some(TableAction::CollapseAll),
            KeyCode::Char(digit @ '1'..='9') => digit
                .to_digit(10)
                .map(|n| TableAction::ToggleSortAt(n as usize - 1)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn profiles_resolve_navigation_differently() {
        let default = TableKeyBindings::new();
        let vim = TableKeyBindings::with_profile(KeymapProfile::Vim);

        assert_eq!(default.resolve::<()>(key(KeyCode::Down)), Some(TableAction::ActivateNext));
        assert_eq!(default.resolve::<()>(key(KeyCode::Char('j'))), None);
        assert_eq!(vim.resolve::<()>(key(KeyCode::Char('j'))), Some(TableAction::ActivateNext));
        assert_eq!(vim.resolve::<()>(key(KeyCode::Char('G'))), Some(TableAction::ActivateLast));
    }

    #[test]
    fn digits_map_to_visible_column_sort() {
        let bindings = TableKeyBindings::new();
        assert_eq!(
            bindings.resolve::<()>(key(KeyCode::Char('3'))),
            Some(TableAction::ToggleSortAt(2))
        );
        assert_eq!(
            bindings.resolve::<()>(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)),
            Some(TableAction::SelectAll)
        );
    }

    #[test]
    fn custom_mapping_takes_precedence() {
        let bindings = TableKeyBindings::new();
        let action = bindings.resolve_with(key(KeyCode::Char(' ')), |_| Some("open"));
        assert_eq!(action, Some(TableAction::Custom("open")));
    }
}
