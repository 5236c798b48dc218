//! Window chrome derived from the authoritative UI state: background color,
//! native theme hint and the theme/language menu.

use lazy_launcher_protocol::{Locale, Theme, UiState};
use serde::Serialize;

use crate::appearance::AppearanceProbe;

pub const DARK_BACKGROUND: &str = "#1e293b";
pub const LIGHT_BACKGROUND: &str = "#f8fafc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeAppearance {
    pub background: &'static str,
    /// Mirrors the theme value, including `system`.
    pub native_theme: Theme,
    pub dark: bool,
}

/// Resolves `theme` to concrete chrome. `system` consults `probe` now; a
/// later OS preference change is not picked up until the next resolve.
pub fn resolve_chrome(theme: Theme, probe: &dyn AppearanceProbe) -> ChromeAppearance {
    let dark = match theme {
        Theme::Dark => true,
        Theme::Light => false,
        Theme::System => probe.prefers_dark(),
    };

    ChromeAppearance {
        background: if dark { DARK_BACKGROUND } else { LIGHT_BACKGROUND },
        native_theme: theme,
        dark,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Menu
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: String,
    pub label: &'static str,
    pub checked: bool,
}

/// A radio group: exactly one item is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuGroup {
    pub id: &'static str,
    pub label: &'static str,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuModel {
    pub groups: Vec<MenuGroup>,
}

impl MenuModel {
    pub fn group(&self, id: &str) -> Option<&MenuGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// The checked item of group `id`.
    pub fn selected(&self, id: &str) -> Option<&MenuItem> {
        self.group(id)?.items.iter().find(|item| item.checked)
    }
}

pub fn build_menu_model(state: &UiState) -> MenuModel {
    let theme = MenuGroup {
        id: "theme",
        label: "Theme",
        items: Theme::ALL
            .into_iter()
            .map(|theme| MenuItem {
                id: format!("theme:{}", theme.as_str()),
                label: theme.label(),
                checked: theme == state.theme,
            })
            .collect(),
    };

    let language = MenuGroup {
        id: "language",
        label: "Language",
        items: Locale::SUPPORTED
            .into_iter()
            .map(|locale| MenuItem {
                id: format!("locale:{}", locale.as_str()),
                label: locale.display_name(),
                checked: locale == state.locale,
            })
            .collect(),
    };

    MenuModel {
        groups: vec![theme, language],
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Chrome Surfaces
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives chrome updates synchronously, before views are notified.
pub trait WindowChrome: Send {
    fn apply_appearance(&mut self, appearance: &ChromeAppearance);
    fn apply_menu(&mut self, menu: &MenuModel);
}

/// Chrome for runs without a native window: updates are logged.
#[derive(Debug, Default)]
pub struct HeadlessChrome;

impl WindowChrome for HeadlessChrome {
    fn apply_appearance(&mut self, appearance: &ChromeAppearance) {
        tracing::info!(
            background = appearance.background,
            native_theme = %appearance.native_theme,
            "Window chrome updated"
        );
    }

    fn apply_menu(&mut self, menu: &MenuModel) {
        let theme = menu.selected("theme").map(|item| item.id.as_str());
        let language = menu.selected("language").map(|item| item.id.as_str());
        tracing::info!(theme = ?theme, language = ?language, "Menu regenerated");
    }
}
