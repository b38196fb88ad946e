use std::collections::HashMap;

use crate::models::{MacroTheme, SubTheme, Theme};

/// Read-only questionnaire hierarchy with id lookups.
///
/// Built once from the store after seeding; nothing mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct Questionnaire {
    macro_themes: Vec<MacroTheme>,
    theme_index: HashMap<i64, (usize, usize)>,
    sub_theme_index: HashMap<i64, (usize, usize, usize)>,
}

#[derive(Debug, Clone, Copy)]
pub struct ThemeEntry<'a> {
    pub macro_theme: &'a MacroTheme,
    pub theme: &'a Theme,
}

#[derive(Debug, Clone, Copy)]
pub struct SubThemeEntry<'a> {
    pub theme: &'a Theme,
    pub sub_theme: &'a SubTheme,
    /// Position of the sub-theme within its theme.
    pub position: usize,
}

impl Questionnaire {
    pub fn new(macro_themes: Vec<MacroTheme>) -> Self {
        let mut theme_index = HashMap::new();
        let mut sub_theme_index = HashMap::new();

        for (m, macro_theme) in macro_themes.iter().enumerate() {
            for (t, theme) in macro_theme.themes.iter().enumerate() {
                theme_index.insert(theme.id, (m, t));
                for (s, sub_theme) in theme.sub_themes.iter().enumerate() {
                    sub_theme_index.insert(sub_theme.id, (m, t, s));
                }
            }
        }

        Self {
            macro_themes,
            theme_index,
            sub_theme_index,
        }
    }

    pub fn macro_themes(&self) -> &[MacroTheme] {
        &self.macro_themes
    }

    pub fn is_empty(&self) -> bool {
        self.macro_themes.is_empty()
    }

    /// All themes in questionnaire order.
    pub fn themes(&self) -> impl Iterator<Item = ThemeEntry<'_>> {
        self.macro_themes.iter().flat_map(|macro_theme| {
            macro_theme
                .themes
                .iter()
                .map(move |theme| ThemeEntry { macro_theme, theme })
        })
    }

    pub fn theme(&self, theme_id: i64) -> Option<ThemeEntry<'_>> {
        let &(m, t) = self.theme_index.get(&theme_id)?;
        let macro_theme = &self.macro_themes[m];
        Some(ThemeEntry {
            macro_theme,
            theme: &macro_theme.themes[t],
        })
    }

    pub fn sub_theme(&self, sub_theme_id: i64) -> Option<SubThemeEntry<'_>> {
        let &(m, t, s) = self.sub_theme_index.get(&sub_theme_id)?;
        let theme = &self.macro_themes[m].themes[t];
        Some(SubThemeEntry {
            theme,
            sub_theme: &theme.sub_themes[s],
            position: s,
        })
    }

    #[cfg(test)]
    pub fn theme_by_sequence(&self, sequence: i64) -> Option<ThemeEntry<'_>> {
        self.themes().find(|entry| entry.theme.sequence == sequence)
    }
}
