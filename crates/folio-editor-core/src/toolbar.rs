//! Toolbar state and focus policy.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::style::Rgb;

pub const FONT_FAMILIES: &[&str] = &[
    "Inter",
    "Arial",
    "Georgia",
    "Times New Roman",
    "Courier New",
    "Verdana",
    "微軟正黑體",
    "新細明體",
];

pub const FONT_SIZES: &[u32] = &[12, 14, 16, 18, 20, 24, 28, 32, 36];

/// Editor defaults, read from the `[editor]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub default_font_family: String,
    pub default_font_size: u32,
    /// Prefix for relative upload URLs.
    pub asset_base_url: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_font_family: "Inter".into(),
            default_font_size: 16,
            asset_base_url: String::new(),
        }
    }
}

/// What the pickers currently show. Purely presentational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarState {
    pub text_color: Rgb,
    pub background_color: Rgb,
    pub font_family: SmolStr,
    pub font_size: u32,
}

impl Default for ToolbarState {
    fn default() -> Self {
        Self::from_settings(&EditorSettings::default())
    }
}

impl ToolbarState {
    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self {
            text_color: Rgb::WHITE,
            background_color: Rgb::WHITE,
            font_family: settings.default_font_family.as_str().into(),
            font_size: settings.default_font_size,
        }
    }
}

/// Kinds of toolbar controls, as far as focus is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarControl {
    Button,
    /// Color or text input.
    Input,
    Select,
    /// File picker label.
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPolicy {
    /// Suppress the default pointer-down so the editor keeps focus.
    KeepEditorFocus,
    /// Let the control take focus; its value handler restores the selection.
    AllowFocusChange,
}

impl ToolbarControl {
    pub fn focus_policy(self) -> FocusPolicy {
        match self {
            ToolbarControl::Button => FocusPolicy::KeepEditorFocus,
            ToolbarControl::Input | ToolbarControl::Select | ToolbarControl::Label => {
                FocusPolicy::AllowFocusChange
            }
        }
    }
}
