//! Theme Token Provider
//!
//! Supplies the named color tokens the chart configuration carries (text,
//! background, border, axis line). Tokens are requested opportunistically:
//! a missing source or token falls back to a fixed default and never fails
//! the pipeline.

use serde::Serialize;

// =============================================================================
// Tokens
// =============================================================================

/// Named theme color tokens consumed by the chart configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeToken {
    /// Label and tooltip text color.
    Text,
    /// Chart background color.
    Background,
    /// Panel border color.
    Border,
    /// Axis line color.
    AxisLine,
}

impl ThemeToken {
    /// All tokens.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Text, Self::Background, Self::Border, Self::AxisLine]
    }

    /// Fixed fallback color for this token.
    #[must_use]
    pub const fn default_color(self) -> &'static str {
        match self {
            Self::Text => "#1F2933",
            Self::Background => "#FFFFFF",
            Self::Border => "#D2D6DC",
            Self::AxisLine => "#9AA5B1",
        }
    }

    /// Environment variable the env-backed source reads for this token.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Text => "CHART_THEME_TEXT",
            Self::Background => "CHART_THEME_BACKGROUND",
            Self::Border => "CHART_THEME_BORDER",
            Self::AxisLine => "CHART_THEME_AXIS_LINE",
        }
    }
}

// =============================================================================
// Theme Source
// =============================================================================

/// Source of theme color tokens.
///
/// Implementations return `None` for tokens they cannot supply; the
/// resolver falls back to the fixed defaults.
#[cfg_attr(test, mockall::automock)]
pub trait ThemeSource {
    /// Look up a color token, if available.
    fn token(&self, token: ThemeToken) -> Option<String>;
}

/// Theme source backed by environment variables (`CHART_THEME_*`).
#[derive(Debug, Default, Clone)]
pub struct EnvTheme;

impl EnvTheme {
    /// Create a new environment-backed theme source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ThemeSource for EnvTheme {
    fn token(&self, token: ThemeToken) -> Option<String> {
        std::env::var(token.env_var())
            .ok()
            .filter(|value| !value.is_empty())
    }
}

// =============================================================================
// Resolved Colors
// =============================================================================

/// Fully resolved theme colors, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColors {
    /// Label and tooltip text color.
    pub text: String,
    /// Chart background color.
    pub background: String,
    /// Panel border color.
    pub border: String,
    /// Axis line color.
    pub axis_line: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            text: ThemeToken::Text.default_color().to_string(),
            background: ThemeToken::Background.default_color().to_string(),
            border: ThemeToken::Border.default_color().to_string(),
            axis_line: ThemeToken::AxisLine.default_color().to_string(),
        }
    }
}

impl ThemeColors {
    /// Resolve all tokens from a source, falling back to the defaults for
    /// anything the source does not supply.
    #[must_use]
    pub fn resolve(source: &dyn ThemeSource) -> Self {
        let lookup = |token: ThemeToken| {
            source
                .token(token)
                .unwrap_or_else(|| token.default_color().to_string())
        };
        Self {
            text: lookup(ThemeToken::Text),
            background: lookup(ThemeToken::Background),
            border: lookup(ThemeToken::Border),
            axis_line: lookup(ThemeToken::AxisLine),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
