//! Defaults for widget display options that are "on" unless a saved report turns them off.
//!
//! Referenced by path from serde attributes, e.g.
//! `#[serde(default = "crate::serde_defaults::default_true")]`.

pub(crate) const DEFAULT_TICK_FONT_SIZE: u32 = 12;

pub(crate) const fn default_true() -> bool {
    true
}

pub(crate) const fn default_tick_font_size() -> u32 {
    DEFAULT_TICK_FONT_SIZE
}
