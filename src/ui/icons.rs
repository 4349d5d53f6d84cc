//! Shared UI icons.
//!
//! Emoji with plain-text fallbacks for terminals that cannot render them.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Board structure
pub static BOARD: Emoji<'_, '_> = Emoji("📋 ", "#");
pub static LIST: Emoji<'_, '_> = Emoji("🗂️  ", "=");
pub static CARD: Emoji<'_, '_> = Emoji("▪️  ", "-");
pub static MOVE: Emoji<'_, '_> = Emoji("🔀 ", "->");

// Card details
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "due");
pub static USER: Emoji<'_, '_> = Emoji("👤 ", "@");
