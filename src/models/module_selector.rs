//! Module Selector Model
//!
//! The two operating personalities of the RM-01 carrier board and the
//! `usbmux` tokens that select them.

use std::fmt;

/// Which module the USB multiplexer routes the console to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleSelector {
    /// AGX inference module
    Inference,
    /// Low-power application module
    Application,
}

impl ModuleSelector {
    /// Literal token sent in `usbmux <token>`
    pub fn token(self) -> &'static str {
        match self {
            ModuleSelector::Inference => "agx",
            ModuleSelector::Application => "lpmu",
        }
    }

    /// Human-readable module name
    pub fn display_name(self) -> &'static str {
        match self {
            ModuleSelector::Inference => "Inference Module",
            ModuleSelector::Application => "Application Module",
        }
    }

    /// Device command that routes the multiplexer to this module
    pub fn usbmux_command(self) -> String {
        format!("usbmux {}", self.token())
    }

    /// Whether switching to this module also forces it into recovery
    pub fn requires_recovery(self) -> bool {
        matches!(self, ModuleSelector::Inference)
    }
}

impl fmt::Display for ModuleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
