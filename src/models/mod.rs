//! Core data models for the RM-01 switcher
//!
//! Both entities are transient: a module selector picked from the menu and
//! the lifecycle state of the one terminal session an action opens.

pub mod module_selector;
pub mod session_state;

// Re-exports for convenience
pub use module_selector::ModuleSelector;
pub use session_state::SessionState;
