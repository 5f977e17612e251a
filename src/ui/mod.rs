//! Terminal output for the cachegate CLI
//!
//! Uses `cliclack` for spinners and step markers on a terminal and falls
//! back to plain tagged lines (`[OK]`, `[WARN]`) when output is piped or
//! running under CI, so scripted use stays greppable.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, remark, step_info, step_ok, step_ok_detail, step_warn,
    step_warn_hint,
};
pub use progress::TaskSpinner;
pub use theme::{init_theme, CachegateTheme};
