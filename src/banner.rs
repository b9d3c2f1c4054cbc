//! Startup banner and session summary display.

use crate::consts::{AUTHOR, HOMEPAGE, REPO};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub engine: &'a str,
    pub policy: &'a str,
    pub theme: &'a str,
    pub preferences: &'a str,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║             J Q P L A Y               ║
   ║      filters in, answers out          ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   engine    {}
   retry     {}
   theme     {}
   prefs     {}

   type a filter to run it, /help for commands
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.engine,
        info.policy,
        info.theme,
        info.preferences,
    );
}

/// Print the session summary.
pub fn print_session_summary(runs: u64) {
    if runs > 0 {
        println!("session: {runs} run(s)");
    }
    println!("goodbye.");
}
