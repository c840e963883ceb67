// ABOUTME: Runtime configuration and version/welcome constants

pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "Pyrl v1.0";
pub const WELCOME_SUBTITLE: &str = "A hybrid indentation/sigil scripting language";

/// Runtime limits handed to the evaluator at VM construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Call-depth ceiling standing in for the tail-call optimization this
    /// runtime does not perform.
    pub max_recursion_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config { max_recursion_depth: 4096 }
    }
}
