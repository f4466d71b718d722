//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success markers (green)
    pub success: Style,
    /// Warning markers (yellow)
    pub warning: Style,
    /// Error markers (red)
    pub error: Style,
    /// Step markers (cyan)
    pub step: Style,
    /// Secondary text
    pub dim: Style,
    /// Headlines such as "Creating cluster ..."
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.step = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold();
    }
}
