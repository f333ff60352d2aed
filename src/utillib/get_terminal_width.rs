use terminal_size::{terminal_size, Width};

/// Width of the terminal on stderr/stdout, minus `margin`, or 120 if
/// not attached to a terminal. Used for clap's help wrapping.
pub fn get_terminal_width(margin: usize) -> usize {
    let width = if let Some((Width(w), _)) = terminal_size() {
        usize::from(w)
    } else {
        120
    };
    width.saturating_sub(margin).max(20)
}
