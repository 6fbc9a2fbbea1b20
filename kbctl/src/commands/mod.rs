pub mod check;
pub mod samples;
pub mod smoke;

use owo_colors::OwoColorize;

fn should_use_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

pub(crate) fn ok_mark() -> String {
    if should_use_color() {
        "✓".green().to_string()
    } else {
        "✓".to_string()
    }
}

pub(crate) fn fail_mark() -> String {
    if should_use_color() {
        "✗".red().to_string()
    } else {
        "✗".to_string()
    }
}
