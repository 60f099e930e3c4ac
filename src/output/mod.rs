mod render;
mod styling;
mod summary;
mod tables;

pub use render::{render_result, OutputFormat};
pub use styling::{bright_red, dim, magenta_bold};
pub use summary::print_execution_summary;

/// Prints the `PipeLens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔍 PipeLens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("AI-assisted pipeline health analysis")
    );
}
