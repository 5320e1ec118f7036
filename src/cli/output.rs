//! Colored terminal output for packaging runs
//!
//! Every status line is a colored mark followed by the message; stage
//! progress, warnings and the success banner all go through `Mark`.

use std::io::{self, Write};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Width of the success banner rule.
const BANNER_WIDTH: usize = 60;

/// Kind of status line, which picks its symbol and colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Success,
    Warning,
    Failure,
    Progress,
    Detail,
}

impl Mark {
    fn symbol(self) -> &'static str {
        match self {
            Mark::Success => "✓",
            Mark::Warning => "⚠",
            Mark::Failure => "✗",
            Mark::Progress => "⋯",
            Mark::Detail => "→",
        }
    }

    fn symbol_color(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Mark::Success => spec.set_fg(Some(Color::Green)).set_bold(true),
            Mark::Warning => spec.set_fg(Some(Color::Yellow)).set_bold(true),
            Mark::Failure => spec.set_fg(Some(Color::Red)).set_bold(true),
            Mark::Progress => spec.set_fg(Some(Color::Magenta)),
            Mark::Detail => spec.set_fg(Some(Color::Blue)),
        };
        spec
    }

    /// Color of the message text; `None` keeps the terminal default.
    fn text_color(self) -> Option<ColorSpec> {
        let fg = match self {
            Mark::Warning => Color::Yellow,
            Mark::Failure => Color::Red,
            Mark::Detail => Color::White,
            Mark::Success | Mark::Progress => return None,
        };
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(fg));
        Some(spec)
    }

    fn render(self, out: &mut impl WriteColor, message: &str) -> io::Result<()> {
        out.set_color(&self.symbol_color())?;
        write!(out, "{}", self.symbol())?;
        out.reset()?;
        if let Some(spec) = self.text_color() {
            out.set_color(&spec)?;
        }
        writeln!(out, " {}", message)?;
        out.reset()
    }
}

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    verbose: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
        }
    }

    fn mark(&self, mark: Mark, message: &str) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        mark.render(&mut buffer, message)?;
        self.stdout.print(&buffer)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.mark(Mark::Success, message)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.mark(Mark::Warning, message)
    }

    /// Print a progress message for a stage that is starting
    pub fn progress(&self, message: &str) -> io::Result<()> {
        self.mark(Mark::Progress, message)
    }

    /// Print a detail line, only in verbose mode
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose {
            self.mark(Mark::Detail, message)
        } else {
            Ok(())
        }
    }

    /// Print an error message to stderr, falling back to plain stdout.
    pub fn error(&self, message: &str) {
        let stderr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = stderr.buffer();
        let printed = Mark::Failure
            .render(&mut buffer, message)
            .and_then(|()| stderr.print(&buffer));
        if printed.is_err() {
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        writeln!(buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(buffer, "═══ {} ═══", title)?;
        buffer.reset()?;
        self.stdout.print(&buffer)
    }

    /// Print a full-width rule that delimits the success banner
    pub fn rule(&self) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        buffer.set_color(&Mark::Success.symbol_color())?;
        writeln!(buffer, "{}", "═".repeat(BANNER_WIDTH))?;
        buffer.reset()?;
        self.stdout.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.println(&format!("    {}", message))
    }

    /// Print a plain message
    pub fn println(&self, message: &str) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        writeln!(buffer, "{}", message)?;
        self.stdout.print(&buffer)
    }
}
