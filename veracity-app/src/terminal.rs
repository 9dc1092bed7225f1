use crossterm::{
    cursor::MoveToColumn,
    execute, queue,
    style::{self as ct, Attribute, ContentStyle, Print, PrintStyledContent},
    terminal::{Clear, ClearType},
};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use veracity_runtime::VeracityHandle;

const BRAILLE_FRAMES: &[&str] = &[
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
];
const FALLBACK_WIDTH: usize = 80;

/// Columns available on stdout, or a sane default when it is not a terminal.
pub fn width() -> usize {
    if !io::stdout().is_terminal() {
        return FALLBACK_WIDTH;
    }
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(FALLBACK_WIDTH)
}

fn term_color(color: Color) -> ct::Color {
    match color {
        Color::Reset => ct::Color::Reset,
        Color::Black => ct::Color::Black,
        Color::Red => ct::Color::DarkRed,
        Color::Green => ct::Color::DarkGreen,
        Color::Yellow => ct::Color::DarkYellow,
        Color::Blue => ct::Color::DarkBlue,
        Color::Magenta => ct::Color::DarkMagenta,
        Color::Cyan => ct::Color::DarkCyan,
        Color::Gray => ct::Color::Grey,
        Color::DarkGray => ct::Color::DarkGrey,
        Color::LightRed => ct::Color::Red,
        Color::LightGreen => ct::Color::Green,
        Color::LightYellow => ct::Color::Yellow,
        Color::LightBlue => ct::Color::Blue,
        Color::LightMagenta => ct::Color::Magenta,
        Color::LightCyan => ct::Color::Cyan,
        Color::White => ct::Color::White,
        Color::Rgb(r, g, b) => ct::Color::Rgb { r, g, b },
        Color::Indexed(i) => ct::Color::AnsiValue(i),
    }
}

fn content_style(style: Style) -> ContentStyle {
    let mut out = ContentStyle::new();
    out.foreground_color = style.fg.map(term_color);
    out.background_color = style.bg.map(term_color);
    for (modifier, attribute) in [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
    ] {
        if style.add_modifier.contains(modifier) {
            out.attributes.set(attribute);
        }
    }
    out
}

/// Write styled lines; with `color` off only the text is emitted.
pub fn write_lines<W: Write>(out: &mut W, lines: &[Line<'_>], color: bool) -> io::Result<()> {
    for line in lines {
        for span in &line.spans {
            let text = span.content.as_ref();
            if color {
                let style = content_style(line.style.patch(span.style));
                queue!(out, PrintStyledContent(style.apply(text)))?;
            } else {
                queue!(out, Print(text))?;
            }
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()
}

/// Animate a progress line on stderr until `done` fires, then erase it.
///
/// Does nothing when stderr is not a terminal.
pub fn spawn_spinner(handle: &VeracityHandle, done: CancellationToken) -> Option<JoinHandle<()>> {
    if !io::stderr().is_terminal() {
        return None;
    }
    Some(handle.spawn(async move {
        let mut stderr = io::stderr();
        let mut ticker = tokio::time::interval(Duration::from_millis(80));
        let mut frame = 0usize;
        loop {
            tokio::select! {
                _ = done.cancelled() => break,
                _ = ticker.tick() => {
                    let glyph = BRAILLE_FRAMES[frame % BRAILLE_FRAMES.len()];
                    // best effort
                    let _ = queue!(
                        stderr,
                        MoveToColumn(0),
                        Print(glyph),
                        Print(" Analyzing message...")
                    );
                    let _ = stderr.flush();
                    frame = frame.wrapping_add(1);
                }
            }
        }
        let _ = execute!(stderr, MoveToColumn(0), Clear(ClearType::CurrentLine));
    }))
}
