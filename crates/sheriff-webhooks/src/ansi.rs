//! ANSI terminal output rendered as an SVG snapshot.
//!
//! The dry-run check embeds its captured output as an image, which keeps
//! the colorized diff readable inside a check-run body. Only SGR color and
//! bold codes are interpreted; every other escape sequence is stripped.

const FONT_SIZE: u32 = 14;
const LINE_HEIGHT: u32 = 19;
const CHAR_WIDTH: f32 = 8.4;
const PADDING: u32 = 16;
const BACKGROUND: &str = "#1e1e1e";
const DEFAULT_FG: &str = "#d4d4d4";

/// One styled run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    color: &'static str,
    bold: bool,
}

/// Render captured terminal output as a dark-theme SVG document.
#[must_use]
pub fn render_svg(output: &str) -> String {
    let lines: Vec<Vec<Span>> = output.lines().map(parse_line).collect();
    let columns = lines
        .iter()
        .map(|spans| spans.iter().map(|s| s.text.chars().count()).sum::<usize>())
        .max()
        .unwrap_or(0)
        .max(40);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let width = (columns as f32 * CHAR_WIDTH) as u32 + PADDING * 2;
    let height = (lines.len().max(1) as u32) * LINE_HEIGHT + PADDING * 2;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="SFMono-Regular, Consolas, Menlo, monospace" font-size="{FONT_SIZE}">"#
    ));
    svg.push_str(&format!(
        r#"<rect width="100%" height="100%" fill="{BACKGROUND}" rx="6"/>"#
    ));

    for (row, spans) in lines.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let y = PADDING + (row as u32 + 1) * LINE_HEIGHT - 5;
        svg.push_str(&format!(
            r#"<text x="{PADDING}" y="{y}" xml:space="preserve">"#
        ));
        for span in spans {
            let weight = if span.bold { r#" font-weight="bold""# } else { "" };
            svg.push_str(&format!(
                r#"<tspan fill="{}"{weight}>{}</tspan>"#,
                span.color,
                escape_xml(&span.text)
            ));
        }
        svg.push_str("</text>");
    }

    svg.push_str("</svg>");
    svg
}

/// Split a line on SGR escape sequences into styled spans.
fn parse_line(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut color = DEFAULT_FG;
    let mut bold = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            current.push(c);
            continue;
        }
        // Escape sequence. Only CSI ... m carries style; drop the rest.
        if chars.peek() != Some(&'[') {
            continue;
        }
        chars.next();
        let mut params = String::new();
        let mut terminator = None;
        for c in chars.by_ref() {
            if c.is_ascii_alphabetic() {
                terminator = Some(c);
                break;
            }
            params.push(c);
        }
        if terminator != Some('m') {
            continue;
        }

        if !current.is_empty() {
            spans.push(Span {
                text: std::mem::take(&mut current),
                color,
                bold,
            });
        }
        for code in params.split(';') {
            match code.parse::<u8>().unwrap_or(0) {
                0 => {
                    color = DEFAULT_FG;
                    bold = false;
                }
                1 => bold = true,
                39 => color = DEFAULT_FG,
                n => {
                    if let Some(mapped) = sgr_color(n) {
                        color = mapped;
                    }
                }
            }
        }
    }

    if !current.is_empty() {
        spans.push(Span {
            text: current,
            color,
            bold,
        });
    }
    spans
}

fn sgr_color(code: u8) -> Option<&'static str> {
    Some(match code {
        30 => "#3f3f3f",
        31 | 91 => "#f14c4c",
        32 | 92 => "#23d18b",
        33 | 93 => "#f5f543",
        34 | 94 => "#3b8eea",
        35 | 95 => "#d670d6",
        36 | 96 => "#29b8db",
        37 | 97 => "#e5e5e5",
        90 => "#666666",
        _ => return None,
    })
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
