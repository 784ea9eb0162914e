//! Titled box of labeled fields.

use super::{Style, visible_width};

#[derive(Debug, Clone)]
enum Line {
    Field { label: String, value: String },
    Text(String),
    Blank,
}

/// A titled box of `label: value` lines.
///
/// ```text
/// ╭─ Current Weather for London, GB ─────╮
/// │ Temperature: 12.5°C                  │
/// │ Humidity:    81%                     │
/// ╰──────────────────────────────────────╯
/// ```
#[derive(Debug, Clone)]
pub struct Panel {
    title: String,
    lines: Vec<Line>,
    footer: Option<String>,
}

impl Panel {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), lines: Vec::new(), footer: None }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.lines.push(Line::Field { label: label.into(), value: value.into() });
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::Text(text.into()));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(Line::Blank);
        self
    }

    /// Dimmed line printed under the box, e.g. "(from cache)".
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn render(&self, style: &Style) -> String {
        let label_width = self
            .lines
            .iter()
            .filter_map(|l| match l {
                Line::Field { label, .. } => Some(label.chars().count() + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        let rows: Vec<String> = self
            .lines
            .iter()
            .map(|line| match line {
                Line::Field { label, value } => {
                    let pad = label_width - (label.chars().count() + 1);
                    format!("{}{} {}", style.label(&format!("{label}:")), " ".repeat(pad), value)
                }
                Line::Text(text) => text.clone(),
                Line::Blank => String::new(),
            })
            .collect();

        let title_width = self.title.chars().count() + 3;
        let inner = rows.iter().map(|r| visible_width(r)).max().unwrap_or(0).max(title_width);

        let mut out = String::new();
        out.push_str(&format!(
            "╭─ {} {}╮\n",
            style.heading(&self.title),
            "─".repeat(inner + 2 - title_width)
        ));
        for row in &rows {
            let pad = inner - visible_width(row);
            out.push_str(&format!("│ {}{} │\n", row, " ".repeat(pad)));
        }
        out.push_str(&format!("╰{}╯\n", "─".repeat(inner + 2)));
        if let Some(footer) = &self.footer {
            out.push_str(&style.dim(footer));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_aligned() {
        let text = Panel::new("Demo").field("A", "1").field("Longer", "2").render(&Style::plain());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "│ A:      1 │");
        assert_eq!(lines[2], "│ Longer: 2 │");
    }

    #[test]
    fn test_box_lines_have_equal_width() {
        let text = Panel::new("Current Weather for London, GB")
            .field("Temperature", "12.5°C")
            .text("")
            .blank()
            .field("Updated", "2024-01-01 10:00 UTC")
            .render(&Style::plain());
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "uneven box: {text}");
    }

    #[test]
    fn test_colored_box_keeps_width() {
        let style = Style { color: true };
        let text = Panel::new("T").field("Key", "value").render(&style);
        let widths: Vec<usize> = text.lines().map(visible_width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_footer_after_box() {
        let text = Panel::new("T").field("K", "v").footer("(from cache)").render(&Style::plain());
        assert!(text.trim_end().ends_with("(from cache)"));
    }
}
