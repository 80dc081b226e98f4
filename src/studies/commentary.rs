//! Written findings that accompany a study's charts.

/// One heading with its bullet lines.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentarySection {
    pub heading: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commentary {
    pub title: String,
    pub sections: Vec<CommentarySection>,
}

impl Commentary {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    /// Append a section. Sections without lines are dropped.
    pub fn section(&mut self, heading: impl Into<String>, lines: Vec<String>) -> &mut Self {
        if !lines.is_empty() {
            self.sections.push(CommentarySection {
                heading: heading.into(),
                lines,
            });
        }
        self
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.title);
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n", section.heading));
            for line in &section.lines {
                out.push_str(&format!("- {}\n", line));
            }
        }
        out
    }

    /// Flat text lines for a slide body.
    pub fn to_lines(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| {
                std::iter::once(s.heading.clone()).chain(s.lines.iter().map(|l| format!("  {}", l)))
            })
            .collect()
    }
}

/// Signed percentage with one decimal, e.g. `+12.3%`.
pub fn signed_percent(value: f64) -> String {
    format!("{:+.1}%", value)
}
