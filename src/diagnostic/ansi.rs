use super::Diagnostic;

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        out.push_str(&format!("{}: {}\n", self.bold_red("error"), self.bold(&d.message)));

        if let Some(loc) = &d.location {
            out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), loc.file, loc.line));

            if let Some(text) = &d.source_line {
                let gutter = loc.line.to_string().len();
                let pipe = self.cyan("|");
                let pad = " ".repeat(gutter);
                let line_num = self.cyan(&format!("{:>gutter$}", loc.line));
                out.push_str(&format!("{pad} {pipe}\n"));
                out.push_str(&format!("{line_num} {pipe} {text}\n"));
                out.push_str(&format!("{pad} {pipe}\n"));
            }
        }

        for note in &d.notes {
            out.push_str(&format!("  {} {}\n", self.dim("="), note));
        }

        if let Some(code) = &d.error_code {
            out.push_str(&format!("  {} errorCode: {}\n", self.dim("="), code));
        }

        out
    }
}
