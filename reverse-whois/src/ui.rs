//! Console presentation for the reverse-whois CLI.
//!
//! Banner, colored result lines and the verbose run summary. Uses only the
//! `console` crate. Result lines go to stdout; the summary goes to stderr so
//! piped output stays clean.

use console::{style, Color, Style, Term};
use reverse_whois_lib::{DisplayLine, LineKind, LineRenderer, RunStatus, RunSummary};
use std::time::Duration;

// ── Banner ───────────────────────────────────────────────────────────────────

const BANNER: &str = r"
   ___                              _      ____        _
  / _ \___ _  _____ _______ ___ ___| | /| / / /  ___  (_)__
 / , _/ -_) |/ / -_) __(_-</ -_)___/ |/ |/ / _ \/ _ \/ (_-<
/_/|_|\__/|___/\__/_/ /___/\__/    |__/|__/_//_/\___/_/___/
";

/// Banner text with project link and codename/release line.
pub fn banner_text() -> String {
    format!(
        "{}\n haltman.io (https://github.com/haltman-io)\n\n [codename: {}] - [release: v{}]\n",
        BANNER,
        reverse_whois_lib::CODENAME,
        reverse_whois_lib::VERSION,
    )
}

pub fn print_banner() {
    println!("{}", banner_text());
}

// ── Result lines ─────────────────────────────────────────────────────────────

/// Renders `[term] [mode] [scope] [key: value]` with ANSI colors.
///
/// Term is cyan, mode magenta, scope blue, the key/value field yellow (red for
/// failures). Brackets stay uncolored.
#[derive(Debug, Clone, Copy)]
pub struct ColorRenderer {
    colors: bool,
}

impl ColorRenderer {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }

    fn segment(&self, color: Color, content: &str) -> String {
        let styled = Style::new().fg(color).force_styling(self.colors);
        format!("[{}]", styled.apply_to(content))
    }
}

impl LineRenderer for ColorRenderer {
    fn render(&self, line: &DisplayLine) -> String {
        let field_color = match line.kind {
            LineKind::Value => Color::Yellow,
            LineKind::Failure => Color::Red,
        };

        [
            self.segment(Color::Cyan, &line.term),
            self.segment(Color::Magenta, line.mode.as_str()),
            self.segment(Color::Blue, line.scope.as_str()),
            self.segment(field_color, &format!("{}: {}", line.key, line.value)),
        ]
        .join(" ")
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar to stderr.
pub fn print_summary(summary: &RunSummary, duration: Duration) {
    let term = Term::stderr();
    let _ = term.write_line(&format_summary(summary, duration));
}

fn format_summary(summary: &RunSummary, duration: Duration) -> String {
    let status = match summary.status {
        RunStatus::Clean => style("clean").green(),
        RunStatus::HadFailures => style("had failures").red(),
    };

    format!(
        "{} lookup{} in {:.1}s {} {} {} {} {} {} record{} written {} {}",
        style(summary.results_received).bold(),
        if summary.results_received == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} ok", summary.succeeded)).green(),
        style("|").dim(),
        style(format!("{} failed", summary.failed)).red(),
        style("|").dim(),
        summary.records_written,
        if summary.records_written == 1 { "" } else { "s" },
        style("|").dim(),
        status,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverse_whois_lib::{QueryMode, QueryParams, ReverseWhoisError, SearchScope};

    fn params() -> QueryParams {
        QueryParams {
            scope: SearchScope::Historic,
            mode: QueryMode::Preview,
            exclude: vec![],
        }
    }

    #[test]
    fn test_plain_rendering_without_colors() {
        let line = DisplayLine::value("acme", &params(), "domainsCount", "12");
        assert_eq!(
            ColorRenderer::new(false).render(&line),
            "[acme] [preview] [historic] [domainsCount: 12]"
        );
    }

    #[test]
    fn test_colored_segments_keep_brackets_plain() {
        let line = DisplayLine::value("acme", &params(), "domainsCount", "12");
        let rendered = ColorRenderer::new(true).render(&line);

        assert!(rendered.starts_with("[\u{1b}[36macme\u{1b}[0m]"));
        assert!(rendered.contains("[\u{1b}[35mpreview\u{1b}[0m]"));
        assert!(rendered.contains("[\u{1b}[34mhistoric\u{1b}[0m]"));
        assert!(rendered.ends_with("[\u{1b}[33mdomainsCount: 12\u{1b}[0m]"));
    }

    #[test]
    fn test_failure_field_is_red() {
        let err = ReverseWhoisError::http(429);
        let line = DisplayLine::failure("acme", &params(), &err);
        let rendered = ColorRenderer::new(true).render(&line);
        assert!(rendered.contains("\u{1b}[31mhttp_error: "));
    }

    #[test]
    fn test_banner_mentions_release() {
        let text = banner_text();
        assert!(text.contains("haltman.io"));
        assert!(text.contains(&format!("[release: v{}]", reverse_whois_lib::VERSION)));
    }

    #[test]
    fn test_summary_pluralization() {
        console::set_colors_enabled(false);
        let summary = RunSummary {
            jobs_submitted: 1,
            results_received: 1,
            succeeded: 1,
            failed: 0,
            records_written: 3,
            status: RunStatus::Clean,
        };
        let text = format_summary(&summary, Duration::from_millis(1500));
        assert!(text.starts_with("1 lookup in 1.5s"));
        assert!(text.contains("3 records written"));
        assert!(text.ends_with("clean"));
    }
}
