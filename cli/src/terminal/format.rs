use crate::terminal::colors;
use colored::*;
use vhunt_core::ProbeError;
use vhunt_core::processor::Finding;
use vhunt_common::target::Target;

pub fn finding_title(finding: &Finding) -> String {
    let target = &finding.target;
    let term = match &finding.matched_term {
        Some(term) => format!(" (matched term: '{}')", term),
        None => String::new(),
    };
    format!(
        "Match found: {}{} with host {} (Status: {}){}",
        target.address, target.path, target.hostname, finding.status, term
    )
}

pub fn finding_lines(finding: &Finding) -> [String; 2] {
    let title = finding_title(finding).color(colors::MATCH).bold();
    let preview = format!(
        "{} {}",
        "Body preview:".color(colors::ACCENT),
        finding.preview.color(colors::MUTED)
    );
    [title.to_string(), preview]
}

pub fn failure_line(target: &Target, error: &ProbeError) -> String {
    format!("Request to {} failed: {}", target, error)
}

pub fn miss_line(target: &Target, status: u16, status_match: bool, body_match: bool) -> String {
    format!(
        "No match for {} (Status: {}, status match: {}, body match: {})",
        target, status, status_match, body_match
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(term: Option<&str>) -> Finding {
        Finding {
            target: Target::new("10.0.0.1", "good.example", "/admin"),
            status: 200,
            matched_term: term.map(str::to_string),
            preview: "Welcome".to_string(),
        }
    }

    #[test]
    fn title_names_term_when_one_matched() {
        let title = finding_title(&finding(Some("Welcome")));
        assert_eq!(
            title,
            "Match found: 10.0.0.1/admin with host good.example (Status: 200) (matched term: 'Welcome')"
        );
    }

    #[test]
    fn title_omits_term_without_body_filter() {
        let title = finding_title(&finding(None));
        assert!(title.ends_with("(Status: 200)"));
    }

    #[test]
    fn miss_line_reports_both_criteria() {
        let target = Target::new("10.0.0.1", "bad.example", "/");
        let line = miss_line(&target, 404, false, true);
        assert!(line.contains("Status: 404"));
        assert!(line.contains("status match: false"));
        assert!(line.contains("body match: true"));
    }
}
