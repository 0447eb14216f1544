//! Prior-section context gathering
//!
//! A pure function from (document, workflow order, target) to an ordered
//! context map; no hidden accumulator, no caching. The map holds the body
//! text of every non-blank section scheduled before the target.

use pdw_completion::PriorContext;
use pdw_document::{section_span, SectionSpan, Target, WorkflowOrder};
use pdw_validate::body_end_boundary;

/// Body text of a section: everything between the opening marker and the
/// ledger boundary, trimmed
#[must_use]
pub fn section_body_text(lines: &[String], span: &SectionSpan) -> String {
    let boundary = body_end_boundary(lines, span);
    lines[span.start + 1..boundary].join("\n").trim().to_string()
}

/// Gather prior-section context for `target`
///
/// Walks the order up to (excluding) the target, skipping gates, sections
/// missing from the document, and sections that are still blank.
#[must_use]
pub fn prior_context(lines: &[String], order: &WorkflowOrder, target: &Target) -> PriorContext {
    let mut context = PriorContext::new();
    let stop = order.position(target).unwrap_or(order.targets().len());

    for prior in &order.targets()[..stop] {
        let Target::Section(id) = prior else {
            continue;
        };
        let Some(span) = section_span(lines, id) else {
            continue;
        };
        let boundary = body_end_boundary(lines, &span);
        let blank = lines[span.start..boundary]
            .iter()
            .any(|line| pdw_document::contains_placeholder(line));
        if blank {
            continue;
        }
        let body = section_body_text(lines, &span);
        if !body.is_empty() {
            context.insert(id.clone(), body);
        }
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdw_document::parse_workflow_order;
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn context_holds_prior_nonblank_sections_in_order() {
        let lines = doc(&[
            "<!-- workflow:order",
            "goals",
            "scope",
            "review_gate:design_review",
            "risks",
            "-->",
            "<!-- section:goals -->",
            "Goal body.",
            "<!-- section:scope -->",
            "<!-- PLACEHOLDER -->",
            "<!-- section:risks -->",
            "Risk body.",
        ]);
        let order = parse_workflow_order(&lines).unwrap();
        let target: Target = "risks".parse().unwrap();

        let context = prior_context(&lines, &order, &target);
        let keys: Vec<String> = context.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["goals"]);
        assert_eq!(context.values().next().unwrap(), "Goal body.");
    }

    #[test]
    fn first_target_has_empty_context() {
        let lines = doc(&[
            "<!-- workflow:order",
            "goals",
            "-->",
            "<!-- section:goals -->",
            "Body.",
        ]);
        let order = parse_workflow_order(&lines).unwrap();
        let target: Target = "goals".parse().unwrap();
        assert!(prior_context(&lines, &order, &target).is_empty());
    }
}
