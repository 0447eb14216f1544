//! Target selection and the single-step runner
//!
//! One invocation mutates exactly one target. The scan walks the workflow
//! order and selects the first target that is neither locked nor complete;
//! everything before it is prior completed context. Review gates that
//! already passed are skipped for good; failed and never-run gates are
//! selected again.
//!
//! Within a section step the ordering guarantee is strict: integration is
//! attempted and fully applied (including marking consumed questions
//! Resolved) before the blankness re-check decides anything else, and a
//! context draft is only ever tried on a step that had no answered
//! questions to integrate.

use chrono::NaiveDate;
use indexmap::IndexMap;
use pdw_completion::{AnsweredQuestion, CompletionService, PriorContext, QuestionSuggestion};
use pdw_document::{
    document_meta, gate_results, parse_workflow_order, render_meta_marker, section_span,
    GateStatus, MarkerId, MetaKey, Target, WorkflowOrder,
};
use pdw_ledger::{
    insert_questions, parse_question_table, questions_for_section, resolve_question,
    section_ledger_table, IdScope, LedgerSchema, OpenQuestion, LEGACY_TABLE_ID,
};
use pdw_validate::{body_end_boundary, replace_body, sanitize_body};

use crate::context::{prior_context, section_body_text};
use crate::error::WorkflowError;
use crate::gate::persist_gate_result;
use crate::policy::{PolicyRegistry, ProcessMode, SectionPolicy};
use crate::scope::{apply_patches, resolve_scope, vet_patches};
use crate::state::{section_status, TargetState};

/// What a single step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A blank section was drafted from prior context
    Drafted { section: MarkerId },
    /// Answered questions were folded into the section
    Integrated {
        section: MarkerId,
        resolved: usize,
        /// Follow-up questions recorded when integration left the section
        /// blank with nothing pending
        followup_questions: usize,
    },
    /// Fresh clarifying questions were recorded
    QuestionsAdded { section: MarkerId, count: usize },
    /// A review gate ran and persisted its result
    GateRun {
        gate: MarkerId,
        passed: bool,
        applied_patches: usize,
    },
    /// The selected target cannot proceed without outside input
    Blocked { target: Target, reason: String },
    /// The collaborator produced nothing usable; the document is unchanged
    NoChange { target: Target },
    /// Every target is locked or complete
    AllComplete,
}

/// Drives one document through its workflow order
pub struct WorkflowRunner<'a, S: CompletionService> {
    service: &'a S,
    registry: &'a PolicyRegistry,
    /// Used when the document carries no `meta:document_type`
    default_document_type: String,
    today: NaiveDate,
}

impl<'a, S: CompletionService> WorkflowRunner<'a, S> {
    /// Create a runner over a collaborator and a policy registry
    #[must_use]
    pub fn new(
        service: &'a S,
        registry: &'a PolicyRegistry,
        default_document_type: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            service,
            registry,
            default_document_type: default_document_type.into(),
            today,
        }
    }

    /// Execute one step: select a target, mutate it, return the outcome
    /// and the new document
    ///
    /// # Errors
    /// Any [`WorkflowError`]; the input lines are untouched on failure.
    pub fn step(&self, lines: &[String]) -> Result<(StepOutcome, Vec<String>), WorkflowError> {
        let order = parse_workflow_order(lines)?;
        let document_type = self.document_type(lines);
        let results = gate_results(lines);

        for target in order.targets() {
            match target {
                Target::ReviewGate(gate_id) => {
                    let already_passed = results
                        .get(gate_id)
                        .is_some_and(|r| r.status == GateStatus::Passed);
                    if already_passed {
                        continue;
                    }
                    return self.run_gate(lines, &order, target, gate_id, &document_type);
                }
                Target::Section(section_id) => {
                    let state = section_status(lines, section_id)?.state();
                    match state {
                        TargetState::Missing => {
                            return Err(WorkflowError::MissingTarget(section_id.to_string()));
                        }
                        TargetState::Locked | TargetState::Complete => continue,
                        _ => {}
                    }

                    let policy = self.registry.policy_for(&document_type, section_id.as_str())?;
                    match policy.mode {
                        ProcessMode::Skip => continue,
                        ProcessMode::Manual => {
                            return Ok((
                                StepOutcome::Blocked {
                                    target: target.clone(),
                                    reason: "section is reserved for manual editing".to_string(),
                                },
                                lines.to_vec(),
                            ));
                        }
                        ProcessMode::Agent => {}
                    }

                    let (outcome, new_lines) =
                        self.run_section(lines, &order, target, section_id, policy, state)?;
                    let new_lines =
                        self.stamp_milestone(new_lines, &document_type, section_id)?;
                    return Ok((outcome, new_lines));
                }
            }
        }

        tracing::info!("workflow scan found every target locked or complete");
        Ok((StepOutcome::AllComplete, lines.to_vec()))
    }

    /// Loop single steps until one blocks, changes nothing, fails a gate,
    /// or the scan reports all-complete
    ///
    /// # Errors
    /// Any [`WorkflowError`] from the failing step.
    pub fn run(&self, lines: &[String]) -> Result<(Vec<String>, Vec<StepOutcome>), WorkflowError> {
        let mut current = lines.to_vec();
        let mut outcomes = Vec::new();

        loop {
            let (outcome, new_lines) = self.step(&current)?;
            current = new_lines;
            let stop = matches!(
                outcome,
                StepOutcome::AllComplete
                    | StepOutcome::Blocked { .. }
                    | StepOutcome::NoChange { .. }
                    | StepOutcome::GateRun { passed: false, .. }
            );
            outcomes.push(outcome);
            if stop {
                break;
            }
        }

        Ok((current, outcomes))
    }

    fn document_type(&self, lines: &[String]) -> String {
        document_meta(lines)
            .get(&MetaKey::DocumentType)
            .map_or_else(|| self.default_document_type.clone(), |entry| entry.value.clone())
    }

    fn run_section(
        &self,
        lines: &[String],
        order: &WorkflowOrder,
        target: &Target,
        section_id: &MarkerId,
        policy: &SectionPolicy,
        state: TargetState,
    ) -> Result<(StepOutcome, Vec<String>), WorkflowError> {
        let context = prior_context(lines, order, target);

        match state {
            TargetState::HasAnsweredQuestions => {
                self.integrate_answers(lines, target, section_id, policy, &context)
            }
            TargetState::BlankOpenQuestions => {
                let waiting = questions_for_section(lines, section_id)?
                    .iter()
                    .filter(|q| q.is_open_unanswered())
                    .count();
                tracing::warn!(section = %section_id, waiting, "step blocked on answers");
                Ok((
                    StepOutcome::Blocked {
                        target: target.clone(),
                        reason: format!("waiting for {waiting} answers"),
                    },
                    lines.to_vec(),
                ))
            }
            TargetState::BlankNoQuestions => {
                if context.is_empty() {
                    self.question_section(lines, target, section_id, None)
                } else {
                    self.draft_section(lines, target, section_id, policy, &context)
                }
            }
            // Selection never hands the other states to a section step.
            _ => Ok((StepOutcome::NoChange { target: target.clone() }, lines.to_vec())),
        }
    }

    fn integrate_answers(
        &self,
        lines: &[String],
        target: &Target,
        section_id: &MarkerId,
        policy: &SectionPolicy,
        context: &PriorContext,
    ) -> Result<(StepOutcome, Vec<String>), WorkflowError> {
        let span = section_span(lines, section_id)
            .ok_or_else(|| WorkflowError::MissingTarget(section_id.to_string()))?;
        let boundary = body_end_boundary(lines, &span);
        let body = section_body_text(lines, &span);

        let answered: Vec<OpenQuestion> = questions_for_section(lines, section_id)?
            .into_iter()
            .filter(OpenQuestion::is_answered)
            .collect();
        let payload: Vec<AnsweredQuestion> = answered
            .iter()
            .map(|q| AnsweredQuestion {
                id: q.id.clone(),
                question: q.question.clone(),
                answer: q.answer.clone(),
            })
            .collect();

        tracing::info!(section = %section_id, answers = payload.len(), "integrating answers");
        let text = self
            .service
            .integrate(section_id, &body, &payload, Some(context))?;
        let mut current =
            replace_body(lines, span.start, boundary, section_id.as_str(), &text, &policy.filters)?;

        let mut resolved = 0;
        for question in &answered {
            if let Some(table_id) = self.table_for_question(&current, section_id, &question.id)? {
                let outcome = resolve_question(&current, &table_id, &question.id)?;
                if outcome.changed {
                    resolved += 1;
                }
                current = outcome.lines;
            }
        }

        // Integration consumed the answers; a speculative draft is not
        // tried on the same step. If the section is still blank with
        // nothing pending, ask for follow-up questions instead.
        let status = section_status(&current, section_id)?;
        let mut followup_questions = 0;
        if status.is_blank && !status.has_open_questions {
            let span = section_span(&current, section_id)
                .ok_or_else(|| WorkflowError::MissingTarget(section_id.to_string()))?;
            let body = section_body_text(&current, &span);
            let suggestions =
                self.service
                    .generate_questions(section_id, &body, Some(context))?;
            if !suggestions.is_empty() {
                let (count, new_lines) = self.record_questions(&current, section_id, suggestions)?;
                followup_questions = count;
                current = new_lines;
            }
        }

        Ok((
            StepOutcome::Integrated {
                section: section_id.clone(),
                resolved,
                followup_questions,
            },
            current,
        ))
    }

    fn draft_section(
        &self,
        lines: &[String],
        target: &Target,
        section_id: &MarkerId,
        policy: &SectionPolicy,
        context: &PriorContext,
    ) -> Result<(StepOutcome, Vec<String>), WorkflowError> {
        let span = section_span(lines, section_id)
            .ok_or_else(|| WorkflowError::MissingTarget(section_id.to_string()))?;
        let boundary = body_end_boundary(lines, &span);
        let body = section_body_text(lines, &span);

        tracing::info!(section = %section_id, context_sections = context.len(), "drafting from context");
        let text = self.service.draft(section_id, &body, context)?;
        if sanitize_body(&text, &policy.filters).is_empty() {
            // The section is still blank after the draft attempt; fall
            // through to question generation.
            tracing::warn!(section = %section_id, "draft sanitized to nothing");
            return self.question_section(lines, target, section_id, Some(context));
        }

        let current =
            replace_body(lines, span.start, boundary, section_id.as_str(), &text, &policy.filters)?;
        Ok((StepOutcome::Drafted { section: section_id.clone() }, current))
    }

    fn question_section(
        &self,
        lines: &[String],
        target: &Target,
        section_id: &MarkerId,
        context: Option<&PriorContext>,
    ) -> Result<(StepOutcome, Vec<String>), WorkflowError> {
        let span = section_span(lines, section_id)
            .ok_or_else(|| WorkflowError::MissingTarget(section_id.to_string()))?;
        let body = section_body_text(lines, &span);

        let suggestions = self.service.generate_questions(section_id, &body, context)?;
        if suggestions.is_empty() {
            return Ok((StepOutcome::NoChange { target: target.clone() }, lines.to_vec()));
        }

        let (count, current) = self.record_questions(lines, section_id, suggestions)?;
        Ok((
            StepOutcome::QuestionsAdded {
                section: section_id.clone(),
                count,
            },
            current,
        ))
    }

    /// Record suggestions in the section's own ledger when it has one,
    /// falling back to the legacy whole-document table
    fn record_questions(
        &self,
        lines: &[String],
        section_id: &MarkerId,
        suggestions: Vec<QuestionSuggestion>,
    ) -> Result<(usize, Vec<String>), WorkflowError> {
        let span = section_span(lines, section_id)
            .ok_or_else(|| WorkflowError::MissingTarget(section_id.to_string()))?;

        let table_id = match section_ledger_table(lines, &span) {
            Some((table_id, _)) => table_id,
            None => MarkerId::new(LEGACY_TABLE_ID).expect("static id"),
        };
        let table = parse_question_table(lines, &table_id)?;
        let scope = match table.schema {
            LedgerSchema::PerSection => IdScope::Section(section_id.clone()),
            LedgerSchema::Legacy => IdScope::Legacy,
        };

        let entries: Vec<(String, Option<MarkerId>)> = suggestions
            .into_iter()
            .map(|s| {
                let question_target =
                    s.target.parse::<MarkerId>().unwrap_or_else(|_| section_id.clone());
                (s.question, Some(question_target))
            })
            .collect();

        let outcome = insert_questions(lines, &table_id, &scope, &entries, self.today)?;
        tracing::info!(
            section = %section_id,
            recorded = outcome.newly_inserted,
            "clarifying questions recorded"
        );
        Ok((outcome.newly_inserted, outcome.lines))
    }

    /// Find the table that holds `question_id`: the section's own ledger
    /// first, then the legacy table
    fn table_for_question(
        &self,
        lines: &[String],
        section_id: &MarkerId,
        question_id: &str,
    ) -> Result<Option<MarkerId>, WorkflowError> {
        if let Some(span) = section_span(lines, section_id) {
            if let Some((table_id, _)) = section_ledger_table(lines, &span) {
                let table = parse_question_table(lines, &table_id)?;
                if table.question(question_id).is_some() {
                    return Ok(Some(table_id));
                }
            }
        }

        let legacy = MarkerId::new(LEGACY_TABLE_ID).expect("static id");
        match parse_question_table(lines, &legacy) {
            Ok(table) if table.question(question_id).is_some() => Ok(Some(legacy)),
            Ok(_) => {
                tracing::warn!(id = question_id, "consumed question has no ledger row");
                Ok(None)
            }
            Err(pdw_document::ParseFailure::MissingQuestionTable { .. }) => {
                tracing::warn!(id = question_id, "consumed question has no ledger row");
                Ok(None)
            }
            Err(other) => Err(other.into()),
        }
    }

    fn run_gate(
        &self,
        lines: &[String],
        order: &WorkflowOrder,
        target: &Target,
        gate_id: &MarkerId,
        document_type: &str,
    ) -> Result<(StepOutcome, Vec<String>), WorkflowError> {
        let policy = self.registry.policy_for(document_type, gate_id.as_str())?;
        let scope_ids = resolve_scope(lines, order, target, &policy.scope);

        let mut contents: IndexMap<MarkerId, String> = IndexMap::new();
        for id in &scope_ids {
            if let Some(span) = section_span(lines, id) {
                contents.insert(id.clone(), section_body_text(lines, &span));
            }
        }

        tracing::info!(gate = %gate_id, sections = contents.len(), "running review gate");
        let outcome = self.service.review(gate_id, &contents, &policy.review_rules)?;

        let verdicts = vet_patches(lines, &outcome.patches);
        let (current, applied_patches) =
            apply_patches(lines, &verdicts, policy.auto_apply_patches)?;

        let status = if outcome.passed {
            GateStatus::Passed
        } else {
            GateStatus::Failed
        };
        let current = persist_gate_result(
            &current,
            gate_id,
            status,
            outcome.issue_count(),
            outcome.warning_count(),
        );

        Ok((
            StepOutcome::GateRun {
                gate: gate_id.clone(),
                passed: outcome.passed,
                applied_patches,
            },
            current,
        ))
    }

    /// Stamp `meta:version` when a milestone section just completed
    fn stamp_milestone(
        &self,
        lines: Vec<String>,
        document_type: &str,
        section_id: &MarkerId,
    ) -> Result<Vec<String>, WorkflowError> {
        let Some(version) = self.registry.milestone_version(document_type, section_id.as_str())
        else {
            return Ok(lines);
        };
        if section_status(&lines, section_id)?.state() != TargetState::Complete {
            return Ok(lines);
        }

        let rendered = render_meta_marker(MetaKey::Version, version);
        let mut lines = lines;
        match document_meta(&lines).get(&MetaKey::Version) {
            Some(entry) => lines[entry.line] = rendered,
            None => lines.insert(0, rendered),
        }
        tracing::info!(section = %section_id, version, "milestone version stamped");
        Ok(lines)
    }
}
