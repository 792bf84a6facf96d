use crate::error::{FieldError, WorkflowError};
use crate::models::{MAX_PAGE, PaginationQuery};
use crate::models::contracts::{ContractFields, DecisionInput};
use crate::models::offers::{CreateOffer, Deliverable};
use crate::models::requests::CreateRequest;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_TEXT_WORDS: usize = 150;
pub const TARGET_PERSONS: std::ops::RangeInclusive<i32> = 1..=20;

/// Collects field errors so that every problem is reported at once.
#[derive(Debug, Default)]
struct Report(Vec<FieldError>);

impl Report {
    fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.0.push(FieldError::new(field, message));
        }
    }

    fn finish(self) -> Result<(), WorkflowError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::Validation(self.0))
        }
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn check_deliverables(report: &mut Report, deliverables: &[Deliverable]) {
    report.check(
        deliverables.iter().all(|d| !d.title.trim().is_empty()),
        "deliverables",
        "every deliverable needs a title",
    );
}

pub fn validate_contract(fields: &ContractFields) -> Result<(), WorkflowError> {
    let mut report = Report::default();

    let title_chars = fields.title.trim().chars().count();
    report.check(title_chars > 0, "title", "is required");
    report.check(
        title_chars <= MAX_TITLE_CHARS,
        "title",
        "must be at most 200 characters",
    );

    let description_words = word_count(&fields.description);
    report.check(description_words > 0, "description", "is required");
    report.check(
        description_words <= MAX_TEXT_WORDS,
        "description",
        "must be at most 150 words",
    );
    if let Some(conditions) = &fields.target_conditions {
        report.check(
            word_count(conditions) <= MAX_TEXT_WORDS,
            "target_conditions",
            "must be at most 150 words",
        );
    }

    report.check(
        TARGET_PERSONS.contains(&fields.target_persons),
        "target_persons",
        "must be between 1 and 20",
    );

    let finite = fields.budget_min.is_finite() && fields.budget_max.is_finite();
    report.check(finite, "budget", "must be a number");
    report.check(
        !finite || fields.budget_min >= 0.0,
        "budget_min",
        "must not be negative",
    );
    report.check(
        !finite || fields.budget_max >= fields.budget_min,
        "budget",
        "maximum must be greater than or equal to minimum",
    );
    report.check(
        is_currency_code(&fields.currency),
        "currency",
        "must be a three-letter ISO 4217 code",
    );

    report.check(
        fields.end_date > fields.start_date,
        "end_date",
        "must be after the start date",
    );

    report.finish()
}

pub fn validate_offer(input: &CreateOffer) -> Result<(), WorkflowError> {
    let mut report = Report::default();
    report.check(
        input.amount.is_finite() && input.amount > 0.0,
        "amount",
        "must be greater than zero",
    );
    if let Some(currency) = &input.currency {
        report.check(
            is_currency_code(currency),
            "currency",
            "must be a three-letter ISO 4217 code",
        );
    }
    report.check(
        input.end_date > input.start_date,
        "end_date",
        "must be after the start date",
    );
    report.check(
        !input.description.trim().is_empty(),
        "description",
        "is required",
    );
    check_deliverables(&mut report, &input.deliverables);
    report.finish()
}

pub fn validate_request(input: &CreateRequest) -> Result<(), WorkflowError> {
    let mut report = Report::default();
    report.check(
        !input.service_name.trim().is_empty(),
        "service_name",
        "is required",
    );
    report.check(
        input.budget.is_finite() && input.budget > 0.0,
        "budget",
        "must be greater than zero",
    );
    report.check(
        TARGET_PERSONS.contains(&input.persons),
        "persons",
        "must be between 1 and 20",
    );
    report.check(
        input.end_date > input.start_date,
        "end_date",
        "must be after the start date",
    );
    report.check(
        !input.description.trim().is_empty(),
        "description",
        "is required",
    );
    check_deliverables(&mut report, &input.deliverables);
    report.finish()
}

/// Pages past `MAX_PAGE` are refused rather than silently clamped.
pub fn validate_pagination(query: &PaginationQuery) -> Result<(), WorkflowError> {
    let mut report = Report::default();
    report.check(
        query.page.is_none_or(|page| page <= MAX_PAGE),
        "page",
        &format!("must be at most {MAX_PAGE}"),
    );
    report.finish()
}

/// Rejections must say why.
pub fn require_reason(input: &DecisionInput) -> Result<String, WorkflowError> {
    match input.reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => Ok(reason.to_string()),
        _ => Err(WorkflowError::Validation(vec![FieldError::new(
            "reason",
            "is required when rejecting",
        )])),
    }
}
