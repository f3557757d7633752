use chrono::Utc;
use typed_builder::TypedBuilder;

use crate::{
    execution::{resolve_limits, validate_source, validate_test_cases, Dispatcher, ExecutionRequest},
    registry::Language,
    CoderunnerResult,
};

use super::{
    evaluate_constraints, evaluate_test_cases, final_score, EvaluationReport, StructuralConstraint,
    Tally, TestCase, DEFAULT_TASK_MARKS,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A submission to grade.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct EvaluationRequest {
    /// The submission's language.
    pub language: Language,

    /// The program source.
    #[builder(setter(into))]
    pub code: String,

    /// Input/expected-output pairs, run in order.
    #[builder(default)]
    pub test_cases: Vec<TestCase>,

    /// Rules about the shape of the source.
    #[builder(default)]
    pub structural_constraints: Vec<StructuralConstraint>,

    /// What the final score is out of.
    #[builder(default = DEFAULT_TASK_MARKS)]
    pub task_marks: f64,
}

/// Grades submissions: structural analysis first, then test cases through the dispatcher.
#[derive(Clone)]
pub struct Evaluator {
    dispatcher: Dispatcher,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Evaluator {
    /// Creates an evaluator running programs through `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher programs are run through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Grades a submission.
    ///
    /// The whole submission is validated before anything runs. Each test case then occupies one
    /// execution slot in turn; a test case that cannot be dispatched fails on its own. Without
    /// test cases the program runs once with empty stdin, and failing to dispatch that run is an
    /// error.
    pub async fn evaluate(&self, request: EvaluationRequest) -> CoderunnerResult<EvaluationReport> {
        let config = self.dispatcher.config();
        validate_source(&request.code, config)?;
        validate_test_cases(&request.test_cases, config)?;
        let limits = resolve_limits(None, config)?;

        let structural = evaluate_constraints(
            &request.code,
            request.language,
            &request.structural_constraints,
        );
        let structural_tally = Tally::from_outcomes(structural.iter().map(|r| r.passed));

        let mut success = true;
        let mut error = None;
        let output;
        let test_cases;

        if request.test_cases.is_empty() {
            let execution = self
                .dispatcher
                .dispatch(execution_request(&request, String::new()), limits)
                .await?;
            output = execution.visible_output().to_string();
            if !execution.is_success() {
                success = false;
                error = Some(
                    execution
                        .error
                        .unwrap_or_else(|| "Runtime error".to_string()),
                );
            }
            test_cases = Vec::new();
        } else {
            let dispatcher = &self.dispatcher;
            let submission = &request;
            test_cases = evaluate_test_cases(&request.test_cases, move |stdin| {
                dispatcher.dispatch(execution_request(submission, stdin), limits)
            })
            .await;
            output = test_cases
                .first()
                .map(|tc| tc.actual_output.clone())
                .unwrap_or_default();
        }

        let test_case_tally = Tally::from_outcomes(test_cases.iter().map(|r| r.passed));
        let score = final_score(&test_case_tally, &structural_tally, request.task_marks);

        tracing::info!(
            "evaluated {} submission: {} / {} ({}/{} tests, {}/{} constraints)",
            request.language,
            score,
            request.task_marks,
            test_case_tally.passed,
            test_case_tally.total,
            structural_tally.passed,
            structural_tally.total
        );

        Ok(EvaluationReport {
            success,
            language: request.language,
            executed_at: Utc::now(),
            test_cases,
            test_case_tally,
            structural,
            structural_tally,
            final_score: score,
            max_score: request.task_marks,
            output,
            error,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn execution_request(request: &EvaluationRequest, stdin: String) -> ExecutionRequest {
    ExecutionRequest::builder()
        .language(request.language)
        .source(request.code.clone())
        .stdin(stdin)
        .build()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
