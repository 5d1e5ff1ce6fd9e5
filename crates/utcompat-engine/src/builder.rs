//! One assertion, from start to reaction.

use std::fmt;

use crate::assertion::{AssertionInfo, AssertionResult, ResultDisposition, ResultWas, SourceLineInfo};
use crate::capture::{CapturedPanic, raise_test_aborted};
use crate::context::{self, Reaction};

/// Collects the outcome of one assertion and hands it to the run context.
///
/// The builder starts out as a pass. Text written through [`fmt::Write`]
/// becomes the result message.
///
/// ```
/// use std::fmt::Write;
/// use utcompat_engine::{ResultBuilder, ResultDisposition, SourceLineInfo};
///
/// let mut builder = ResultBuilder::new(
///     "CHECK",
///     SourceLineInfo::new(file!(), line!()),
///     "2 + 2 == 4",
///     ResultDisposition::ContinueOnFailure,
/// );
/// builder.capture_expression(2 + 2 == 4);
/// write!(builder, "arithmetic still works").unwrap();
/// builder.react();
/// ```
#[derive(Debug)]
#[must_use = "a result is only recorded by `react`"]
pub struct ResultBuilder {
    info: AssertionInfo,
    result_type: ResultWas,
    expanded_expression: Option<String>,
    message: String,
}

impl ResultBuilder {
    pub fn new(
        macro_name: &'static str,
        line_info: SourceLineInfo,
        captured_expression: &'static str,
        disposition: ResultDisposition,
    ) -> Self {
        let info = AssertionInfo {
            macro_name,
            line_info,
            captured_expression,
            disposition,
        };
        context::assertion_started(&info);
        Self {
            info,
            result_type: ResultWas::Ok,
            expanded_expression: None,
            message: String::new(),
        }
    }

    #[must_use]
    pub fn info(&self) -> &AssertionInfo {
        &self.info
    }

    #[must_use]
    pub fn result_type(&self) -> ResultWas {
        self.result_type
    }

    /// Whether throws-style assertions should evaluate their expression.
    #[must_use]
    pub fn allow_throws(&self) -> bool {
        context::allow_throws()
    }

    /// Record the value a boolean expression evaluated to.
    pub fn capture_expression(&mut self, value: bool) {
        self.expanded_expression = Some(value.to_string());
        self.result_type = if value {
            ResultWas::Ok
        } else {
            ResultWas::ExpressionFailed
        };
    }

    pub fn capture_result(&mut self, result_type: ResultWas) {
        self.result_type = result_type;
    }

    /// Record an unexpected panic raised while evaluating the expression.
    pub fn use_active_exception(&mut self, panic: &CapturedPanic, disposition: ResultDisposition) {
        self.info.disposition = disposition;
        self.result_type = ResultWas::ThrewException;
        self.message = panic.message().to_string();
    }

    /// Snapshot of the result as it would be recorded now.
    #[must_use]
    pub fn build(&self) -> AssertionResult {
        AssertionResult {
            info: self.info,
            result_type: self.result_type,
            expanded_expression: self.expanded_expression.clone(),
            message: self.message.clone(),
            info_messages: Vec::new(),
        }
    }

    /// Record the result and apply its consequences.
    ///
    /// A failure under [`ResultDisposition::Normal`] (or once the run's
    /// abort-after limit is reached) unwinds the running test. On a thread
    /// outside any run a failure panics with the rendered result.
    pub fn react(self) {
        let result = AssertionResult {
            info: self.info,
            result_type: self.result_type,
            expanded_expression: self.expanded_expression,
            message: self.message,
            info_messages: Vec::new(),
        };
        match context::handle_result(result) {
            Reaction::Continue => {}
            Reaction::AbortTest => raise_test_aborted(),
            Reaction::Detached(result) => {
                if !result.succeeded() {
                    panic!("{}", result.render());
                }
            }
        }
    }
}

impl fmt::Write for ResultBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.message.push_str(s);
        Ok(())
    }
}
