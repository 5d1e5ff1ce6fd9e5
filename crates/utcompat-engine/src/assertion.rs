//! Assertion records.

use serde::Serialize;

/// Source location of an assertion or test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLineInfo {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLineInfo {
    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl std::fmt::Display for SourceLineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// What the engine does when an assertion fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultDisposition {
    /// Record the failure, then abort the running test.
    Normal,
    /// Record the failure and keep executing the test body.
    ContinueOnFailure,
}

impl ResultDisposition {
    /// Returns true if a failure under this disposition aborts the test.
    #[must_use]
    pub const fn aborts_on_failure(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Outcome of a single recorded assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultWas {
    Ok,
    Info,
    Warning,
    /// `FAIL`-style failure requested by the test itself.
    ExplicitFailure,
    /// The asserted expression evaluated to false.
    ExpressionFailed,
    /// Evaluation panicked where no panic was expected.
    ThrewException,
    /// A throws-style assertion completed without panicking.
    DidntThrowException,
}

impl ResultWas {
    /// Returns true for outcomes that do not count as failures.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::Info | Self::Warning)
    }
}

/// Static description of one assertion invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssertionInfo {
    /// Host macro name (`CHECK`, `REQUIRE_THROWS_AS`, ...).
    pub macro_name: &'static str,
    pub line_info: SourceLineInfo,
    /// Literal source text of the asserted expression.
    pub captured_expression: &'static str,
    pub disposition: ResultDisposition,
}

/// An informational message attached to the running test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageInfo {
    pub macro_name: &'static str,
    pub line_info: SourceLineInfo,
    pub message: String,
}

/// Fully captured result of one assertion, as handed to reporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    pub info: AssertionInfo,
    pub result_type: ResultWas,
    /// Value the expression evaluated to, when one was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_expression: Option<String>,
    /// Streamed diagnostic text or the translated panic message.
    pub message: String,
    /// Messages attached to the test when this result was recorded.
    pub info_messages: Vec<MessageInfo>,
}

impl AssertionResult {
    /// Returns true if the assertion passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result_type.is_ok()
    }

    /// Render the result the way console output and detached failures show it.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("{}: ", self.info.line_info);
        out.push_str(if self.succeeded() { "PASSED" } else { "FAILED" });
        out.push('\n');

        if !self.info.captured_expression.is_empty() {
            out.push_str(&format!(
                "  {}( {} )\n",
                self.info.macro_name, self.info.captured_expression
            ));
        }
        if let Some(expanded) = &self.expanded_expression {
            out.push_str(&format!("with expansion:\n  {expanded}\n"));
        }

        match self.result_type {
            ResultWas::ThrewException => {
                out.push_str(&format!(
                    "due to unexpected exception with message:\n  {}\n",
                    self.message
                ));
            }
            ResultWas::DidntThrowException => {
                out.push_str("because no exception was thrown where one was expected\n");
            }
            ResultWas::ExplicitFailure => {
                out.push_str(&format!("explicitly with message:\n  {}\n", self.message));
            }
            _ if !self.message.is_empty() => {
                out.push_str(&format!("with message:\n  {}\n", self.message));
            }
            _ => {}
        }

        for info in &self.info_messages {
            out.push_str(&format!("with message:\n  {}\n", info.message));
        }
        out
    }
}
