//! Role prompt templates
//!
//! The planner/reviewer model plays Design, Instruct, TestCommand, Review and
//! Summarize; the coder model plays Generate and Revise. Roles share no
//! memory, so each template names every input it needs.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A prompt role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTemplate {
    /// High-level design, optionally split into numbered steps
    Design,
    /// Implementation instructions for the coder
    Instruct,
    /// Initial code generation
    Generate,
    /// Test command (and optional harness files) for the current code
    TestCommand,
    /// Code review with the acceptance phrase
    Review,
    /// Targeted revision following review feedback
    Revise,
    /// Final run summary
    Summarize,
}

impl RoleTemplate {
    /// Every role, in pipeline order
    pub const ALL: [Self; 7] = [
        Self::Design,
        Self::Instruct,
        Self::Generate,
        Self::TestCommand,
        Self::Review,
        Self::Revise,
        Self::Summarize,
    ];

    /// Stable name used in logs and transcripts
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Instruct => "instruct",
            Self::Generate => "generate",
            Self::TestCommand => "test_command",
            Self::Review => "review",
            Self::Revise => "revise",
            Self::Summarize => "summarize",
        }
    }

    /// Whether the role is played by the coder model
    #[inline]
    #[must_use]
    pub const fn is_coder(self) -> bool {
        matches!(self, Self::Generate | Self::Revise)
    }

    /// Prompt template with `{placeholders}`
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Design => DESIGN,
            Self::Instruct => INSTRUCT,
            Self::Generate => GENERATE,
            Self::TestCommand => TEST_COMMAND,
            Self::Review => REVIEW,
            Self::Revise => REVISE,
            Self::Summarize => SUMMARIZE,
        }
    }
}

impl Display for RoleTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoleTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

const DESIGN: &str = "\
You are a senior developer planning work for a pair-programming partner.
Produce a concise design for the task below. If the work is large, split it
into numbered steps (`1.`, `2.`, ...), one self-contained sub-task per line.

Task: {task}

Files already in the workspace:
{existing_files}
";

const INSTRUCT: &str = "\
You are a developer who is pair programming with another developer.
You have been given this task by the other developer. Provide the
instructions for the task.

Task: {task}

Design:
{outline}

Files already in the workspace:
{existing_files}
";

const GENERATE: &str = "\
You are a developer who is pair programming with another developer.
You have been given these instructions by the other developer. Write neat,
well formatted, efficient code with the logic provided by the developer.
Label every file with a line `FILE: <relative path>` followed by the full
content in a fenced code block. To remove a file write `DELETE FILE: <path>`.

Instructions: {instructions}

Current step: {step}

Current files:
{files}
";

const TEST_COMMAND: &str = "\
You are a developer preparing to test your partner's code.
Give one shell command that runs the tests, on a line `COMMAND:` followed by
a fenced code block. If a test harness is needed, add its files as
`FILE: <path>` blocks and include UNIT_TESTER in their file names.
If the code cannot be tested automatically, reply with: cannot unit-test.

Instructions: {instructions}

Files:
{files}
";

const REVIEW: &str = "\
You are a developer who is pair programming with another developer.
You have been given this code by the other developer. Find any errors in the
code. If there are errors, be concise in your explanation of the errors.
If the code is correct, say the following phrase exactly: the code is correct.
Do not use this phrase for any other reason.

Task: {task}

Instructions: {instructions}

Current step: {step}

Code:
{files}

Test output:
{test_report}
";

const REVISE: &str = "\
You are a developer who is pair programming with another developer.
The other developer received your code and has provided the following
feedback. Follow the feedback to revise the code.

Describe each edit as a change block:
CHANGE: replace | insert after | insert before | delete
TARGET: <relative path>
OLD:
```
<exact text currently in the file>
```
NEW:
```
<replacement text>
```
Or resend whole files as `FILE: <path>` blocks.

Feedback: {feedback}

Instructions: {instructions}

Current step: {step}

Current files:
{files}
";

const SUMMARIZE: &str = "\
Summarize the work done for the task below in a few sentences for the user.

Task: {task}

Outcome: {outcome} after {iterations} revision round(s).

Files:
{files}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{keys, placeholders};

    #[test]
    fn names_roundtrip() {
        for role in RoleTemplate::ALL {
            assert_eq!(role.name().parse::<RoleTemplate>(), Ok(role));
            assert_eq!(role.to_string(), role.name());
        }
        assert!("planner".parse::<RoleTemplate>().is_err());
    }

    #[test]
    fn coder_roles() {
        let coder: Vec<_> = RoleTemplate::ALL.into_iter().filter(|r| r.is_coder()).collect();
        assert_eq!(coder, vec![RoleTemplate::Generate, RoleTemplate::Revise]);
    }

    #[test]
    fn templates_use_known_keys() {
        let known = [
            keys::TASK,
            keys::OUTLINE,
            keys::EXISTING_FILES,
            keys::INSTRUCTIONS,
            keys::STEP,
            keys::FILES,
            keys::FEEDBACK,
            keys::TEST_REPORT,
            keys::OUTCOME,
            keys::ITERATIONS,
        ];
        for role in RoleTemplate::ALL {
            for name in placeholders(role.template()) {
                assert!(known.contains(&name), "{role} uses unknown placeholder {name}");
            }
        }
    }

    #[test]
    fn review_template_states_acceptance_phrase() {
        let review = RoleTemplate::Review.template();
        assert!(review.contains("the code is correct"));
        assert!(review.contains("Do not use this phrase for any other reason."));
        assert!(RoleTemplate::TestCommand.template().contains("cannot unit-test"));
    }
}
