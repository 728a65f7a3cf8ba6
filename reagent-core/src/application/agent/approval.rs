use crate::domain::Action;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Observation recorded when the operator declines a tool call.
pub const CANCELLED_OBSERVATION: &str = "Tool call cancelled by user";

/// Decides whether a tool call may run.
pub trait ToolApproval: Send + Sync {
    fn approve(&self, action: &Action) -> bool;
}

pub struct AutoApprove;

impl ToolApproval for AutoApprove {
    fn approve(&self, _action: &Action) -> bool {
        true
    }
}

/// Asks on stderr, reads `y`/`yes` from stdin. Anything else declines.
pub struct ConsoleApproval;

impl ToolApproval for ConsoleApproval {
    fn approve(&self, action: &Action) -> bool {
        match confirm(&mut io::stdin().lock(), &mut io::stderr(), action) {
            Ok(approved) => approved,
            Err(err) => {
                warn!(tool = %action.tool, error = %err, "confirmation prompt failed; declining");
                false
            }
        }
    }
}

fn confirm(input: &mut impl BufRead, output: &mut impl Write, action: &Action) -> io::Result<bool> {
    write!(
        output,
        "\nThe agent wants to call {}\n  {}\nAllow? [y/N] ",
        action.tool,
        action.render_args()
    )?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
