use super::function::{FunctionTool, arg_str};
use super::schema::{Param, ParamType};
use crate::domain::ToolArgs;
use std::io::{self, BufRead, Write};

pub const USER_INPUT_TOOL: &str = "user_input";

const USER_INPUT_DOC: &str = "Ask the human operator a question and wait for the reply.

Use this only when the task cannot continue without information that no
other tool can provide.

Args:
    question (str): The question to show to the operator.
";

/// `user_input` backed by the process's stdin and stderr.
pub fn user_input_tool() -> FunctionTool {
    FunctionTool::new(
        USER_INPUT_TOOL,
        USER_INPUT_DOC,
        &[Param::required("question", ParamType::String)],
        |args: &ToolArgs| {
            let question = arg_str(args, "question").unwrap_or_default();
            ask(&mut io::stdin().lock(), &mut io::stderr(), &question)
        },
    )
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> io::Result<String> {
    write!(output, "\n{question}\n> ")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "operator input closed",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
