use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::builtins::Builtin;
use crate::error::Result;
use crate::exec;
use crate::parser;
use crate::utils;

/// Global prompt string.
pub static PROMPT: &str = "jsh> ";

/// Runs the main shell loop: reads a line, parses it, and hands it to
/// the builtin dispatcher or the pipeline launcher. Errors print one
/// line on stderr and the loop keeps going; EOF ends the session.
///
/// - `emit_prompt`: if true, prints the command prompt.
/// - `verbose`: if true, echoes each accepted command line.
pub fn run_shell(emit_prompt: bool, verbose: bool) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("jsh: cannot initialize line reader: {err}");
            return;
        }
    };
    let history = utils::history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    loop {
        let line = match editor.readline(if emit_prompt { PROMPT } else { "" }) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("jsh: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());
        if verbose {
            println!("jsh: accepted: {}", line.trim());
        }
        if let Err(err) = eval(&line) {
            eprintln!("{err}");
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
}

fn eval(line: &str) -> Result<()> {
    let pipeline = parser::parse_command_line(line)?;
    match Builtin::parse(&pipeline.commands[0]) {
        Some(builtin) => builtin?.run(),
        None => exec::launch_pipeline(&pipeline),
    }
}
