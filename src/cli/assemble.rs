use std::path::PathBuf;
use std::process;

use clap::Args;

use hackc::diagnostic::render_diagnostics;

use super::{read_input, write_output};

#[derive(Args)]
pub struct AssembleArgs {
    /// Input .asm file
    pub input: PathBuf,
    /// Output .hack file (default: input with the extension replaced)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn cmd_assemble(args: AssembleArgs) {
    let AssembleArgs { input, output } = args;

    if !input.extension().is_some_and(|e| e == "asm") {
        eprintln!("error: input must be a .asm file");
        process::exit(1);
    }

    let source = read_input(&input);
    let words = match hackc::assemble_source(&source) {
        Ok(words) => words,
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, &input.to_string_lossy(), &source);
            process::exit(1);
        }
    };

    let out_path = output.unwrap_or_else(|| input.with_extension("hack"));
    let mut text = words.join("\n");
    text.push('\n');
    write_output(&out_path, &text);
    eprintln!("Assembled -> {}", out_path.display());
}
