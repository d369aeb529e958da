use std::path::PathBuf;
use std::process;

use clap::Args;

use super::write_output;

#[derive(Args)]
pub struct CompileArgs {
    /// Directory of .jack files (or a single .jack file); each class is
    /// compiled to a sibling .vm file
    pub input: PathBuf,
}

pub fn cmd_compile(args: CompileArgs) {
    let CompileArgs { input } = args;

    let outputs = match hackc::compile_directory(&input) {
        Ok(outputs) => outputs,
        Err(e) => {
            e.report();
            process::exit(1);
        }
    };

    for (path, text) in &outputs {
        write_output(path, text);
        eprintln!("Compiled -> {}", path.display());
    }
}
