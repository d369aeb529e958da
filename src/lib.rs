pub mod assembler;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod symbols;
pub mod token;
pub mod vm;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use diagnostic::{render_diagnostics, Diagnostic};
use lexer::Lexer;
use parser::{ClassOutput, Parser};

/// Compile one Jack class to VM commands.
///
/// Output is a pure function of the source text; the class name comes from
/// the `class` declaration itself.
pub fn compile_source(source: &str) -> Result<ClassOutput, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    Parser::new(tokens).compile_class().map_err(|e| vec![e])
}

/// Translate one VM compilation unit to Hack assembly lines.
///
/// `filename` (the unit's basename, without extension) qualifies
/// static-segment symbols and synthetic labels. Output is a pure function
/// of `(source, filename)`.
pub fn translate_source(source: &str, filename: &str) -> Result<Vec<String>, Vec<Diagnostic>> {
    let commands = vm::parse_program(source)?;
    Ok(vm::translate::Translator::new(filename).translate(&commands))
}

/// Assemble Hack assembly text into binary words, one per line.
pub fn assemble_source(source: &str) -> Result<Vec<String>, Vec<Diagnostic>> {
    assembler::assemble(source)
}

/// A failure at the file level of the pipeline.
pub enum PipelineError {
    /// Host I/O failure, reported verbatim.
    Io(String),
    /// Source-level diagnostics in one input file.
    Source {
        path: PathBuf,
        source: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl PipelineError {
    fn io(path: &Path, err: io::Error) -> Self {
        PipelineError::Io(format!("cannot read '{}': {}", path.display(), err))
    }

    /// Report the failure to stderr.
    pub fn report(&self) {
        match self {
            PipelineError::Io(msg) => eprintln!("error: {}", msg),
            PipelineError::Source {
                path,
                source,
                diagnostics,
            } => {
                render_diagnostics(diagnostics, &path.to_string_lossy(), source);
            }
        }
    }
}

/// Files with the given extension in `dir`, in sorted order.
pub fn sorted_files(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == extension))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Translate a `.vm` file, or every `.vm` file in a directory (sorted,
/// concatenated), into one assembly text.
///
/// With `booting`, and only when the combined output defines `Sys.init`,
/// the bootstrap preamble is prepended; `sp` optionally initializes the
/// stack pointer first.
pub fn translate_path(
    input: &Path,
    booting: bool,
    sp: Option<u16>,
) -> Result<String, PipelineError> {
    let files = if input.is_dir() {
        sorted_files(input, "vm").map_err(|e| PipelineError::io(input, e))?
    } else {
        vec![input.to_path_buf()]
    };
    if files.is_empty() {
        return Err(PipelineError::Io(format!(
            "no .vm files found in '{}'",
            input.display()
        )));
    }

    let mut lines = Vec::new();
    for file in &files {
        let source = fs::read_to_string(file).map_err(|e| PipelineError::io(file, e))?;
        match translate_source(&source, &file_stem(file)) {
            Ok(asm) => lines.extend(asm),
            Err(diagnostics) => {
                return Err(PipelineError::Source {
                    path: file.clone(),
                    source,
                    diagnostics,
                });
            }
        }
    }

    if booting && lines.iter().any(|line| line == "(Sys.init)") {
        let mut preamble = vm::translate::bootstrap(sp);
        preamble.extend(lines);
        lines = preamble;
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// Default output path of the VM translator: `<dir>/<dir>.asm` for a
/// directory input, suffix replacement for a file input.
pub fn translate_output_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.join(format!("{}.asm", file_stem(input)))
    } else {
        input.with_extension("asm")
    }
}

/// Compile a `.jack` file, or every `.jack` file in a directory (sorted),
/// returning `(output path, VM text)` per class. Warnings are rendered to
/// stderr; the first file with errors aborts the run.
pub fn compile_directory(input: &Path) -> Result<Vec<(PathBuf, String)>, PipelineError> {
    let files = if input.is_dir() {
        sorted_files(input, "jack").map_err(|e| PipelineError::io(input, e))?
    } else {
        vec![input.to_path_buf()]
    };
    if files.is_empty() {
        return Err(PipelineError::Io(format!(
            "no .jack files found in '{}'",
            input.display()
        )));
    }

    let mut outputs = Vec::new();
    for file in &files {
        let source = fs::read_to_string(file).map_err(|e| PipelineError::io(file, e))?;
        match compile_source(&source) {
            Ok(class) => {
                if !class.warnings.is_empty() {
                    render_diagnostics(&class.warnings, &file.to_string_lossy(), &source);
                }
                let mut text = class.code.join("\n");
                text.push('\n');
                outputs.push((file.with_extension("vm"), text));
            }
            Err(diagnostics) => {
                return Err(PipelineError::Source {
                    path: file.clone(),
                    source,
                    diagnostics,
                });
            }
        }
    }
    Ok(outputs)
}
