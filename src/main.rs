mod cli;

use clap::{Parser, Subcommand};

use cli::assemble::AssembleArgs;
use cli::compile::CompileArgs;
use cli::translate::TranslateArgs;

#[derive(Parser)]
#[command(
    name = "hackc",
    version,
    about = "Hack platform toolchain — assembler, VM translator, Jack compiler"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a .asm file to .hack binary code
    Assemble(AssembleArgs),
    /// Translate VM code (a .vm file or a directory) to Hack assembly
    Translate(TranslateArgs),
    /// Compile Jack source (a .jack file or a directory) to VM code
    Compile(CompileArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Assemble(args) => cli::assemble::cmd_assemble(args),
        Command::Translate(args) => cli::translate::cmd_translate(args),
        Command::Compile(args) => cli::compile::cmd_compile(args),
    }
}
