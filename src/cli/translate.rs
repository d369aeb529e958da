use std::path::PathBuf;
use std::process;

use clap::Args;

use super::write_output;

#[derive(Args)]
pub struct TranslateArgs {
    /// Input .vm file, or a directory whose .vm files are concatenated
    pub input: PathBuf,
    /// Inject the bootstrap preamble when the output defines Sys.init
    #[arg(long, overrides_with = "no_booting")]
    pub booting: bool,
    /// Do not inject the bootstrap preamble (default)
    #[arg(long, overrides_with = "booting")]
    pub no_booting: bool,
    /// Initial stack pointer value set by the bootstrap
    #[arg(long, value_name = "ADDR")]
    pub sp: Option<u16>,
    /// Output .asm file (default: derived from the input path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn cmd_translate(args: TranslateArgs) {
    let TranslateArgs {
        input,
        booting,
        no_booting: _,
        sp,
        output,
    } = args;

    let asm = match hackc::translate_path(&input, booting, sp) {
        Ok(asm) => asm,
        Err(e) => {
            e.report();
            process::exit(1);
        }
    };

    let out_path = output.unwrap_or_else(|| hackc::translate_output_path(&input));
    write_output(&out_path, &asm);
    eprintln!("Translated -> {}", out_path.display());
}
