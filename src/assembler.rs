//! Hack assembler — symbolic assembly to 16-bit binary words.
//!
//! Two passes: the first records `(label)` addresses, the second allocates
//! variables from RAM address 16 upward and encodes each instruction as a
//! 16-character binary string.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Largest value an A-instruction can load (15 bits).
pub const MAX_ADDRESS: u32 = 32767;

/// First RAM address handed out to assembly-time variables.
const FIRST_VARIABLE_ADDRESS: u16 = 16;

/// One significant source line with all whitespace removed.
struct Line {
    text: String,
    span: Span,
}

/// Assemble Hack assembly text into binary words, one per output line.
pub fn assemble(source: &str) -> Result<Vec<String>, Vec<Diagnostic>> {
    let lines = significant_lines(source);
    let mut symbols = predefined_symbols();
    let mut diagnostics = Vec::new();

    // First pass: bind labels to the address of the following instruction
    let mut instructions: Vec<Line> = Vec::new();
    for line in lines {
        if line.text.starts_with('(') {
            match line.text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                Some(name) if !name.is_empty() => {
                    symbols.insert(name.to_string(), instructions.len() as u16);
                }
                _ => diagnostics.push(
                    Diagnostic::error(format!("malformed label '{}'", line.text), line.span)
                        .with_help("labels are written as (NAME)".to_string()),
                ),
            }
        } else {
            instructions.push(line);
        }
    }

    // Second pass: resolve symbols and encode
    let mut next_var = FIRST_VARIABLE_ADDRESS;
    let mut words = Vec::new();
    for line in &instructions {
        match encode(line, &mut symbols, &mut next_var) {
            Ok(word) => words.push(word),
            Err(diag) => diagnostics.push(diag),
        }
    }

    if diagnostics.is_empty() {
        Ok(words)
    } else {
        Err(diagnostics)
    }
}

/// Strip `//` comments and all whitespace; drop empty lines.
fn significant_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0usize;
    for raw in source.split('\n') {
        let start = offset;
        offset += raw.len() + 1;
        let code = raw.split("//").next().unwrap_or("");
        let text: String = code.split_whitespace().collect();
        if text.is_empty() {
            continue;
        }
        lines.push(Line {
            text,
            span: Span::new(start as u32, (start + raw.trim_end().len()) as u32),
        });
    }
    lines
}

fn predefined_symbols() -> HashMap<String, u16> {
    let mut map = HashMap::new();
    for (name, addr) in [
        ("SP", 0u16),
        ("LCL", 1),
        ("ARG", 2),
        ("THIS", 3),
        ("THAT", 4),
        ("SCREEN", 0x4000),
        ("KBD", 0x6000),
    ] {
        map.insert(name.to_string(), addr);
    }
    for r in 0..16u16 {
        map.insert(format!("R{}", r), r);
    }
    map
}

fn encode(
    line: &Line,
    symbols: &mut HashMap<String, u16>,
    next_var: &mut u16,
) -> Result<String, Diagnostic> {
    if let Some(value) = line.text.strip_prefix('@') {
        encode_a_instruction(value, line.span, symbols, next_var)
    } else {
        encode_c_instruction(&line.text, line.span)
    }
}

fn encode_a_instruction(
    value: &str,
    span: Span,
    symbols: &mut HashMap<String, u16>,
    next_var: &mut u16,
) -> Result<String, Diagnostic> {
    let address = if value.is_empty() {
        return Err(Diagnostic::error("empty A-instruction".to_string(), span));
    } else if value.bytes().all(|b| b.is_ascii_digit()) {
        match value.parse::<u32>() {
            Ok(n) if n <= MAX_ADDRESS => n as u16,
            _ => {
                return Err(Diagnostic::error(
                    format!("address '{}' does not fit in 15 bits", value),
                    span,
                )
                .with_help(format!("maximum address is {}", MAX_ADDRESS)));
            }
        }
    } else {
        match symbols.get(value) {
            Some(addr) => *addr,
            None => {
                let addr = *next_var;
                symbols.insert(value.to_string(), addr);
                *next_var += 1;
                addr
            }
        }
    };
    Ok(format!("0{:015b}", address))
}

fn encode_c_instruction(text: &str, span: Span) -> Result<String, Diagnostic> {
    let (dest, rest) = match text.split_once('=') {
        Some((d, r)) => (d, r),
        None => ("", text),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((c, j)) => (c, j),
        None => (rest, ""),
    };
    Ok(format!(
        "111{}{}{}",
        comp_bits(comp, span)?,
        dest_bits(dest, span)?,
        jump_bits(jump, span)?
    ))
}

fn comp_bits(comp: &str, span: Span) -> Result<&'static str, Diagnostic> {
    let bits = match comp {
        "0" => "0101010",
        "1" => "0111111",
        "-1" => "0111010",
        "D" => "0001100",
        "A" => "0110000",
        "!D" => "0001101",
        "!A" => "0110001",
        "-D" => "0001111",
        "-A" => "0110011",
        "D+1" => "0011111",
        "A+1" => "0110111",
        "D-1" => "0001110",
        "A-1" => "0110010",
        "D+A" => "0000010",
        "D-A" => "0010011",
        "A-D" => "0000111",
        "D&A" => "0000000",
        "D|A" => "0010101",
        "M" => "1110000",
        "!M" => "1110001",
        "-M" => "1110011",
        "M+1" => "1110111",
        "M-1" => "1110010",
        "D+M" => "1000010",
        "D-M" => "1010011",
        "M-D" => "1000111",
        "D&M" => "1000000",
        "D|M" => "1010101",
        _ => {
            return Err(
                Diagnostic::error(format!("unknown computation '{}'", comp), span).with_help(
                    "computations combine D, A, and M, e.g. D+1, D&M, -A".to_string(),
                ),
            );
        }
    };
    Ok(bits)
}

fn dest_bits(dest: &str, span: Span) -> Result<String, Diagnostic> {
    let mut bits = 0u8;
    for ch in dest.chars() {
        match ch {
            'M' => bits |= 1,
            'D' => bits |= 1 << 1,
            'A' => bits |= 1 << 2,
            _ => {
                return Err(Diagnostic::error(
                    format!("unknown destination '{}'", dest),
                    span,
                )
                .with_help("destinations are combinations of A, D, and M".to_string()));
            }
        }
    }
    Ok(format!("{:03b}", bits))
}

fn jump_bits(jump: &str, span: Span) -> Result<&'static str, Diagnostic> {
    let bits = match jump {
        "" => "000",
        "JGT" => "001",
        "JEQ" => "010",
        "JGE" => "011",
        "JLT" => "100",
        "JNE" => "101",
        "JLE" => "110",
        "JMP" => "111",
        _ => {
            return Err(
                Diagnostic::error(format!("unknown jump '{}'", jump), span).with_help(
                    "jumps are JGT, JEQ, JGE, JLT, JNE, JLE, or JMP".to_string(),
                ),
            );
        }
    };
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_ok(source: &str) -> Vec<String> {
        assemble(source).expect("should assemble")
    }

    #[test]
    fn test_add_two_constants() {
        let words = assemble_ok("@5\nD=A\n@3\nD=D+A\n@0\nM=D\n");
        assert_eq!(
            words,
            vec![
                "0000000000000101",
                "1110110000010000",
                "0000000000000011",
                "1110000010010000",
                "0000000000000000",
                "1110001100001000",
            ]
        );
    }

    #[test]
    fn test_a_instruction_boundaries() {
        assert_eq!(assemble_ok("@0")[0], "0000000000000000");
        assert_eq!(assemble_ok("@32767")[0], "0111111111111111");
    }

    #[test]
    fn test_labels_resolve_to_instruction_index() {
        let words = assemble_ok("@START\n0;JMP\n(START)\nD=0\n(END)\n@END\n0;JMP\n");
        // (START) is instruction 2, (END) is instruction 3
        assert_eq!(words[0], "0000000000000010");
        assert_eq!(words[3], "0000000000000011");
    }

    #[test]
    fn test_variables_allocated_from_16() {
        let words = assemble_ok("@i\n@j\n@i\n");
        assert_eq!(words[0], "0000000000010000"); // 16
        assert_eq!(words[1], "0000000000010001"); // 17
        assert_eq!(words[2], "0000000000010000"); // i again
    }

    #[test]
    fn test_predefined_symbols() {
        let words = assemble_ok("@SP\n@LCL\n@ARG\n@THIS\n@THAT\n@R13\n@SCREEN\n@KBD\n");
        assert_eq!(words[0], "0000000000000000");
        assert_eq!(words[1], "0000000000000001");
        assert_eq!(words[2], "0000000000000010");
        assert_eq!(words[3], "0000000000000011");
        assert_eq!(words[4], "0000000000000100");
        assert_eq!(words[5], "0000000000001101");
        assert_eq!(words[6], "0100000000000000");
        assert_eq!(words[7], "0110000000000000");
    }

    #[test]
    fn test_dest_combinations() {
        assert_eq!(assemble_ok("M=D")[0], "1110001100001000");
        assert_eq!(assemble_ok("D=M")[0], "1111110000010000");
        assert_eq!(assemble_ok("AM=M-1")[0], "1111110010101000");
        assert_eq!(assemble_ok("AMD=1")[0], "1110111111111000");
    }

    #[test]
    fn test_jump_codes() {
        assert_eq!(assemble_ok("0;JMP")[0], "1110101010000111");
        assert_eq!(assemble_ok("D;JNE")[0], "1110001100000101");
        assert_eq!(assemble_ok("D;JEQ")[0], "1110001100000010");
        assert_eq!(assemble_ok("D;JLT")[0], "1110001100000100");
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        let words = assemble_ok("  D = D + A  // add\n\n   @ 5\n");
        assert_eq!(words[0], "1110000010010000");
        assert_eq!(words[1], "0000000000000101");
    }

    #[test]
    fn test_dotted_symbols() {
        // VM-translator output uses File.index statics and name$ret labels
        let words = assemble_ok("@Main.0\n@Foo.bar$ret.Main.0\n");
        assert_eq!(words[0], "0000000000010000");
        assert_eq!(words[1], "0000000000010001");
    }

    #[test]
    fn test_error_unknown_comp() {
        let diags = assemble("D=D*A").unwrap_err();
        assert!(diags[0].message.contains("unknown computation 'D*A'"));
        assert!(diags[0].help.is_some());
    }

    #[test]
    fn test_error_unknown_jump() {
        let diags = assemble("0;JXX").unwrap_err();
        assert!(diags[0].message.contains("unknown jump 'JXX'"));
    }

    #[test]
    fn test_error_address_too_large() {
        let diags = assemble("@32768").unwrap_err();
        assert!(diags[0].message.contains("does not fit in 15 bits"));
    }

    #[test]
    fn test_error_malformed_label() {
        let diags = assemble("(LOOP").unwrap_err();
        assert!(!diags.is_empty());
    }

    #[test]
    fn test_error_span_points_at_line() {
        let source = "@1\nD=D*A\n";
        let diags = assemble(source).unwrap_err();
        let span = diags[0].span;
        assert_eq!(&source[span.start as usize..span.end as usize], "D=D*A");
    }
}
