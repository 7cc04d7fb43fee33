//! FileCheck-style test validation for TAST files.
//!
//! A fixture carries its own expectations as comment directives:
//!
//! ```text
//! ; RUN: %c2bc --dump
//! ; CHECK-LABEL: Preamble function:
//! ; CHECK-NEXT: Function <unnamed>
//! ; CHECK-NOT: BC_ZERO_REG
//! x : s32 = 5;
//! ```
//!
//! `--dump` generates the program and renders it with the program printer.
//! `--expect-error` requires generation (or parsing) to fail and renders one
//! `error: ...` line per diagnostic. `--stats` appends the session statistics,
//! `--zero-init` and `--stack-size=N` adjust the generator configuration.

use bumpalo::Bump;

use super::parse_file;
use crate::bytecode::{BytecodeGenerator, GeneratorConfig};
use crate::core::CompilationSession;

/// A CHECK directive extracted from a TAST file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match on this or a later line
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// CHECK-NOT: pattern - Absent up to the next positive match
    CheckNot(String),
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to execute the test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

/// Test specification extracted from a TAST file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub source: String,
}

impl TestSpec {
    /// Parse a TAST file to extract test specifications
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut source_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let parts: Vec<&str> = run_cmd.split_whitespace().collect();
                if parts.is_empty() {
                    return Err(format!("empty RUN directive: '{}'", line));
                }
                run_directives.push(RunDirective {
                    command: parts[0].to_string(),
                    args: parts[1..].iter().map(|s| s.to_string()).collect(),
                });
                // directives are blanked so parse errors keep their line numbers
                source_lines.push("");
            } else if let Some(directive) = parse_check_directive(trimmed) {
                check_directives.push(directive);
                source_lines.push("");
            } else {
                source_lines.push(line);
            }
        }

        if run_directives.is_empty() {
            return Err("no RUN directive".to_string());
        }

        Ok(TestSpec {
            run_directives,
            check_directives,
            source: source_lines.join("\n"),
        })
    }
}

fn parse_check_directive(line: &str) -> Option<CheckDirective> {
    let pattern = |prefix: &str| line.strip_prefix(prefix).map(|p| p.trim().to_string());

    if let Some(p) = pattern("; CHECK-LABEL:") {
        Some(CheckDirective::CheckLabel(p))
    } else if let Some(p) = pattern("; CHECK-NEXT:") {
        Some(CheckDirective::CheckNext(p))
    } else if let Some(p) = pattern("; CHECK-NOT:") {
        Some(CheckDirective::CheckNot(p))
    } else if line.starts_with("; CHECK-EMPTY") {
        Some(CheckDirective::CheckEmpty)
    } else if let Some(p) = pattern("; CHECK:") {
        Some(CheckDirective::Check(p))
    } else {
        pattern("; COM:").map(CheckDirective::Comment)
    }
}

/// Options of one RUN line.
#[derive(Debug, Default)]
struct RunOptions {
    dump: bool,
    expect_error: bool,
    stats: bool,
    config: GeneratorConfig,
}

impl RunOptions {
    fn from_directive(run_dir: &RunDirective) -> Result<Self, String> {
        let mut options = RunOptions::default();
        for arg in &run_dir.args {
            match arg.as_str() {
                "--dump" => options.dump = true,
                "--expect-error" => options.expect_error = true,
                "--stats" => options.stats = true,
                "--zero-init" => options.config.explicit_zero_init = true,
                other => {
                    let Some(size) = other.strip_prefix("--stack-size=") else {
                        return Err(format!("unknown RUN argument '{}'", other));
                    };
                    options.config.stack_size = size
                        .parse()
                        .map_err(|_| format!("invalid stack size '{}'", size))?;
                }
            }
        }
        Ok(options)
    }
}

/// Fail if any pending CHECK-NOT pattern occurs in `lines`, then clear them.
fn check_not(pending: &mut Vec<&str>, lines: &[&str]) -> Result<(), String> {
    for pattern in pending.drain(..) {
        if let Some(line) = lines.iter().find(|line| line.contains(pattern)) {
            return Err(format!("CHECK-NOT: pattern '{}' found in '{}'", pattern, line));
        }
    }
    Ok(())
}

/// Test runner that executes TAST tests
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run a TAST test and validate output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        for run_dir in &spec.run_directives {
            let output = self.execute_command(&spec.source, run_dir)?;
            if self.verbose {
                println!("{}", output);
            }
            self.validate_output(&output, &spec.check_directives)?;
        }
        Ok(())
    }

    /// Execute a test command and return the output
    pub fn execute_command(&self, source: &str, run_dir: &RunDirective) -> Result<String, String> {
        let options = RunOptions::from_directive(run_dir)?;

        let ast = match parse_file(source, None) {
            Ok(ast) => ast,
            Err(e) if options.expect_error => return Ok(format!("error: {}\n", e)),
            Err(e) => return Err(format!("parse error: {}", e)),
        };

        let arena = Bump::new();
        let session = CompilationSession::new(&arena);
        let generator = BytecodeGenerator::with_config(&session, options.config);

        let mut output = String::new();
        match generator.compile_program(&ast) {
            Ok(program) => {
                if options.expect_error {
                    return Err("expected generation to fail but it succeeded".to_string());
                }
                if options.dump {
                    output.push_str(&program.to_string());
                }
            }
            Err(diagnostics) => {
                if !options.expect_error {
                    let errors: Vec<_> = diagnostics.errors().iter().map(|e| e.to_string()).collect();
                    return Err(format!("generation failed: {}", errors.join("; ")));
                }
                for error in diagnostics.errors() {
                    output.push_str(&format!("error: {}\n", error));
                }
            }
        }

        if options.stats {
            output.push_str(&session.stats().to_string());
        }
        Ok(output)
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: Vec<_> = output.lines().collect();
        let mut line_idx = 0;
        let mut pending_not: Vec<&str> = Vec::new();

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::CheckNot(pattern) => pending_not.push(pattern),

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));

                    match found {
                        Some(idx) => {
                            check_not(&mut pending_not, &output_lines[line_idx..line_idx + idx])?;
                            line_idx += idx + 1;
                            if self.verbose {
                                println!("CHECK: '{}' found at line {}", pattern, line_idx - 1);
                            }
                        }
                        None => {
                            return Err(format!(
                                "CHECK: pattern '{}' not found in output",
                                pattern
                            ));
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    if line_idx >= output_lines.len() {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{}'", pattern));
                    }

                    let line = output_lines[line_idx];
                    if !line.contains(pattern.as_str()) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }
                    check_not(&mut pending_not, &[])?;
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    if line_idx >= output_lines.len() {
                        continue; // End of output counts as empty
                    }

                    let line = output_lines[line_idx];
                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }
                    line_idx += 1;
                }
            }
        }

        check_not(&mut pending_not, &output_lines[line_idx.min(output_lines.len())..])
    }
}
