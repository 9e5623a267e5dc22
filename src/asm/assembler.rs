//! Translator from assembly text to a resolved program image.
//!
//! Syntax:
//! ```text
//! ; Comment
//! .data:
//!     num    count 10        ; one cell
//!     string msg   "Hi!"     ; one cell per character, then a 0 cell
//! .text:
//! loop: out# ptr             ; optional label, mnemonic, operands
//!       cmp  count 0         ; literals go to a pool at the end of data
//!       je   loop
//!       out  [msg]           ; [name] allocates a cell holding &name
//!       hlt
//! ```
//!
//! Operands resolve to variables first, then labels, then integer literals.

use crate::isa::{Instruction, Opcode, Program, ProgramImage};
use std::collections::HashMap;
use thiserror::Error;

/// Translate source text into a program and its initial data.
pub fn translate(source: &str) -> Result<ProgramImage, AssemblerError> {
    let mut translator = Translator::new();
    translator.translate(source)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Data,
    Text,
}

/// A text-section line after label extraction.
struct Statement<'a> {
    line: usize,
    mnemonic: &'a str,
    operands: Vec<&'a str>,
}

/// The translator state.
struct Translator {
    /// Variable name -> first data cell.
    variables: HashMap<String, i64>,
    /// Label -> instruction index.
    labels: HashMap<String, i64>,
    /// Initial data: declarations, then literal and pointer cells.
    data: Vec<i64>,
    /// Instructions seen by pass 1.
    text_len: i64,
    code: Vec<Instruction>,
}

impl Translator {
    fn new() -> Self {
        Self {
            variables: HashMap::new(),
            labels: HashMap::new(),
            data: Vec::new(),
            text_len: 0,
            code: Vec::new(),
        }
    }

    fn translate(&mut self, source: &str) -> Result<ProgramImage, AssemblerError> {
        // Pass 1: lay out data, collect labels
        let statements = self.scan(source)?;

        // Pass 2: resolve operands
        for stmt in &statements {
            self.emit(stmt)?;
        }

        Ok(ProgramImage::new(
            Program::new(std::mem::take(&mut self.code)),
            std::mem::take(&mut self.data),
        ))
    }

    fn scan<'a>(&mut self, source: &'a str) -> Result<Vec<Statement<'a>>, AssemblerError> {
        let mut section = Section::None;
        let mut text_seen = false;
        let mut statements = Vec::new();

        for (index, raw) in source.lines().enumerate() {
            let line_num = index + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            match line {
                ".data:" => {
                    section = Section::Data;
                    continue;
                }
                ".text:" => {
                    section = Section::Text;
                    text_seen = true;
                    continue;
                }
                _ if line.starts_with('.') => {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: format!("unknown directive `{}`", line),
                    });
                }
                _ => {}
            }

            match section {
                Section::None => {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: "statement outside of .data: or .text: section".into(),
                    });
                }
                Section::Data => self.declare(line, line_num)?,
                Section::Text => {
                    if let Some(stmt) = self.statement(line, line_num)? {
                        statements.push(stmt);
                    }
                }
            }
        }

        if !text_seen {
            return Err(AssemblerError::MissingTextSection);
        }
        Ok(statements)
    }

    /// Handle a `.data:` declaration.
    fn declare(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let malformed = || AssemblerError::SyntaxError {
            line: line_num,
            message: "expected `num <name> <value>` or `string <name> \"<text>\"`".into(),
        };

        let (kind, rest) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let (name, value) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(malformed)?;
        let value = value.trim();

        if self.variables.contains_key(name) {
            return Err(AssemblerError::DuplicateSymbol {
                line: line_num,
                name: name.to_string(),
            });
        }
        let addr = self.data.len() as i64;

        match kind {
            "num" => {
                let number = parse_number(value).ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid number `{}`", value),
                })?;
                self.data.push(number);
            }
            "string" => {
                let text = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .ok_or_else(|| AssemblerError::SyntaxError {
                        line: line_num,
                        message: "string value must be enclosed in double quotes".into(),
                    })?;
                self.data.extend(text.chars().map(|c| i64::from(u32::from(c))));
                self.data.push(0);
            }
            _ => return Err(malformed()),
        }

        self.variables.insert(name.to_string(), addr);
        Ok(())
    }

    /// Split a `.text:` line into label and statement; define the label.
    fn statement<'a>(
        &mut self,
        line: &'a str,
        line_num: usize,
    ) -> Result<Option<Statement<'a>>, AssemblerError> {
        let mut words = line.split_whitespace().peekable();

        if let Some(label) = words.peek().copied().and_then(|w| w.strip_suffix(':')) {
            if label.is_empty() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "empty label".into(),
                });
            }
            if self.labels.contains_key(label) {
                return Err(AssemblerError::DuplicateSymbol {
                    line: line_num,
                    name: label.to_string(),
                });
            }
            self.labels.insert(label.to_string(), self.text_len);
            words.next();
        }

        let Some(mnemonic) = words.next() else {
            return Ok(None);
        };
        self.text_len += 1;

        Ok(Some(Statement {
            line: line_num,
            mnemonic,
            operands: words.collect(),
        }))
    }

    /// Resolve a statement into an instruction.
    fn emit(&mut self, stmt: &Statement<'_>) -> Result<(), AssemblerError> {
        let opcode =
            Opcode::from_mnemonic(stmt.mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
                line: stmt.line,
                mnemonic: stmt.mnemonic.to_string(),
            })?;

        if stmt.operands.len() != opcode.operand_count() {
            return Err(AssemblerError::OperandCount {
                line: stmt.line,
                mnemonic: stmt.mnemonic.to_string(),
                expected: opcode.operand_count(),
                found: stmt.operands.len(),
            });
        }

        let args = stmt
            .operands
            .iter()
            .map(|operand| self.resolve(operand, stmt.line))
            .collect::<Result<Vec<_>, _>>()?;

        let addr = self.code.len();
        self.code.push(Instruction::new(opcode, args, addr));
        Ok(())
    }

    fn resolve(&mut self, operand: &str, line_num: usize) -> Result<i64, AssemblerError> {
        let undefined = |name: &str| AssemblerError::UndefinedSymbol {
            line: line_num,
            name: name.to_string(),
        };

        if let Some(name) = operand.strip_prefix('[').and_then(|o| o.strip_suffix(']')) {
            let target = *self.variables.get(name).ok_or_else(|| undefined(name))?;
            return Ok(self.pool(target));
        }
        if let Some(&addr) = self.variables.get(operand) {
            return Ok(addr);
        }
        if let Some(&index) = self.labels.get(operand) {
            return Ok(index);
        }
        match parse_number(operand) {
            Some(value) => Ok(self.pool(value)),
            None => Err(undefined(operand)),
        }
    }

    /// Append a cell to data memory, returning its address.
    fn pool(&mut self, value: i64) -> i64 {
        self.data.push(value);
        self.data.len() as i64 - 1
    }
}

/// Drop a `;` comment, ignoring semicolons inside string literals.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            ';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_number(text: &str) -> Option<i64> {
    text.parse().ok()
}

/// Errors that can occur during translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined symbol on line {line}: {name}")]
    UndefinedSymbol { line: usize, name: String },

    #[error("symbol defined twice on line {line}: {name}")]
    DuplicateSymbol { line: usize, name: String },

    #[error("`{mnemonic}` on line {line} takes {expected} operand(s), found {found}")]
    OperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("section .text: is not present")]
    MissingTextSection,
}
