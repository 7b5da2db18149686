//! Logical-line lexer for asm15 source.
//!
//! Source format (free-form, case-sensitive ASCII):
//! - at most 80 characters per line
//! - optional `label:` as the first whitespace-delimited token
//! - an operation mnemonic or a `.directive`, then an operand field
//! - `;` as the first non-space character marks a comment line
//! - operands are separated by single commas; whitespace is free

use std::fmt;

/// Maximum accepted raw line length, excluding the terminator.
pub const MAX_LINE_LEN: usize = 80;

/// Maximum identifier (label / macro name) length.
pub const MAX_LABEL_LEN: usize = 31;

/// Operation mnemonics, indexed by opcode value.
pub const MNEMONICS: [&str; 16] = [
    "mov", "cmp", "add", "sub", "lea", "clr", "not", "inc", "dec", "jmp", "bne", "red", "prn",
    "jsr", "rts", "stop",
];

/// Assembler directives.
pub const DIRECTIVES: [&str; 4] = [".data", ".string", ".entry", ".extern"];

/// Register names.
pub const REGISTERS: [&str; 8] = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7"];

// ---------------------------------------------------------------------------
//  Source line parsing
// ---------------------------------------------------------------------------

/// A parsed logical source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    /// A full-line comment (`;` as the first non-space character).
    Comment,
    /// A blank line.
    Blank,
    /// A statement line with optional label, operation, and operand field.
    Statement(Statement),
}

/// A parsed statement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Label (without the trailing `:`), if present. Not validated here.
    pub label: Option<String>,
    /// Operation mnemonic or directive. Empty for a label-only line.
    pub op: String,
    /// Raw operand field (everything after the operation, trimmed).
    pub operands: String,
}

/// Parse a single raw source line into a `SourceLine`.
///
/// Label syntax is split off but the label name is not validated; name
/// rules depend on the macro table and are enforced by the passes.
pub fn parse_line(raw: &str) -> Result<SourceLine, LexError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(SourceLine::Blank);
    }
    if trimmed.starts_with(';') {
        return Ok(SourceLine::Comment);
    }

    let mut rest = raw.trim_start();
    let first_end = rest
        .find(char::is_whitespace)
        .unwrap_or(rest.len());
    let first = &rest[..first_end];

    let label = if let Some(name) = first.strip_suffix(':') {
        if name.is_empty() {
            return Err(LexError::EmptyLabel);
        }
        rest = rest[first_end..].trim_start();
        Some(name.to_string())
    } else {
        // A colon detached from the first word is a malformed label.
        if rest[first_end..].trim_start().starts_with(':') {
            return Err(LexError::DetachedLabelColon);
        }
        None
    };

    if rest.is_empty() {
        return Ok(SourceLine::Statement(Statement {
            label,
            op: String::new(),
            operands: String::new(),
        }));
    }

    let op_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let op = rest[..op_end].to_string();
    let operands = rest[op_end..].trim().to_string();

    Ok(SourceLine::Statement(Statement { label, op, operands }))
}

// ---------------------------------------------------------------------------
//  Operand field splitting
// ---------------------------------------------------------------------------

/// Split a comma-separated operand field into individual operand tokens.
///
/// Comma discipline: commas separate operands; they may not open or close
/// the list, appear twice in a row, or be missing between two operands.
pub fn split_operands(field: &str) -> Result<Vec<String>, LexError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(Vec::new());
    }
    if field.starts_with(',') {
        return Err(LexError::LeadingComma);
    }
    if field.ends_with(',') {
        return Err(LexError::TrailingComma);
    }

    let mut operands = Vec::new();
    for segment in field.split(',') {
        let token = segment.trim();
        if token.is_empty() {
            return Err(LexError::ConsecutiveCommas);
        }
        if token.split_whitespace().count() > 1 {
            return Err(LexError::MissingComma);
        }
        operands.push(token.to_string());
    }
    Ok(operands)
}

/// Parse a `.data` operand field into its integer values.
pub fn parse_data_list(field: &str) -> Result<Vec<i32>, LexError> {
    let items = split_operands(field)?;
    if items.is_empty() {
        return Err(LexError::EmptyDataList);
    }
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let value = item
            .parse::<i32>()
            .map_err(|_| LexError::BadNumber(item.clone()))?;
        values.push(value);
    }
    Ok(values)
}

/// Parse a `.string` operand field into its character payload.
///
/// The field must hold exactly one non-empty double-quoted literal and
/// nothing else.
pub fn parse_string_literal(field: &str) -> Result<String, LexError> {
    let field = field.trim();
    if field.chars().filter(|&c| c == '"').count() != 2 || !field.starts_with('"') {
        return Err(LexError::UnterminatedString);
    }
    let closing = field[1..]
        .find('"')
        .map(|i| i + 1)
        .ok_or(LexError::UnterminatedString)?;
    let payload = &field[1..closing];
    if payload.is_empty() {
        return Err(LexError::EmptyString);
    }
    if !field[closing + 1..].trim().is_empty() {
        return Err(LexError::TrailingAfterString);
    }
    Ok(payload.to_string())
}

// ---------------------------------------------------------------------------
//  Token classification
// ---------------------------------------------------------------------------

/// Assembler directive opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `.data` — append integers to the data image.
    Data,
    /// `.string` — append a zero-terminated character sequence.
    String,
    /// `.entry` — mark a defined symbol as an entry point.
    Entry,
    /// `.extern` — declare a symbol defined in another file.
    Extern,
}

impl Directive {
    /// Classify a token as a directive.
    pub fn from_name(token: &str) -> Option<Self> {
        match token {
            ".data" => Some(Directive::Data),
            ".string" => Some(Directive::String),
            ".entry" => Some(Directive::Entry),
            ".extern" => Some(Directive::Extern),
            _ => None,
        }
    }

    /// The source spelling of the directive.
    pub fn name(self) -> &'static str {
        match self {
            Directive::Data => ".data",
            Directive::String => ".string",
            Directive::Entry => ".entry",
            Directive::Extern => ".extern",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns `true` if the token has identifier shape: a leading ASCII
/// letter followed by letters and digits.
pub fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// Returns `true` if the token is a mnemonic, directive, or register name.
pub fn is_reserved(token: &str) -> bool {
    MNEMONICS.contains(&token) || DIRECTIVES.contains(&token) || REGISTERS.contains(&token)
}

/// Parse a register name (`r0`..`r7`) into its number.
pub fn parse_register(token: &str) -> Option<u8> {
    REGISTERS
        .iter()
        .position(|&r| r == token)
        .map(|n| n as u8)
}

// ---------------------------------------------------------------------------
//  Error types
// ---------------------------------------------------------------------------

/// Lexer error for a single logical line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("line exceeds the limit of {MAX_LINE_LEN} characters")]
    LineTooLong,
    #[error("':' with no label name before it")]
    EmptyLabel,
    #[error("label is separated from its ':'")]
    DetachedLabelColon,
    #[error("',' before the first operand")]
    LeadingComma,
    #[error("',' after the last operand")]
    TrailingComma,
    #[error("two consecutive ','")]
    ConsecutiveCommas,
    #[error("missing ',' between operands")]
    MissingComma,
    #[error("string literal is not properly quoted")]
    UnterminatedString,
    #[error("string literal is empty")]
    EmptyString,
    #[error("unexpected text after the closing '\"'")]
    TrailingAfterString,
    #[error("'{0}' is not a valid number")]
    BadNumber(String),
    #[error("no values after '.data'")]
    EmptyDataList,
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
