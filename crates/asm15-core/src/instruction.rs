//! Instruction catalog, addressing modes, and word encoding.
//!
//! Instruction words place the opcode at bits 11-14, the source addressing
//! mode as a one-hot in bits 7-10, and the target addressing mode as a
//! one-hot in bits 3-6. Each operand takes one extra word, except that two
//! register-mode operands share a single word (source register at bits 6-8,
//! target register at bits 3-5).

use std::collections::HashMap;

use crate::image::Word;
use crate::lexer;

/// Largest immediate operand value (12-bit payload, bits 3-14).
pub const IMMEDIATE_MAX: i32 = 4095;
/// Smallest immediate operand value.
pub const IMMEDIATE_MIN: i32 = -4095;

// ---------------------------------------------------------------------------
//  Addressing modes
// ---------------------------------------------------------------------------

/// Operand addressing modes, numbered as encoded in the one-hot fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Mode 0 — `#<signed-integer>`.
    Immediate,
    /// Mode 1 — an identifier resolved through the symbol table.
    Direct,
    /// Mode 2 — `*rN`.
    RegisterIndirect,
    /// Mode 3 — `rN`.
    Register,
}

impl AddrMode {
    /// The mode number (0-3).
    pub fn index(self) -> u16 {
        match self {
            AddrMode::Immediate => 0,
            AddrMode::Direct => 1,
            AddrMode::RegisterIndirect => 2,
            AddrMode::Register => 3,
        }
    }

    /// Whether the operand lives in a register (modes 2 and 3).
    pub fn is_register(self) -> bool {
        matches!(self, AddrMode::RegisterIndirect | AddrMode::Register)
    }
}

/// A classified operand token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `#n`
    Immediate(i32),
    /// A symbol reference.
    Direct(String),
    /// `*rN`
    RegisterIndirect(u8),
    /// `rN`
    Register(u8),
}

impl Operand {
    /// Classify a single operand token.
    ///
    /// An identifier-shaped token becomes [`Operand::Direct`] whether or
    /// not the symbol is defined yet; resolution happens in pass two.
    pub fn parse(token: &str) -> Result<Self, EncodeError> {
        if let Some(rest) = token.strip_prefix('#') {
            let value = rest
                .parse::<i32>()
                .map_err(|_| EncodeError::BadImmediate(token.to_string()))?;
            if !(IMMEDIATE_MIN..=IMMEDIATE_MAX).contains(&value) {
                return Err(EncodeError::ImmediateRange(value));
            }
            return Ok(Operand::Immediate(value));
        }
        if let Some(rest) = token.strip_prefix('*') {
            return match lexer::parse_register(rest) {
                Some(n) => Ok(Operand::RegisterIndirect(n)),
                None => Err(EncodeError::BadRegister(token.to_string())),
            };
        }
        if let Some(n) = lexer::parse_register(token) {
            return Ok(Operand::Register(n));
        }
        if lexer::is_identifier(token) {
            return Ok(Operand::Direct(token.to_string()));
        }
        Err(EncodeError::BadOperand(token.to_string()))
    }

    /// The operand's addressing mode.
    pub fn mode(&self) -> AddrMode {
        match self {
            Operand::Immediate(_) => AddrMode::Immediate,
            Operand::Direct(_) => AddrMode::Direct,
            Operand::RegisterIndirect(_) => AddrMode::RegisterIndirect,
            Operand::Register(_) => AddrMode::Register,
        }
    }
}

// ---------------------------------------------------------------------------
//  Encoding error
// ---------------------------------------------------------------------------

/// Error while classifying or encoding an instruction line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("unknown operation '{0}'")]
    UnknownMnemonic(String),
    #[error("'{mnemonic}' expects {expected} operand(s), found {found}")]
    ArityMismatch {
        mnemonic: String,
        expected: usize,
        found: usize,
    },
    #[error("the addressing mode of '{operand}' is not allowed for '{mnemonic}'")]
    IllegalMode { mnemonic: String, operand: String },
    #[error("immediate value {0} is out of range")]
    ImmediateRange(i32),
    #[error("'{0}' is not a valid register")]
    BadRegister(String),
    #[error("'{0}' is not a valid immediate value")]
    BadImmediate(String),
    #[error("'{0}' is not a valid operand")]
    BadOperand(String),
}

// ---------------------------------------------------------------------------
//  Instruction catalog
// ---------------------------------------------------------------------------

/// Definition of one machine instruction.
#[derive(Debug, Clone)]
pub struct InsnDef {
    /// Mnemonic.
    pub mnemonic: String,
    /// Opcode value (0-15), encoded at bits 11-14.
    pub opcode: u16,
    /// Number of operands (0-2).
    pub operands: usize,
    /// Permitted source addressing modes (empty unless two operands).
    pub source_modes: &'static [AddrMode],
    /// Permitted target addressing modes (empty for no operands).
    pub target_modes: &'static [AddrMode],
}

const ANY: &[AddrMode] = &[
    AddrMode::Immediate,
    AddrMode::Direct,
    AddrMode::RegisterIndirect,
    AddrMode::Register,
];
const WRITABLE: &[AddrMode] = &[AddrMode::Direct, AddrMode::RegisterIndirect, AddrMode::Register];
const DIRECT_ONLY: &[AddrMode] = &[AddrMode::Direct];
const JUMP: &[AddrMode] = &[AddrMode::Direct, AddrMode::RegisterIndirect];
const NONE: &[AddrMode] = &[];

/// The instruction catalog holds definitions for all 16 mnemonics.
#[derive(Debug)]
pub struct InsnCatalog {
    instructions: HashMap<String, InsnDef>,
}

impl Default for InsnCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InsnCatalog {
    /// Build the catalog.
    pub fn new() -> Self {
        let mut catalog = Self {
            instructions: HashMap::new(),
        };
        catalog.register_two_operand_instructions();
        catalog.register_one_operand_instructions();
        catalog.register_zero_operand_instructions();
        catalog
    }

    fn add(
        &mut self,
        mnemonic: &str,
        opcode: u16,
        operands: usize,
        source_modes: &'static [AddrMode],
        target_modes: &'static [AddrMode],
    ) {
        self.instructions.insert(
            mnemonic.to_string(),
            InsnDef {
                mnemonic: mnemonic.to_string(),
                opcode,
                operands,
                source_modes,
                target_modes,
            },
        );
    }

    // -- opcodes 0-4 (two operands) ---------------------------------------
    fn register_two_operand_instructions(&mut self) {
        self.add("mov", 0, 2, ANY, WRITABLE);
        self.add("cmp", 1, 2, ANY, ANY);
        self.add("add", 2, 2, ANY, WRITABLE);
        self.add("sub", 3, 2, ANY, WRITABLE);
        self.add("lea", 4, 2, DIRECT_ONLY, WRITABLE);
    }

    // -- opcodes 5-13 (one operand) ---------------------------------------
    fn register_one_operand_instructions(&mut self) {
        self.add("clr", 5, 1, NONE, WRITABLE);
        self.add("not", 6, 1, NONE, WRITABLE);
        self.add("inc", 7, 1, NONE, WRITABLE);
        self.add("dec", 8, 1, NONE, WRITABLE);
        self.add("jmp", 9, 1, NONE, JUMP);
        self.add("bne", 10, 1, NONE, JUMP);
        self.add("red", 11, 1, NONE, WRITABLE);
        self.add("prn", 12, 1, NONE, ANY);
        self.add("jsr", 13, 1, NONE, JUMP);
    }

    // -- opcodes 14-15 (no operands) --------------------------------------
    fn register_zero_operand_instructions(&mut self) {
        self.add("rts", 14, 0, NONE, NONE);
        self.add("stop", 15, 0, NONE, NONE);
    }

    /// Look up a mnemonic.
    pub fn lookup(&self, mnemonic: &str) -> Option<&InsnDef> {
        self.instructions.get(mnemonic)
    }
}

// ---------------------------------------------------------------------------
//  Word encoding
// ---------------------------------------------------------------------------

/// Encode the info word of an instruction: `A=1`, opcode at bits 11-14,
/// addressing one-hots at bits 7-10 (source) and 3-6 (target).
pub fn info_word(def: &InsnDef, source: Option<AddrMode>, target: Option<AddrMode>) -> Word {
    let mut raw = Word::ARE_A | (def.opcode << 11);
    if let Some(mode) = source {
        raw |= 1 << (7 + mode.index());
    }
    if let Some(mode) = target {
        raw |= 1 << (3 + mode.index());
    }
    Word::new(raw)
}

/// Encode an immediate operand word: `A=1`, the value at bits 3-14 in
/// 12-bit two's complement.
pub fn immediate_word(value: i32) -> Word {
    let payload = (value as u16) & 0x0FFF;
    Word::new(Word::ARE_A | (payload << 3))
}

/// Encode a register operand word: source register at bits 6-8, target
/// register at bits 3-5, `A=1`. Covers both the standalone and the shared
/// two-register form.
pub fn register_word(source: Option<u8>, target: Option<u8>) -> Word {
    let mut raw = Word::ARE_A;
    if let Some(n) = source {
        raw |= u16::from(n) << 6;
    }
    if let Some(n) = target {
        raw |= u16::from(n) << 3;
    }
    Word::new(raw)
}

/// Encode a resolved direct operand word: `R=1`, the symbol's address at
/// bits 3-14.
pub fn direct_word(address: u16) -> Word {
    Word::new(Word::ARE_R | (address << 3))
}

/// Encode an external direct operand word: `E=1`, payload zero.
pub fn external_word() -> Word {
    Word::new(Word::ARE_E)
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
