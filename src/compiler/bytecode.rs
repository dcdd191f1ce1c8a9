//! The stack machine's command set and its byte encoding.
//!
//! Every command is one byte. `PUSH`, `STORE` and `LOAD` are followed by one operand byte,
//! an interned variable (`PUSH`) or identifier (`STORE`, `LOAD`) code.
use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    Pop = 0,
    Push = 1,
    Store = 2,
    Load = 3,
    Func = 4,
    Apply = 5,
    Eval = 6,
    Print = 7,
}

impl Command {
    pub fn has_operand(self) -> bool {
        matches!(self, Self::Push | Self::Store | Self::Load)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pop => "POP",
            Self::Push => "PUSH",
            Self::Store => "STORE",
            Self::Load => "LOAD",
            Self::Func => "FUNC",
            Self::Apply => "APPLY",
            Self::Eval => "EVAL",
            Self::Print => "PRINT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown command byte {byte:#04x} at offset {offset}")]
    UnknownCommand { offset: usize, byte: u8 },
    #[error("`{command}` at offset {offset} is missing its operand")]
    MissingOperand { offset: usize, command: Command },
}

/// One command read back out of a bytecode stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub offset: usize,
    pub command: Command,
    pub operand: Option<u8>,
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Some(operand) => write!(f, "{} {operand}", self.command),
            None => write!(f, "{}", self.command),
        }
    }
}

/// Walks a bytecode stream command by command. Stops after the first error.
pub struct Decoder<'a> {
    bytecode: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            offset: 0,
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Decoded, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let &byte = self.bytecode.get(offset)?;
        // an error ends the stream
        self.offset = self.bytecode.len();

        let Ok(command) = Command::try_from(byte) else {
            return Some(Err(DecodeError::UnknownCommand { offset, byte }));
        };
        let operand = if command.has_operand() {
            match self.bytecode.get(offset + 1) {
                Some(&operand) => Some(operand),
                None => return Some(Err(DecodeError::MissingOperand { offset, command })),
            }
        } else {
            None
        };
        self.offset = offset + 1 + usize::from(operand.is_some());
        Some(Ok(Decoded {
            offset,
            command,
            operand,
        }))
    }
}

pub fn decode(bytecode: &[u8]) -> Result<Vec<Decoded>, DecodeError> {
    Decoder::new(bytecode).collect()
}
