//! An interpreter for Bitcoin's transparent script language, together with
//! the pay-to-script-hash verification rule.
//!
//! The crate is organized around three layers:
//!
//! - [`script::Script`] — the parsed token sequence, with the byte format
//!   ([`script::Script::parse`] / [`script::Script::to_bytes`]);
//! - [`interpreter`] — evaluation of a token sequence over the data stacks,
//!   plus [`interpreter::verify_scripts`], which composes the scriptSig,
//!   scriptPubKey, and (when enabled) P2SH redeem-script runs;
//! - [`pattern`] and [`solver`] — constructors and recognizers for the
//!   standard script shapes (P2PKH, P2SH, m-of-n multisig).
//!
//! Transaction hashing stays outside the crate: signature operations reach it
//! through the [`interpreter::SignatureChecker`] collaborator.

#[macro_use]
extern crate enum_primitive;

pub mod external;
pub mod interpreter;
pub mod num;
pub mod op;
pub mod opcode;
pub mod pattern;
pub mod pv;
pub mod script;
pub mod signature;
pub mod solver;

pub use interpreter::{eval_script, verify_scripts};
pub use script::Script;

/// Script opcodes that have a defined meaning.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Opcode {
    /// Opcodes that represent constants to be pushed onto the stack.
    PushValue(opcode::PushValue),
    /// - always evaluated
    /// - maintains the conditional-branch stack
    Control(opcode::Control),
    /// - only evaluated on an active branch
    Operation(opcode::Operation),
}

impl From<opcode::PushValue> for Opcode {
    fn from(value: opcode::PushValue) -> Self {
        Opcode::PushValue(value)
    }
}

impl From<opcode::Control> for Opcode {
    fn from(value: opcode::Control) -> Self {
        Opcode::Control(value)
    }
}

impl From<opcode::Operation> for Opcode {
    fn from(value: opcode::Operation) -> Self {
        Opcode::Operation(value)
    }
}

impl From<&Opcode> for Vec<u8> {
    fn from(value: &Opcode) -> Self {
        match value {
            Opcode::PushValue(v) => v.into(),
            Opcode::Control(v) => vec![(*v).into()],
            Opcode::Operation(v) => vec![(*v).into()],
        }
    }
}
