//! Execution of opcodes.

use std::cmp::{max, min};
use std::slice::Iter;

use ripemd::Ripemd160;
use secp256k1::ecdsa;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    external::pubkey::PubKey,
    num,
    opcode::{Bad, Control, Operation, Operation::*, PossiblyBad, PushValue},
    script::{self, Script, MAX_SCRIPT_ELEMENT_SIZE},
    signature::{self, HashType},
    Opcode,
};

/// The maximum number of elements allowed in the _combined_ stack and altstack.
pub const MAX_STACK_DEPTH: usize = 1000;

/// The maximum number of pubkeys (and signatures, by implication) allowed in CHECKMULTISIG.
pub const MAX_PUBKEY_COUNT: u8 = 20;

/// Any error that can happen while evaluating a script.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    // Failed verify operations
    #[error("verify operation failed")]
    Verify,

    #[error("equal verify operation failed")]
    EqualVerify,

    #[error("number equal verify operation failed")]
    NumEqualVerify,

    #[error("check signature verify operation failed")]
    CheckSigVerify,

    #[error("check multisig verify operation failed")]
    CheckMultisigVerify,

    // Logical/Format/Canonical errors
    #[error("bad opcode encountered")]
    BadOpcode,

    #[error("disabled opcode encountered")]
    DisabledOpcode,

    #[error("invalid stack operation encountered")]
    InvalidStackOperation,

    #[error("invalid altstack operation encountered")]
    InvalidAltstackOperation,

    #[error("unbalanced conditional encountered")]
    UnbalancedConditional,

    // Max sizes
    #[error("push size exceeded maximum of {} bytes", MAX_SCRIPT_ELEMENT_SIZE)]
    PushSize,

    #[error("stack depth exceeded maximum of {} entries", MAX_STACK_DEPTH)]
    StackSize,

    #[error("signature count was negative or exceeded the public key count")]
    SigCount,

    #[error("public key count wasn't in the range 0..={}", MAX_PUBKEY_COUNT)]
    PubKeyCount,

    // BIP62
    #[error("non-minimal data encountered when minimal data required")]
    MinimalData,

    #[error("signature null dummy error")]
    SigNullDummy,

    #[error("public key type error")]
    PubKeyType,

    // softfork safeness
    #[error("discouraged upgradable NOP encountered")]
    DiscourageUpgradableNOPs,

    #[error("signature encoding error: {0}")]
    SignatureEncoding(#[from] signature::Error),

    #[error("script number error: {0}")]
    Num(#[from] num::Error),
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    /// Script verification flags
    pub struct Flags: u32 {
        /// Evaluate P2SH subscripts (softfork safe,
        /// [BIP16](https://github.com/bitcoin/bips/blob/master/bip-0016.mediawiki)).
        const P2SH = 1 << 0;

        /// Passing a non-strict-DER signature or one with an undefined hashtype to a checksig
        /// operation makes the signature fail.
        /// Evaluating a pubkey that is not (0x04 + 64 bytes) or (0x02 or 0x03 + 32 bytes) by
        /// checksig causes script failure.
        /// (softfork safe, but not used or intended as a consensus rule).
        const StrictEnc = 1 << 1;

        /// Passing a non-strict-DER signature to a checksig operation makes the signature fail
        /// (softfork safe, [BIP66](https://github.com/bitcoin/bips/blob/master/bip-0066.mediawiki)).
        const DerSig = 1 << 2;

        /// Passing a non-strict-DER signature or one with S > order/2 to a checksig operation
        /// makes the signature fail
        /// (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 5).
        const LowS = 1 << 3;

        /// Verify dummy stack item consumed by CHECKMULTISIG is of zero-length
        /// (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 7).
        const NullDummy = 1 << 4;

        /// Using a non-push operator in the scriptSig causes script failure
        /// (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 2).
        const SigPushOnly = 1 << 5;

        /// Require minimal encodings for all push operations (OP_0... OP_16, OP_1NEGATE where
        /// possible, direct pushes up to 75 bytes, OP_PUSHDATA1 up to 255 bytes, OP_PUSHDATA2 for
        /// anything larger). Evaluating any other push causes the script to fail
        /// ([BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 3).
        /// In addition, whenever a stack element is interpreted as a number, it must be of
        /// minimal length ([BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 4).
        /// (softfork safe)
        const MinimalData = 1 << 6;

        /// Discourage use of NOPs reserved for upgrades (NOP1-10)
        ///
        /// Provided so that nodes can avoid accepting or mining transactions containing executed
        /// NOPs whose meaning may change after a soft-fork, thus rendering the script invalid;
        /// with this flag set executing discouraged NOPs fails the script. This verification flag
        /// will never be a mandatory flag applied to scripts in a block. NOPs that are not
        /// executed, e.g. within an unexecuted IF ENDIF block, are *not* rejected.
        const DiscourageUpgradableNOPs = 1 << 7;
    }
}

/// This verifies that a signature is correct for the given pubkey and script code.
pub trait SignatureChecker {
    /// Check that the signature is valid for the digest the transaction context produces.
    fn check_sig(&self, _vch_sig: &[u8], _vch_pub_key: &[u8], _script_code: &[u8]) -> bool {
        false
    }
}

/// A signature checker that always fails. This is helpful in testing cases that don’t involve
/// `CHECK*SIG`.
pub struct BaseSignatureChecker();

impl SignatureChecker for BaseSignatureChecker {}

/// All signature hashes are 32 bytes (SHA-256 outputs).
pub const SIGHASH_SIZE: usize = 32;

/// A function which is called to obtain the sighash.
///    - script_code: the serialized script being validated. Note that this does not always match
///      the script pubkey; for P2SH it is the redeem script.
///    - hash_type: the hash type being used.
///
/// Returning `None` indicates _some_ failure to produce the desired hash.
pub type SighashCalculator<'a> = &'a dyn Fn(&[u8], &HashType) -> Option<[u8; SIGHASH_SIZE]>;

/// A signature checker that closes over the transaction context
/// `(tx, input_index, previous_output_script)` via a sighash callback.
#[derive(Copy, Clone)]
pub struct CallbackTransactionSignatureChecker<'a> {
    /// The callback to be used to calculate the sighash.
    pub sighash: SighashCalculator<'a>,
}

impl SignatureChecker for CallbackTransactionSignatureChecker<'_> {
    fn check_sig(&self, vch_sig_in: &[u8], vch_pub_key: &[u8], script_code: &[u8]) -> bool {
        let pubkey = PubKey(vch_pub_key);
        if !pubkey.is_valid() {
            return false;
        };

        // Hash type is one byte tacked on to the end of the signature
        match vch_sig_in.split_last() {
            None => false,
            Some((hash_type, vch_sig)) => HashType::from_bits(*hash_type, false)
                .and_then(|hash_type| (self.sighash)(script_code, &hash_type))
                .zip(ecdsa::Signature::from_der(vch_sig).ok())
                .map(|(sighash, sig)| pubkey.verify(&sighash, &sig))
                .unwrap_or(false),
        }
    }
}

/// Treat a stack entry as a generalized boolean. Anything other than 0 and -0 (minimal encoding
/// not required) is treated as `true`.
pub fn cast_to_bool(vch: &[u8]) -> bool {
    for i in 0..vch.len() {
        if vch[i] != 0 {
            // Can be negative zero
            if i == vch.len() - 1 && vch[i] == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

fn cast_from_bool(b: bool) -> Vec<u8> {
    static VCH_FALSE: [u8; 0] = [];
    static VCH_TRUE: [u8; 1] = [1];
    if b {
        VCH_TRUE.to_vec()
    } else {
        VCH_FALSE.to_vec()
    }
}

/// Script is a stack machine (like Forth) that evaluates a predicate returning a bool indicating
/// valid or not. There are no loops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack<T>(Vec<T>);

/// Wraps a `Vec` in a way that keeps indexing relative to the top of the stack and provides some
/// decent chaining.
impl<T> Stack<T> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Stack(vec![])
    }

    /// Fail if the stack doesn’t contain at least `min` elements.
    pub(crate) fn check_len(&self, min: usize) -> Result<(), Error> {
        if min <= self.0.len() {
            Ok(())
        } else {
            Err(Error::InvalidStackOperation)
        }
    }

    fn rindex(&self, i: usize) -> Result<usize, Error> {
        let len = self.0.len();
        if i < len {
            Ok(len - i - 1)
        } else {
            Err(Error::InvalidStackOperation)
        }
    }

    /// Gets an element from the stack without removing it, counting from the top. I.e., `rget(0)`
    /// returns the top element.
    pub fn rget(&self, i: usize) -> Result<&T, Error> {
        let idx = self.rindex(i)?;
        self.0.get(idx).ok_or(Error::InvalidStackOperation)
    }

    /// Removes and returns the top element from the stack.
    pub fn pop(&mut self) -> Result<T, Error> {
        self.0.pop().ok_or(Error::InvalidStackOperation)
    }

    /// Adds a new element to the top of the stack.
    pub fn push(&mut self, value: T) {
        self.0.push(value)
    }

    /// Returns the number of elements in the stack.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true iff the stack holds no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator from the bottom to the top of the stack.
    pub fn iter(&self) -> Iter<'_, T> {
        self.0.iter()
    }

    /// Returns a mutable reference to the top element of the stack.
    pub(crate) fn last_mut(&mut self) -> Result<&mut T, Error> {
        self.0.last_mut().ok_or(Error::InvalidStackOperation)
    }

    /// Returns a reference to the top element of the stack.
    pub fn last(&self) -> Result<&T, Error> {
        self.0.last().ok_or(Error::InvalidStackOperation)
    }

    /// Removes an element from the stack, counting from the top.
    pub(crate) fn rremove(&mut self, i: usize) -> Result<T, Error> {
        self.rindex(i).map(|ri| self.0.remove(ri))
    }

    /// Inserts an element at the given index, counting from the top.
    pub(crate) fn rinsert(&mut self, i: usize, element: T) -> Result<(), Error> {
        let ri = self.rindex(i)?;
        self.0.insert(ri, element);
        Ok(())
    }

    // higher-level operations

    /// Perform a unary operation on the top stack element.
    pub(crate) fn unop(&mut self, op: impl FnOnce(T) -> Result<T, Error>) -> Result<(), Error> {
        self.pop().and_then(op).map(|res| self.push(res))
    }

    /// Call a binary function on the top two stack elements.
    pub(crate) fn binfn<R>(
        &mut self,
        op: impl FnOnce(T, T) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let x2 = self.pop()?;
        let x1 = self.pop()?;
        op(x1, x2)
    }

    /// Perform a binary operation on the top two stack elements.
    pub(crate) fn binop(&mut self, op: impl FnOnce(T, T) -> Result<T, Error>) -> Result<(), Error> {
        self.binfn(op).map(|res| self.push(res))
    }
}

impl<T: Clone> Stack<T> {
    /// Returns the top element of the stack as well as the remainder of the stack.
    pub fn split_last(&self) -> Result<(&T, Stack<T>), Error> {
        self.0
            .split_last()
            .ok_or(Error::InvalidStackOperation)
            .map(|(last, rem)| (last, Stack(rem.to_vec())))
    }

    /// Copies the element at `i` (from the top) onto the top of the stack.
    pub(crate) fn repush(&mut self, i: usize) -> Result<(), Error> {
        self.rget(i).cloned().map(|v| self.push(v))
    }

    /// Moves the element at `i` (from the top) onto the top of the stack.
    pub(crate) fn move_to_top(&mut self, i: usize) -> Result<(), Error> {
        self.rremove(i).map(|v| self.push(v))
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Stack::new()
    }
}

impl<T> From<Vec<T>> for Stack<T> {
    fn from(value: Vec<T>) -> Self {
        Stack(value)
    }
}

/// This holds the various components that need to be carried between individual opcode
/// evaluations.
#[derive(Debug, PartialEq, Eq)]
pub struct State {
    /// The primary evaluation stack.
    pub(crate) stack: Stack<Vec<u8>>,
    /// A secondary stack that elements can be moved to temporarily.
    pub(crate) altstack: Stack<Vec<u8>>,
    /// This keeps track of the conditional flags at each nesting level during execution. If we're
    /// in a branch of execution where *any* of these conditionals are false, we ignore opcodes
    /// unless those opcodes direct control flow (OP_IF, OP_ELSE, etc.).
    pub(crate) vexec: Stack<bool>,
}

impl State {
    /// Creates a state with an initial stack, but other components empty.
    pub fn initial(stack: Stack<Vec<u8>>) -> Self {
        State {
            stack,
            altstack: Stack::new(),
            vexec: Stack::new(),
        }
    }
}

/// Are we in an executing branch of the script?
pub(crate) fn should_exec(vexec: &Stack<bool>) -> bool {
    vexec.iter().all(|value| *value)
}

/// The pubkey-encoding gate applied by the CHECKSIG-class operations.
pub fn check_pub_key_encoding(vch_pub_key: &[u8], flags: Flags) -> Result<(), Error> {
    if flags.contains(Flags::StrictEnc)
        && !PubKey(vch_pub_key).is_compressed_or_uncompressed()
    {
        return Err(Error::PubKeyType);
    };
    Ok(())
}

fn parse_num(v: &[u8], require_minimal: bool, max_size: Option<usize>) -> Result<i64, Error> {
    num::parse(v, require_minimal, max_size).map_err(Error::Num)
}

fn pop_num(stack: &mut Stack<Vec<u8>>, require_minimal: bool) -> Result<i64, Error> {
    stack
        .pop()
        .and_then(|v| parse_num(&v, require_minimal, None))
}

fn unop_num(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    op: impl FnOnce(i64) -> i64,
) -> Result<(), Error> {
    stack.unop(|v| parse_num(&v, require_minimal, None).map(|n| num::serialize(op(n))))
}

fn unrel(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    op: impl FnOnce(i64) -> bool,
) -> Result<(), Error> {
    stack.unop(|v| parse_num(&v, require_minimal, None).map(|n| cast_from_bool(op(n))))
}

fn binfn_num<R>(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    op: impl FnOnce(i64, i64) -> Result<R, Error>,
) -> Result<R, Error> {
    stack.binfn(|x1, x2| {
        let bn2 = parse_num(&x2, require_minimal, None)?;
        let bn1 = parse_num(&x1, require_minimal, None)?;
        op(bn1, bn2)
    })
}

fn binop_num(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    op: impl FnOnce(i64, i64) -> i64,
) -> Result<(), Error> {
    let res = binfn_num(stack, require_minimal, |x1, x2| {
        Ok(num::serialize(op(x1, x2)))
    })?;
    stack.push(res);
    Ok(())
}

fn binrel(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    op: impl FnOnce(i64, i64) -> bool,
) -> Result<(), Error> {
    let res = binfn_num(stack, require_minimal, |x1, x2| {
        Ok(cast_from_bool(op(x1, x2)))
    })?;
    stack.push(res);
    Ok(())
}

/// Run a single step of the interpreter.
///
/// This is useful for testing & debugging, as we can set up the exact state we want in order to
/// trigger some behavior.
pub fn eval_step(
    token: &PossiblyBad,
    script_code: &[u8],
    flags: Flags,
    checker: &dyn SignatureChecker,
    state: &mut State,
) -> Result<(), Error> {
    // Are we in an executing branch of the script?
    let exec = should_exec(&state.vexec);

    match token {
        // Disabled opcodes fail the script even on an inactive branch.
        PossiblyBad::Disabled(_) => return Err(Error::DisabledOpcode),

        // Coinbase data is not executable.
        PossiblyBad::CoinbaseData(_) => return Err(Error::BadOpcode),

        PossiblyBad::Bad(bad) => {
            // OP_VERIF and OP_VERNOTIF sit in the conditional range, so they fail even on an
            // inactive branch; everything else undefined only fails when evaluated.
            if matches!(bad, Bad::OP_VERIF | Bad::OP_VERNOTIF) || exec {
                return Err(Error::BadOpcode);
            }
        }

        PossiblyBad::Good(Opcode::PushValue(pv)) => {
            if let PushValue::LargeValue(lv) = pv {
                if lv.value().len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(Error::PushSize);
                }
            }
            if exec {
                if flags.contains(Flags::MinimalData) && !pv.is_minimal_push() {
                    return Err(Error::MinimalData);
                }
                state.stack.push(pv.value());
            }
        }

        PossiblyBad::Good(Opcode::Control(control)) => {
            let stack = &mut state.stack;
            let vexec = &mut state.vexec;
            match control {
                // <expression> if [statements] [else [statements]] endif
                Control::OP_IF | Control::OP_NOTIF => {
                    let mut value = false;
                    if exec {
                        let vch = stack.pop().map_err(|_| Error::UnbalancedConditional)?;
                        value = cast_to_bool(&vch);
                        if *control == Control::OP_NOTIF {
                            value = !value;
                        }
                    }
                    vexec.push(value);
                }

                Control::OP_ELSE => {
                    let last = vexec.last_mut().map_err(|_| Error::UnbalancedConditional)?;
                    *last = !*last;
                }

                Control::OP_ENDIF => {
                    vexec.pop().map_err(|_| Error::UnbalancedConditional)?;
                }
            }
        }

        PossiblyBad::Good(Opcode::Operation(op)) => {
            if exec {
                eval_operation(*op, script_code, flags, checker, state)?;
            }
        }
    }

    // Size limits
    if state.stack.len() + state.altstack.len() > MAX_STACK_DEPTH {
        return Err(Error::StackSize);
    }

    Ok(())
}

fn eval_operation(
    op: Operation,
    script_code: &[u8],
    flags: Flags,
    checker: &dyn SignatureChecker,
    state: &mut State,
) -> Result<(), Error> {
    let require_minimal = flags.contains(Flags::MinimalData);
    let stack = &mut state.stack;

    match op {
        //
        // Control
        //
        OP_NOP => Ok(()),

        OP_NOP1 | OP_NOP2 | OP_NOP3 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8
        | OP_NOP9 | OP_NOP10 => {
            // Do nothing, though if the caller wants to prevent people from using these NOPs (as
            // part of a standard tx rule, for example) they can enable
            // `DiscourageUpgradableNOPs` to turn these opcodes into errors.
            if flags.contains(Flags::DiscourageUpgradableNOPs) {
                Err(Error::DiscourageUpgradableNOPs)
            } else {
                Ok(())
            }
        }

        // (true -- ) or
        // (false -- false) and return
        OP_VERIFY => stack.pop().and_then(|v| {
            if cast_to_bool(&v) {
                Ok(())
            } else {
                Err(Error::Verify)
            }
        }),

        //
        // Stack ops
        //
        OP_TOALTSTACK => {
            let v = stack.pop()?;
            state.altstack.push(v);
            Ok(())
        }

        OP_FROMALTSTACK => {
            let v = state
                .altstack
                .pop()
                .map_err(|_| Error::InvalidAltstackOperation)?;
            stack.push(v);
            Ok(())
        }

        // (x1 x2 -- )
        OP_2DROP => {
            stack.binfn(|_, _| Ok(()))
        }

        // (x1 x2 -- x1 x2 x1 x2)
        OP_2DUP => {
            stack.check_len(2)?;
            stack.repush(1)?;
            stack.repush(1)
        }

        // (x1 x2 x3 -- x1 x2 x3 x1 x2 x3)
        OP_3DUP => {
            stack.check_len(3)?;
            stack.repush(2)?;
            stack.repush(2)?;
            stack.repush(2)
        }

        // (x1 x2 x3 x4 -- x1 x2 x3 x4 x1 x2)
        OP_2OVER => {
            stack.check_len(4)?;
            stack.repush(3)?;
            stack.repush(3)
        }

        // (x1 x2 x3 x4 x5 x6 -- x3 x4 x5 x6 x1 x2)
        OP_2ROT => {
            stack.check_len(6)?;
            stack.move_to_top(5)?;
            stack.move_to_top(5)
        }

        // (x1 x2 x3 x4 -- x3 x4 x1 x2)
        OP_2SWAP => {
            stack.check_len(4)?;
            stack.move_to_top(3)?;
            stack.move_to_top(3)
        }

        // (x - 0 | x x)
        OP_IFDUP => {
            let vch = stack.rget(0)?.clone();
            if cast_to_bool(&vch) {
                stack.push(vch);
            }
            Ok(())
        }

        // ( -- stacksize)
        OP_DEPTH => {
            let depth = i64::try_from(stack.len()).map_err(|_| Error::StackSize)?;
            stack.push(num::serialize(depth));
            Ok(())
        }

        // (x -- )
        OP_DROP => stack.pop().map(|_| ()),

        // (x -- x x)
        OP_DUP => stack.repush(0),

        // (x1 x2 -- x2)
        OP_NIP => stack.rremove(1).map(|_| ()),

        // (x1 x2 -- x1 x2 x1)
        OP_OVER => stack.repush(1),

        // (xn ... x2 x1 x0 n -- xn ... x2 x1 x0 xn)
        // (xn ... x2 x1 x0 n -- ... x2 x1 x0 xn)
        OP_PICK | OP_ROLL => {
            stack.check_len(2)?;
            let n = pop_num(stack, require_minimal)
                .and_then(|n| usize::try_from(n).map_err(|_| Error::InvalidStackOperation))?;
            if op == OP_ROLL {
                stack.move_to_top(n)
            } else {
                stack.repush(n)
            }
        }

        // (x1 x2 x3 -- x2 x3 x1)
        OP_ROT => {
            stack.check_len(3)?;
            stack.move_to_top(2)
        }

        // (x1 x2 -- x2 x1)
        OP_SWAP => {
            stack.check_len(2)?;
            stack.move_to_top(1)
        }

        // (x1 x2 -- x2 x1 x2)
        OP_TUCK => {
            let vch = stack.rget(0)?.clone();
            stack.rinsert(1, vch)
        }

        // (in -- in size)
        OP_SIZE => {
            let size = i64::try_from(stack.rget(0)?.len())
                .expect("element size is capped well below i64::MAX");
            stack.push(num::serialize(size));
            Ok(())
        }

        //
        // Bitwise logic
        //
        // (x1 x2 -- bool)
        OP_EQUAL => stack.binop(|x1, x2| Ok(cast_from_bool(x1 == x2))),

        // (x1 x2 -- )
        OP_EQUALVERIFY => stack.binfn(|x1, x2| {
            if x1 == x2 {
                Ok(())
            } else {
                Err(Error::EqualVerify)
            }
        }),

        //
        // Numeric
        //

        // (in -- out)
        OP_1ADD => unop_num(stack, require_minimal, |x| x + 1),
        OP_1SUB => unop_num(stack, require_minimal, |x| x - 1),
        OP_NEGATE => unop_num(stack, require_minimal, |x| -x),
        OP_ABS => unop_num(stack, require_minimal, i64::abs),
        OP_NOT => unrel(stack, require_minimal, |x| x == 0),
        OP_0NOTEQUAL => unrel(stack, require_minimal, |x| x != 0),

        // (x1 x2 -- out)
        OP_ADD => binop_num(stack, require_minimal, |x1, x2| x1 + x2),
        // (x1 x2 -- x2-x1)
        OP_SUB => binop_num(stack, require_minimal, |x1, x2| x2 - x1),
        OP_BOOLAND => binrel(stack, require_minimal, |x1, x2| x1 != 0 && x2 != 0),
        OP_BOOLOR => binrel(stack, require_minimal, |x1, x2| x1 != 0 || x2 != 0),
        OP_NUMEQUAL => binrel(stack, require_minimal, |x1, x2| x1 == x2),
        OP_NUMEQUALVERIFY => binfn_num(stack, require_minimal, |x1, x2| {
            if x1 == x2 {
                Ok(())
            } else {
                Err(Error::NumEqualVerify)
            }
        }),
        OP_NUMNOTEQUAL => binrel(stack, require_minimal, |x1, x2| x1 != x2),
        OP_LESSTHAN => binrel(stack, require_minimal, |x1, x2| x1 < x2),
        OP_GREATERTHAN => binrel(stack, require_minimal, |x1, x2| x1 > x2),
        OP_LESSTHANOREQUAL => binrel(stack, require_minimal, |x1, x2| x1 <= x2),
        OP_GREATERTHANOREQUAL => binrel(stack, require_minimal, |x1, x2| x1 >= x2),
        OP_MIN => binop_num(stack, require_minimal, min),
        OP_MAX => binop_num(stack, require_minimal, max),

        // (n min max -- out)
        OP_WITHIN => {
            // Decode in stack order, bottom operand first.
            let x = stack
                .rremove(2)
                .and_then(|v| parse_num(&v, require_minimal, None))?;
            let lower = stack
                .rremove(1)
                .and_then(|v| parse_num(&v, require_minimal, None))?;
            let upper = pop_num(stack, require_minimal)?;
            stack.push(cast_from_bool(lower <= x && x < upper));
            Ok(())
        }

        //
        // Crypto
        //

        // (in -- hash)
        OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
            let vch = stack.pop()?;
            let vch_hash = match op {
                OP_RIPEMD160 => Ripemd160::digest(&vch).to_vec(),
                OP_SHA1 => Sha1::digest(&vch).to_vec(),
                OP_SHA256 => Sha256::digest(&vch).to_vec(),
                OP_HASH160 => Ripemd160::digest(Sha256::digest(&vch)).to_vec(),
                OP_HASH256 => Sha256::digest(Sha256::digest(&vch)).to_vec(),
                _ => unreachable!("outer match arm covers exactly the hash operations"),
            };
            stack.push(vch_hash);
            Ok(())
        }

        OP_CODESEPARATOR => {
            // The script-splicing effect on the signing hash is not modeled; the checker always
            // receives the whole serialized script.
            Ok(())
        }

        // (sig pubkey -- bool)
        OP_CHECKSIG | OP_CHECKSIGVERIFY => {
            let vch_pub_key = stack.pop()?;
            let vch_sig = stack.pop()?;

            // An encoding failure here yields a false result; CHECKMULTISIG aborts instead.
            let success = signature::check_encoding(&vch_sig, flags).is_ok()
                && check_pub_key_encoding(&vch_pub_key, flags).is_ok()
                && checker.check_sig(&vch_sig, &vch_pub_key, script_code);

            stack.push(cast_from_bool(success));
            if op == OP_CHECKSIGVERIFY {
                if success {
                    stack.pop()?;
                } else {
                    return Err(Error::CheckSigVerify);
                }
            }
            Ok(())
        }

        // ([sig ...] num_of_signatures [pubkey ...] num_of_pubkeys -- bool)
        OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
            let mut keys_count = pop_num(stack, require_minimal)
                .and_then(|n| u8::try_from(n).map_err(|_| Error::PubKeyCount))?;
            if keys_count > MAX_PUBKEY_COUNT {
                return Err(Error::PubKeyCount);
            }

            // NB: The cursors are u8-safe, because we are limited to 20 keys and 20 signatures,
            //     plus a couple other fields.
            let mut i: u8 = keys_count;
            let mut ikey: u8 = 0;

            let mut sigs_count = stack
                .rget(usize::from(i))
                .and_then(|v| parse_num(v, require_minimal, None))
                .and_then(|n| u8::try_from(n).map_err(|_| Error::SigCount))?;
            if sigs_count > keys_count {
                return Err(Error::SigCount);
            }
            i += 1;
            let mut isig = i;
            i += sigs_count;
            stack.check_len(usize::from(i) + 1)?;

            let mut success = true;
            while success && sigs_count > 0 {
                let vch_sig = stack.rget(usize::from(isig))?;
                let vch_pub_key = stack.rget(usize::from(ikey))?;

                // Note how this makes the exact order of pubkey/signature evaluation
                // distinguishable by CHECKMULTISIG NOT if the STRICTENC flag is set.
                signature::check_encoding(vch_sig, flags)?;
                check_pub_key_encoding(vch_pub_key, flags)?;

                // Check signature
                let ok = checker.check_sig(vch_sig, vch_pub_key, script_code);

                if ok {
                    isig += 1;
                    sigs_count -= 1;
                }
                ikey += 1;
                keys_count -= 1;

                // If there are more signatures left than keys left, then too many signatures
                // have failed. Exit early, without checking any further signatures.
                if sigs_count > keys_count {
                    success = false;
                }
            }

            // Clean up stack of actual arguments
            for _ in 0..i {
                stack.pop()?;
            }

            // A bug causes CHECKMULTISIG to consume one extra argument whose contents were not
            // checked in any way.
            //
            // Unfortunately this is a potential source of mutability, so optionally verify it is
            // exactly equal to zero prior to removing it from the stack.
            if flags.contains(Flags::NullDummy) && !stack.rget(0)?.is_empty() {
                return Err(Error::SigNullDummy);
            }
            stack.pop()?;

            stack.push(cast_from_bool(success));
            if op == OP_CHECKMULTISIGVERIFY {
                if success {
                    stack.pop()?;
                } else {
                    return Err(Error::CheckMultisigVerify);
                }
            }
            Ok(())
        }
    }
}

/// Evaluate a script on the given initial stack.
///
/// The alt stack and the condition stack start empty; the condition stack must be empty again
/// when the last token has been evaluated.
pub fn eval_script(
    script: &Script,
    stack: Stack<Vec<u8>>,
    flags: Flags,
    checker: &dyn SignatureChecker,
) -> Result<Stack<Vec<u8>>, Error> {
    let script_code = script.to_bytes();
    let mut state = State::initial(stack);

    // Main execution loop
    for token in &script.0 {
        eval_step(token, &script_code, flags, checker, &mut state)?;
    }

    if !state.vexec.is_empty() {
        return Err(Error::UnbalancedConditional);
    }

    Ok(state.stack)
}

/// Decide whether `script_sig` authorizes spending the output guarded by `script_pub_key`.
///
/// Returns `Ok(false)` when evaluation completes but leaves a false result, and `Err` for every
/// failure along the way.
pub fn verify_scripts(
    script_sig: &[u8],
    script_pub_key: &[u8],
    flags: Flags,
    checker: &dyn SignatureChecker,
) -> Result<bool, script::Error> {
    let sig = Script::parse(script_sig)?;
    if flags.contains(Flags::SigPushOnly) && !sig.is_push_only() {
        return Err(script::Error::SigPushOnly);
    }

    let data_stack = eval_script(&sig, Stack::new(), flags, checker)?;
    let pub_key = Script::parse(script_pub_key)?;
    let pub_key_stack = eval_script(&pub_key, data_stack.clone(), flags, checker)?;
    if pub_key_stack.is_empty() || !cast_to_bool(pub_key_stack.last()?) {
        return Ok(false);
    }

    // Additional validation for spend-to-script-hash transactions:
    if flags.contains(Flags::P2SH) && pub_key.is_pay_to_script_hash() {
        // The script sig must be literals-only or validation fails.
        if !sig.is_push_only() {
            return Err(script::Error::SigPushOnly);
        }

        // The stack cannot be empty here: if it were, the P2SH `HASH160 <hash> EQUAL` pubkey
        // would have been evaluated on an empty stack and failed just above.
        let (redeem_serialized, remaining_stack) = data_stack.split_last()?;
        let redeem = Script::parse(redeem_serialized)?;
        let redeem_stack = eval_script(&redeem, remaining_stack, flags, checker)?;
        return Ok(!redeem_stack.is_empty() && cast_to_bool(redeem_stack.last()?));
    }

    Ok(true)
}
