//! Virtual-CPU instructions and their text form
//!
//! Text form is one instruction per line: a mnemonic followed by
//! whitespace-separated operands, e.g. `collect 0 30` or `nand b b b`.

use serde::{Deserialize, Serialize};

use super::resource::ResourceScope;
use crate::error::GenomeError;

/// CPU register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    A,
    B,
    C,
}

impl Register {
    /// Register slot index
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Register::A => 0,
            Register::B => 1,
            Register::C => 2,
        }
    }

    fn parse(token: &str, line: usize) -> Result<Self, GenomeError> {
        match token {
            "a" | "A" | "ax" => Ok(Register::A),
            "b" | "B" | "bx" => Ok(Register::B),
            "c" | "C" | "cx" => Ok(Register::C),
            _ => Err(GenomeError::InvalidOperand {
                line,
                operand: token.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Register::A => "a",
            Register::B => "b",
            Register::C => "c",
        };
        f.write_str(name)
    }
}

/// One virtual-CPU instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Nop,
    Set { reg: Register, value: i32 },
    Inc(Register),
    Dec(Register),
    Add { dst: Register, lhs: Register, rhs: Register },
    Sub { dst: Register, lhs: Register, rhs: Register },
    Nand { dst: Register, lhs: Register, rhs: Register },
    ShiftL(Register),
    ShiftR(Register),
    Swap(Register, Register),
    /// Output the register, then read the next input into it
    Io(Register),
    IfEqu(Register, Register),
    IfNEqu(Register, Register),
    IfLess(Register, Register),
    /// Relative jump from this instruction
    Jump(i32),
    /// Copy one instruction into the offspring buffer
    HCopy,
    /// Execute the next instruction only while the offspring copy is incomplete
    IfNCopied,
    Divide,
    Die,
    /// Draw up to `amount` of a resource from the ambient pool
    Collect { resource: usize, amount: f64 },
    /// Return up to `amount` of a previously collected resource
    Release { resource: usize, amount: f64 },
    /// Read a resource quantity from a scope into a register
    Sense { scope: ResourceScope, resource: usize, reg: Register },
    Receive(Register),
    Buy { label: u32, price: i32, reg: Register },
    Kaboom(u32),
    /// Count live neighbors into a register
    Neighbors(Register),
    /// Count non-null faced avatars into a register
    LookAhead(Register),
}

impl Instruction {
    /// Mnemonic used in the text form
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "nop",
            Instruction::Set { .. } => "set",
            Instruction::Inc(_) => "inc",
            Instruction::Dec(_) => "dec",
            Instruction::Add { .. } => "add",
            Instruction::Sub { .. } => "sub",
            Instruction::Nand { .. } => "nand",
            Instruction::ShiftL(_) => "shift-l",
            Instruction::ShiftR(_) => "shift-r",
            Instruction::Swap(..) => "swap",
            Instruction::Io(_) => "io",
            Instruction::IfEqu(..) => "if-equ",
            Instruction::IfNEqu(..) => "if-n-equ",
            Instruction::IfLess(..) => "if-less",
            Instruction::Jump(_) => "jump",
            Instruction::HCopy => "h-copy",
            Instruction::IfNCopied => "if-n-copied",
            Instruction::Divide => "divide",
            Instruction::Die => "die",
            Instruction::Collect { .. } => "collect",
            Instruction::Release { .. } => "release",
            Instruction::Sense { .. } => "sense",
            Instruction::Receive(_) => "receive",
            Instruction::Buy { .. } => "buy",
            Instruction::Kaboom(_) => "kaboom",
            Instruction::Neighbors(_) => "neighbors",
            Instruction::LookAhead(_) => "look-ahead",
        }
    }

    /// Parse one instruction line (without comments). `line` is used in errors.
    pub fn parse_line(text: &str, line: usize) -> Result<Self, GenomeError> {
        let mut tokens = text.split_whitespace();
        let mnemonic = tokens.next().unwrap_or("");
        let ops: Vec<&str> = tokens.collect();

        let expect = |n: usize| -> Result<(), GenomeError> {
            if ops.len() == n {
                Ok(())
            } else {
                Err(GenomeError::OperandCount {
                    line,
                    mnemonic: mnemonic.to_string(),
                    expected: n,
                    actual: ops.len(),
                })
            }
        };
        let reg = |i: usize| Register::parse(ops[i], line);
        let num = |i: usize| -> Result<i64, GenomeError> {
            ops[i].parse::<i64>().map_err(|_| GenomeError::InvalidOperand {
                line,
                operand: ops[i].to_string(),
            })
        };
        let index = |i: usize| -> Result<usize, GenomeError> {
            ops[i].parse::<usize>().map_err(|_| GenomeError::InvalidOperand {
                line,
                operand: ops[i].to_string(),
            })
        };
        let amount = |i: usize| -> Result<f64, GenomeError> {
            ops[i]
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| GenomeError::InvalidOperand {
                    line,
                    operand: ops[i].to_string(),
                })
        };
        let narrow = |v: i64, i: usize| -> Result<i32, GenomeError> {
            i32::try_from(v).map_err(|_| GenomeError::InvalidOperand {
                line,
                operand: ops[i].to_string(),
            })
        };

        let inst = match mnemonic {
            "nop" => {
                expect(0)?;
                Instruction::Nop
            }
            "set" => {
                expect(2)?;
                Instruction::Set {
                    reg: reg(0)?,
                    value: narrow(num(1)?, 1)?,
                }
            }
            "inc" => {
                expect(1)?;
                Instruction::Inc(reg(0)?)
            }
            "dec" => {
                expect(1)?;
                Instruction::Dec(reg(0)?)
            }
            "add" | "sub" | "nand" => {
                expect(3)?;
                let (dst, lhs, rhs) = (reg(0)?, reg(1)?, reg(2)?);
                match mnemonic {
                    "add" => Instruction::Add { dst, lhs, rhs },
                    "sub" => Instruction::Sub { dst, lhs, rhs },
                    _ => Instruction::Nand { dst, lhs, rhs },
                }
            }
            "shift-l" => {
                expect(1)?;
                Instruction::ShiftL(reg(0)?)
            }
            "shift-r" => {
                expect(1)?;
                Instruction::ShiftR(reg(0)?)
            }
            "swap" => {
                expect(2)?;
                Instruction::Swap(reg(0)?, reg(1)?)
            }
            "io" => {
                expect(1)?;
                Instruction::Io(reg(0)?)
            }
            "if-equ" | "if-n-equ" | "if-less" => {
                expect(2)?;
                let (lhs, rhs) = (reg(0)?, reg(1)?);
                match mnemonic {
                    "if-equ" => Instruction::IfEqu(lhs, rhs),
                    "if-n-equ" => Instruction::IfNEqu(lhs, rhs),
                    _ => Instruction::IfLess(lhs, rhs),
                }
            }
            "jump" => {
                expect(1)?;
                Instruction::Jump(narrow(num(0)?, 0)?)
            }
            "h-copy" => {
                expect(0)?;
                Instruction::HCopy
            }
            "if-n-copied" => {
                expect(0)?;
                Instruction::IfNCopied
            }
            "divide" => {
                expect(0)?;
                Instruction::Divide
            }
            "die" => {
                expect(0)?;
                Instruction::Die
            }
            "collect" => {
                expect(2)?;
                Instruction::Collect {
                    resource: index(0)?,
                    amount: amount(1)?,
                }
            }
            "release" => {
                expect(2)?;
                Instruction::Release {
                    resource: index(0)?,
                    amount: amount(1)?,
                }
            }
            "sense" => {
                expect(3)?;
                let scope =
                    ResourceScope::parse(ops[0]).ok_or_else(|| GenomeError::InvalidOperand {
                        line,
                        operand: ops[0].to_string(),
                    })?;
                Instruction::Sense {
                    scope,
                    resource: index(1)?,
                    reg: reg(2)?,
                }
            }
            "receive" => {
                expect(1)?;
                Instruction::Receive(reg(0)?)
            }
            "buy" => {
                expect(3)?;
                let label = u32::try_from(num(0)?).map_err(|_| GenomeError::InvalidOperand {
                    line,
                    operand: ops[0].to_string(),
                })?;
                Instruction::Buy {
                    label,
                    price: narrow(num(1)?, 1)?,
                    reg: reg(2)?,
                }
            }
            "kaboom" => {
                expect(1)?;
                Instruction::Kaboom(u32::try_from(num(0)?).map_err(|_| {
                    GenomeError::InvalidOperand {
                        line,
                        operand: ops[0].to_string(),
                    }
                })?)
            }
            "neighbors" => {
                expect(1)?;
                Instruction::Neighbors(reg(0)?)
            }
            "look-ahead" => {
                expect(1)?;
                Instruction::LookAhead(reg(0)?)
            }
            other => {
                return Err(GenomeError::UnknownInstruction {
                    line,
                    token: other.to_string(),
                })
            }
        };
        Ok(inst)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = self.mnemonic();
        match self {
            Instruction::Nop
            | Instruction::HCopy
            | Instruction::IfNCopied
            | Instruction::Divide
            | Instruction::Die => f.write_str(m),
            Instruction::Set { reg, value } => write!(f, "{m} {reg} {value}"),
            Instruction::Inc(r)
            | Instruction::Dec(r)
            | Instruction::ShiftL(r)
            | Instruction::ShiftR(r)
            | Instruction::Io(r)
            | Instruction::Receive(r)
            | Instruction::Neighbors(r)
            | Instruction::LookAhead(r) => write!(f, "{m} {r}"),
            Instruction::Add { dst, lhs, rhs }
            | Instruction::Sub { dst, lhs, rhs }
            | Instruction::Nand { dst, lhs, rhs } => write!(f, "{m} {dst} {lhs} {rhs}"),
            Instruction::Swap(a, b)
            | Instruction::IfEqu(a, b)
            | Instruction::IfNEqu(a, b)
            | Instruction::IfLess(a, b) => write!(f, "{m} {a} {b}"),
            Instruction::Jump(offset) => write!(f, "{m} {offset}"),
            Instruction::Collect { resource, amount } | Instruction::Release { resource, amount } => {
                write!(f, "{m} {resource} {amount}")
            }
            Instruction::Sense {
                scope,
                resource,
                reg,
            } => write!(f, "{m} {scope} {resource} {reg}"),
            Instruction::Buy { label, price, reg } => write!(f, "{m} {label} {price} {reg}"),
            Instruction::Kaboom(distance) => write!(f, "{m} {distance}"),
        }
    }
}
