//! Textual dump of generated bytecode.
//!
//! ```text
//! Preamble function:
//! Function <unnamed>  local var size: 0 num_instructions: 2
//!   op: BC_LOAD_BIG_CONSTANT_TO_REG src: -1 dst: 0 size: 4 big_const: 5
//!   op: BC_STORE_TO_BSS_PLUS_CONSTANT src: 0 dst: -1 size: 4 big_const: 0
//! Start function: main
//! Function main  local var size: 8 num_instructions: 2
//!   ...
//! ```
//!
//! Absent registers print as `-1`.

use std::fmt;

use super::function::Function;
use super::instruction::Instruction;
use super::program::Program;
use crate::core::register_file::Reg;

struct RegOperand(Option<Reg>);

impl fmt::Display for RegOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(reg) => write!(f, "{}", reg),
            None => f.write_str("-1"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "op: {} src: {} dst: {} size: {} big_const: {}",
            self.opcode,
            RegOperand(self.src),
            RegOperand(self.dst),
            self.op_size,
            self.big_const
        )
    }
}

impl fmt::Display for Function<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Function {}", name)?,
            None => f.write_str("Function <unnamed>")?,
        }
        writeln!(
            f,
            "  local var size: {} num_instructions: {}",
            self.local_variables_size(),
            self.instructions().len()
        )?;
        for inst in self.instructions() {
            writeln!(f, "  {}", inst)?;
        }
        Ok(())
    }
}

impl fmt::Display for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Preamble function:")?;
        write!(f, "{}", self.preamble())?;

        match self.entry_function().and_then(|func| func.name()) {
            Some(name) => writeln!(f, "Start function: {}", name)?,
            None => writeln!(f, "Start function: <none>")?,
        }

        for func in self.functions() {
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::function::FunctionId;
    use crate::bytecode::instruction::Opcode;

    #[test]
    fn test_instruction_format() {
        let mut func = Function::new("main", FunctionId(1));
        func.reserve_local(4);
        func.emit(Opcode::LoadBigConstantToReg, None, Some(Reg(0)), 4, 7);
        func.emit(Opcode::StoreToStackPlusConstant, Some(Reg(0)), None, 4, 0);

        let text = func.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Function main  local var size: 4 num_instructions: 2");
        assert_eq!(
            lines[1],
            "  op: BC_LOAD_BIG_CONSTANT_TO_REG src: -1 dst: 0 size: 4 big_const: 7"
        );
        assert_eq!(
            lines[2],
            "  op: BC_STORE_TO_STACK_PLUS_CONSTANT src: 0 dst: -1 size: 4 big_const: 0"
        );
    }

    #[test]
    fn test_preamble_header() {
        let func = Function::preamble();
        assert_eq!(
            func.to_string(),
            "Function <unnamed>  local var size: 0 num_instructions: 0\n"
        );
    }
}
