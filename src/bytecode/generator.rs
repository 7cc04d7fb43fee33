// This module implements the bytecode generator, the recursive lowering from a resolved
// FileAst to a Program. compile_program lays out the globals in the static segment, runs
// global initialization as the body of the implicit preamble function, and allocates the
// zero-filled memory image. Function definitions bound to declarations are generated into
// their own Function with a fresh scratch register file, swapped in and out of the explicit
// GenContext (no ambient state); a global `main` becomes the entry function and foreign
// functions are skipped. Statement blocks lay out locals lazily from the frame counter and
// lower declarations and identifier assignments into immediate loads followed by one store
// per 64-bit chunk. Calls, returns, nested blocks and every non-literal expression are
// reported as Unsupported diagnostics: the generator records them, restores the register
// mark and keeps going so several can be reported, while internal failures abort at once.

//! Bytecode generation.

use std::mem;

use crate::ast::{
    AssignOp, Assignment, BasicType, DeclId, Definition, ExprKind, Expression, FileAst,
    FunctionDefinition, Literal, LiteralValue, ScopeId, SourceLocation, Statement,
    StatementBlock,
};
use crate::core::error::{CompileError, CompileResult, Construct, Diagnostics, InvariantViolation};
use crate::core::register_file::{registers_for_bits, Reg, RegisterMark, ScratchRegisters};
use crate::core::session::CompilationSession;

use super::config::GeneratorConfig;
use super::function::{Function, FunctionId};
use super::instruction::{truncate_op_size, IntoPayload, Opcode};
use super::layout::{
    assign_offset, checked_size_in_bits, compute_global_layout, page_round, variable_size,
};
use super::program::{MemoryImage, Program};

/// Name of the function execution starts at.
pub const ENTRY_FUNCTION_NAME: &str = "main";

/// Lowers resolved ASTs into bytecode programs allocated in a session arena.
pub struct BytecodeGenerator<'s, 'arena> {
    session: &'s CompilationSession<'arena>,
    config: GeneratorConfig,
}

impl<'s, 'arena> BytecodeGenerator<'s, 'arena> {
    pub fn new(session: &'s CompilationSession<'arena>) -> Self {
        Self::with_config(session, GeneratorConfig::default())
    }

    pub fn with_config(session: &'s CompilationSession<'arena>, config: GeneratorConfig) -> Self {
        Self { session, config }
    }

    /// Generate the whole program, or every diagnostic that prevented it.
    pub fn compile_program(&self, ast: &FileAst) -> Result<Program<'arena>, Diagnostics> {
        self.config.validate()?;

        let global = ast.global_scope();
        let static_size = compute_global_layout(ast, global)?;
        let bss_size = page_round(static_size, self.config.page_size);
        log::debug!(
            "static segment: {} bytes of globals, {} bytes after page rounding",
            static_size,
            bss_size
        );

        let mut ctx = GenContext::new(ast, self.session, &self.config);
        if let Err(error) = ctx.initialize_scope(global) {
            ctx.diagnostics.push(error);
        }
        ctx.finish_registers();

        if !ctx.diagnostics.is_empty() {
            return Err(Diagnostics::new(ctx.diagnostics));
        }

        let stack_size = self.config.stack_size;
        let bytes = self.session.alloc_zeroed((bss_size + stack_size) as usize);
        let memory = MemoryImage::new(bytes, bss_size, stack_size);

        self.session.record_static_size(bss_size);
        self.session.record_register_high_water(ctx.register_high_water);

        Ok(Program::new(ctx.active, ctx.functions, ctx.entry, memory))
    }
}

/// Generate `ast` with the default configuration.
pub fn compile_program<'arena>(
    session: &CompilationSession<'arena>,
    ast: &FileAst,
) -> Result<Program<'arena>, Diagnostics> {
    BytecodeGenerator::new(session).compile_program(ast)
}

/// State threaded through one generation pass.
struct GenContext<'a, 'arena> {
    ast: &'a FileAst,
    session: &'a CompilationSession<'arena>,
    config: &'a GeneratorConfig,
    /// Function receiving emitted instructions; the preamble at top level.
    active: Function<'arena>,
    /// Scratch registers of the active function.
    registers: ScratchRegisters,
    register_high_water: u16,
    functions: Vec<Function<'arena>>,
    entry: Option<usize>,
    next_function_id: u32,
    diagnostics: Vec<CompileError>,
}

impl<'a, 'arena> GenContext<'a, 'arena> {
    fn new(
        ast: &'a FileAst,
        session: &'a CompilationSession<'arena>,
        config: &'a GeneratorConfig,
    ) -> Self {
        Self {
            ast,
            session,
            config,
            active: Function::preamble(),
            registers: ScratchRegisters::new(),
            register_high_water: 0,
            functions: Vec::new(),
            entry: None,
            next_function_id: FunctionId::PREAMBLE.0,
            diagnostics: Vec::new(),
        }
    }

    /// Keep an unsupported-construct error as a diagnostic and rewind the registers.
    /// Internal failures are passed through.
    fn recover(&mut self, mark: RegisterMark, result: CompileResult<()>) -> CompileResult<()> {
        match result {
            Err(error @ CompileError::Unsupported { .. }) => {
                log::warn!("{}", error);
                self.session.record_unsupported();
                self.diagnostics.push(error);
                self.registers.restore(mark)
            }
            other => other,
        }
    }

    fn finish_registers(&mut self) {
        self.register_high_water = self.register_high_water.max(self.registers.high_water());
    }

    fn emit(
        &mut self,
        opcode: Opcode,
        src: Option<Reg>,
        dst: Option<Reg>,
        op_size: u8,
        big_const: u64,
    ) -> usize {
        self.session.record_instruction_emitted(opcode.name());
        self.active.emit(opcode, src, dst, op_size, big_const)
    }

    /// Reserve registers for a value, reporting values too wide for the register file
    /// as unsupported at `location`.
    fn reserve_value(&mut self, bits: u64, location: SourceLocation) -> CompileResult<Reg> {
        if !self.registers.can_reserve(bits) {
            return Err(CompileError::unsupported(Construct::OversizedValue, location));
        }
        self.registers.reserve(bits)
    }

    fn initialize_scope(&mut self, scope: ScopeId) -> CompileResult<()> {
        let ast = self.ast;
        for &id in ast.scope(scope).decls() {
            let mark = self.registers.mark();
            let result = self.initialize_variable(id);
            self.recover(mark, result)?;
        }
        Ok(())
    }

    fn initialize_variable(&mut self, id: DeclId) -> CompileResult<()> {
        let ast = self.ast;
        let decl = ast.decl(id);

        match &decl.definition {
            None if self.config.explicit_zero_init => self.zero_initialize(id),
            // storage starts zeroed, nothing to emit
            None => Ok(()),
            Some(Definition::Function(def)) => self.generate_function(id, def),
            Some(Definition::Expression(expr)) => {
                let bits = checked_size_in_bits(decl)?;
                let mark = self.registers.mark();
                let reg = self.reserve_value(bits as u64, decl.location)?;
                self.evaluate_into_registers(expr, reg)?;
                self.store_declaration(id, reg)?;
                self.registers.restore(mark)
            }
        }
    }

    fn zero_initialize(&mut self, id: DeclId) -> CompileResult<()> {
        let decl = self.ast.decl(id);
        if variable_size(decl)? == 0 {
            return Ok(());
        }

        let bits = checked_size_in_bits(decl)? as u64;
        let mark = self.registers.mark();
        let reg = self.reserve_value(bits, decl.location)?;
        for k in 0..registers_for_bits(bits) {
            self.emit(Opcode::ZeroReg, None, Some(reg.offset(k as u16)), 8, 0);
        }
        self.store_declaration(id, reg)?;
        self.registers.restore(mark)
    }

    fn generate_function(&mut self, id: DeclId, def: &FunctionDefinition) -> CompileResult<()> {
        let ast = self.ast;
        let decl = ast.decl(id);
        if def.is_foreign() {
            log::debug!("skipping foreign function `{}`", decl.name);
            return Ok(());
        }

        let body = def.body.as_ref().ok_or_else(|| InvariantViolation::MissingFunctionBody {
            name: decl.name.clone(),
        })?;

        let name = self.session.intern_str(&decl.name);
        self.next_function_id += 1;
        let function = Function::new(name, FunctionId(self.next_function_id));
        log::debug!("generating function `{}` ({})", name, function.id());

        let outer_function = mem::replace(&mut self.active, function);
        let outer_registers = mem::take(&mut self.registers);
        let result = self.generate_block(body);
        let function = mem::replace(&mut self.active, outer_function);
        let registers = mem::replace(&mut self.registers, outer_registers);
        result?;

        self.register_high_water = self.register_high_water.max(registers.high_water());
        self.session
            .record_function_generated(name, function.instructions().len());
        log::debug!(
            "function `{}`: {} instructions, {} bytes of locals",
            name,
            function.instructions().len(),
            function.local_variables_size()
        );

        if name == ENTRY_FUNCTION_NAME && ast.is_global(id) {
            self.entry = Some(self.functions.len());
        }
        self.functions.push(function);
        Ok(())
    }

    fn generate_block(&mut self, block: &StatementBlock) -> CompileResult<()> {
        for statement in &block.statements {
            log::trace!("statement at {}", statement.location(self.ast));
            let mark = self.registers.mark();
            let result = self.generate_statement(statement);
            self.recover(mark, result)?;
        }
        Ok(())
    }

    fn generate_statement(&mut self, statement: &Statement) -> CompileResult<()> {
        match statement {
            Statement::Declaration(id) => {
                let decl = self.ast.decl(*id);
                let size = variable_size(decl)?;
                if size > 0 {
                    let offset = self.active.reserve_local(size);
                    assign_offset(self.ast, *id, offset)?;
                    log::debug!("local `{}` at frame offset {} ({} bytes)", decl.name, offset, size);
                }
                self.initialize_variable(*id)
            }
            Statement::Assignment(assign) => self.generate_assignment(assign),
            Statement::Call(call) => Err(CompileError::unsupported(
                Construct::FunctionCallStatement,
                call.location,
            )),
            Statement::Return(ret) => Err(CompileError::unsupported(
                Construct::ReturnStatement,
                ret.location,
            )),
            Statement::Block(block) => Err(CompileError::unsupported(
                Construct::NestedBlockStatement,
                block.location,
            )),
        }
    }

    fn generate_assignment(&mut self, assign: &Assignment) -> CompileResult<()> {
        if assign.op != AssignOp::Assign {
            return Err(CompileError::unsupported(
                Construct::CompoundAssignment,
                assign.location,
            ));
        }

        let target = match &assign.lhs.kind {
            ExprKind::Identifier(identifier) => identifier.decl,
            _ => {
                return Err(CompileError::unsupported(
                    Construct::AssignmentTarget,
                    assign.lhs.location,
                ))
            }
        };

        let bits = expression_bits(&assign.lhs)?;
        let mark = self.registers.mark();
        let reg = self.reserve_value(bits, assign.location)?;
        self.evaluate_into_registers(&assign.rhs, reg)?;
        self.store_declaration(target, reg)?;
        self.registers.restore(mark)
    }

    /// Store the value held in registers starting at `reg` to the declaration's storage,
    /// one store per 64-bit chunk.
    fn store_declaration(&mut self, id: DeclId, reg: Reg) -> CompileResult<()> {
        let ast = self.ast;
        let decl = ast.decl(id);
        if variable_size(decl)? == 0 {
            return Err(InvariantViolation::ZeroSizedStore {
                name: decl.name.clone(),
            }
            .into());
        }
        let offset = decl
            .memory_offset()
            .ok_or_else(|| InvariantViolation::MissingOffset {
                name: decl.name.clone(),
            })?;

        let opcode = if ast.is_global(id) {
            Opcode::StoreToBssPlusConstant
        } else {
            Opcode::StoreToStackPlusConstant
        };

        let mut bits = checked_size_in_bits(decl)? as i64;
        let mut offset = offset;
        let mut reg = reg;
        loop {
            self.emit(opcode, Some(reg), None, truncate_op_size(bits), offset);
            bits -= 64;
            if bits <= 0 {
                break;
            }
            reg = reg.offset(1);
            offset += 8;
        }
        Ok(())
    }

    /// Emit instructions leaving the value of `expr` in registers starting at `reg`.
    fn evaluate_into_registers(&mut self, expr: &Expression, reg: Reg) -> CompileResult<()> {
        let construct = match &expr.kind {
            ExprKind::Literal(literal) => return self.load_literal(literal, reg, expr.location),
            ExprKind::Identifier(_) => Construct::IdentifierExpression,
            ExprKind::Unary { .. } => Construct::UnaryOperation,
            ExprKind::Binary { .. } => Construct::BinaryOperation,
            ExprKind::Assignment(_) => Construct::AssignmentExpression,
            ExprKind::Call(_) => Construct::FunctionCallExpression,
            ExprKind::MemberAccess { .. } => Construct::MemberAccessExpression,
            ExprKind::Index { .. } => Construct::IndexExpression,
            ExprKind::Run(_) => {
                return Err(InvariantViolation::UnexpectedExpression {
                    kind: "run directive",
                    location: expr.location,
                }
                .into())
            }
        };
        Err(CompileError::unsupported(construct, expr.location))
    }

    fn load_literal(
        &mut self,
        literal: &Literal,
        reg: Reg,
        location: SourceLocation,
    ) -> CompileResult<()> {
        let basic = literal.ty.basic;
        let op_size = (literal.ty.size_in_bits / 8) as u8;

        let payload = match &literal.value {
            LiteralValue::Str(text) if basic == BasicType::String => {
                let data = self.session.intern_str(text);
                self.emit(
                    Opcode::LoadBigConstantToReg,
                    None,
                    Some(reg),
                    8,
                    data.as_ptr().into_payload(),
                );
                self.emit(
                    Opcode::LoadBigConstantToReg,
                    None,
                    Some(reg.offset(1)),
                    8,
                    (text.len() as u64).into_payload(),
                );
                return Ok(());
            }
            LiteralValue::Signed(value) if basic.is_integer() => value.into_payload(),
            LiteralValue::Unsigned(value) if basic.is_integer() => value.into_payload(),
            LiteralValue::Bool(value) if basic == BasicType::Bool => value.into_payload(),
            LiteralValue::Float(value) if basic == BasicType::F32 => (*value as f32).into_payload(),
            LiteralValue::Float(value) if basic == BasicType::F64 => value.into_payload(),
            _ => {
                return Err(InvariantViolation::InvalidLiteral {
                    location,
                    reason: "value does not match the literal type",
                }
                .into())
            }
        };

        self.emit(Opcode::LoadBigConstantToReg, None, Some(reg), op_size, payload);
        Ok(())
    }
}

fn expression_bits(expr: &Expression) -> CompileResult<u64> {
    expr.ty
        .as_ref()
        .map(|ty| ty.size_in_bits() as u64)
        .ok_or_else(|| {
            InvariantViolation::MissingExpressionType {
                location: expr.location,
            }
            .into()
        })
}
