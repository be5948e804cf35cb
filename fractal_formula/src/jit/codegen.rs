//! Per-node code emission
//!
//! Every expression value is a `F64X2` SSA value: real part in lane 0,
//! imaginary part in lane 1. Literals and symbols load from data-section
//! labels; assignments store the low lane back to the symbol's slot;
//! comparisons and the short-circuit operators materialise a canonical
//! `(1,0)` or `(0,0)`.

use std::collections::HashMap;

use cranelift_codegen::ir::condcodes::FloatCC;
use cranelift_codegen::ir::{types, FuncRef, GlobalValue, InstBuilder, MemFlags, Type, Value};
use cranelift_frontend::FunctionBuilder;
use cranelift_module::{DataId, Linkage, Module};

use fractal_formula_parser::ast::{BinaryOp, Node, UnaryOp};
use fractal_formula_runtime::Complex;

use super::{ConstantKey, DataBinding, JitError, SessionState};
use crate::symbols::RESULT_SLOT;

pub(super) struct SectionCompiler<'a, 'b, 'f> {
    state: &'a mut SessionState<'b>,
    builder: FunctionBuilder<'f>,
    func_refs: HashMap<String, FuncRef>,
    data_addrs: HashMap<DataId, GlobalValue>,
    ptr_type: Type,
}

impl<'a, 'b, 'f> SectionCompiler<'a, 'b, 'f> {
    pub(super) fn new(
        state: &'a mut SessionState<'b>,
        builder: FunctionBuilder<'f>,
    ) -> Result<Self, JitError> {
        let ptr_type = state.module.target_config().pointer_type();
        Ok(Self {
            state,
            builder,
            func_refs: HashMap::new(),
            data_addrs: HashMap::new(),
            ptr_type,
        })
    }

    pub(super) fn finish(self) -> FunctionBuilder<'f> {
        self.builder
    }

    /// Store the section result (both lanes) to the `_result` slot.
    pub(super) fn store_result(&mut self, value: Value) -> Result<(), JitError> {
        let slot = self.symbol_binding(RESULT_SLOT)?;
        let address = self.data_address(slot);
        self.builder
            .ins()
            .store(MemFlags::trusted(), value, address, 0);
        Ok(())
    }

    pub(super) fn emit(&mut self, node: &Node) -> Result<Value, JitError> {
        match node {
            Node::Literal(value) => {
                let slot = self.constant_binding(*value)?;
                let address = self.data_address(slot);
                Ok(self.load_complex(address))
            }

            Node::Identifier(name) => {
                let slot = self.symbol_binding(name)?;
                let address = self.data_address(slot);
                Ok(self.load_complex(address))
            }

            Node::UnaryOp { op, operand } => {
                let value = self.emit(operand)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => self.builder.ins().fneg(value),
                    UnaryOp::Mod => self.modulus_sqr(value),
                })
            }

            Node::BinaryOp { op, left, right } => self.emit_binary(*op, left, right),

            Node::FunctionCall { name, arg } => self.emit_call(name, arg),

            Node::Assignment {
                variable,
                expression,
            } => {
                let value = self.emit(expression)?;
                let slot = self.symbol_binding(variable)?;
                let address = self.data_address(slot);
                // only the low lane is stored back
                let re = self.lane0(value);
                self.builder.ins().store(MemFlags::trusted(), re, address, 0);
                Ok(value)
            }

            Node::If {
                condition,
                then_block,
                else_block,
            } => {
                let condition = self.emit(condition)?;
                let truth = self.truthy(condition);

                let then_label = self.builder.create_block();
                let else_label = self.builder.create_block();
                let merge = self.builder.create_block();
                self.builder.append_block_param(merge, types::F64X2);

                self.builder
                    .ins()
                    .brif(truth, then_label, &[], else_label, &[]);

                self.builder.switch_to_block(then_label);
                let then_value = match then_block {
                    Some(block) => self.emit(block)?,
                    None => self.pack_constant(1.0, 0.0),
                };
                self.builder.ins().jump(merge, &[then_value]);

                self.builder.switch_to_block(else_label);
                let else_value = match else_block {
                    Some(block) => self.emit(block)?,
                    None => self.pack_constant(0.0, 0.0),
                };
                self.builder.ins().jump(merge, &[else_value]);

                self.builder.switch_to_block(merge);
                Ok(self.builder.block_params(merge)[0])
            }

            Node::StatementSeq(statements) => {
                let mut result = None;
                for statement in statements {
                    result = Some(self.emit(statement)?);
                }
                match result {
                    Some(value) => Ok(value),
                    None => Ok(self.pack_constant(0.0, 0.0)),
                }
            }

            Node::Setting { .. } | Node::ParamBlock { .. } => Err(JitError::Unsupported(
                "settings are metadata, not executable code".to_string(),
            )),
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, left: &Node, right: &Node) -> Result<Value, JitError> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return self.emit_short_circuit(op, left, right);
        }

        let lhs = self.emit(left)?;
        let rhs = self.emit(right)?;
        match op {
            BinaryOp::Add => Ok(self.builder.ins().fadd(lhs, rhs)),
            BinaryOp::Sub => Ok(self.builder.ins().fsub(lhs, rhs)),

            BinaryOp::Mul => {
                // (a + bi)(c + di) = (ac - bd) + (ad + bc)i
                let products = self.builder.ins().fmul(lhs, rhs); // [ac, bd]
                let swapped = self.swap(rhs); // [d, c]
                let cross = self.builder.ins().fmul(lhs, swapped); // [ad, bc]
                let ac = self.lane0(products);
                let bd = self.lane1(products);
                let re = self.builder.ins().fsub(ac, bd);
                let ad = self.lane0(cross);
                let bc = self.lane1(cross);
                let im = self.builder.ins().fadd(ad, bc);
                Ok(self.pack(re, im))
            }

            BinaryOp::Div => {
                // (u + vi) / (x + yi) = ((ux + vy) + (vx - uy)i) / (x^2 + y^2)
                let squares = self.builder.ins().fmul(rhs, rhs); // [x^2, y^2]
                let x2 = self.lane0(squares);
                let y2 = self.lane1(squares);
                let denom = self.builder.ins().fadd(x2, y2);
                let products = self.builder.ins().fmul(lhs, rhs); // [ux, vy]
                let ux = self.lane0(products);
                let vy = self.lane1(products);
                let numerator_re = self.builder.ins().fadd(ux, vy);
                let swapped = self.swap(lhs); // [v, u]
                let cross = self.builder.ins().fmul(swapped, rhs); // [vx, uy]
                let vx = self.lane0(cross);
                let uy = self.lane1(cross);
                let numerator_im = self.builder.ins().fsub(vx, uy);
                let re = self.builder.ins().fdiv(numerator_re, denom);
                let im = self.builder.ins().fdiv(numerator_im, denom);
                Ok(self.pack(re, im))
            }

            // real-only pow on the low lanes; the deliberate limitation
            // for complex operands
            BinaryOp::Pow => {
                let base = self.lane0(lhs);
                let exponent = self.lane0(rhs);
                let pow_ref = self.pow_ref();
                let call = self.builder.ins().call(pow_ref, &[base, exponent]);
                let result = self.builder.inst_results(call)[0];
                let zero = self.builder.ins().f64const(0.0);
                Ok(self.pack(result, zero))
            }

            BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual
            | BinaryOp::Equal
            | BinaryOp::NotEqual => {
                let condition_code = match op {
                    BinaryOp::Less => FloatCC::LessThan,
                    BinaryOp::LessEqual => FloatCC::LessThanOrEqual,
                    BinaryOp::Greater => FloatCC::GreaterThan,
                    BinaryOp::GreaterEqual => FloatCC::GreaterThanOrEqual,
                    BinaryOp::Equal => FloatCC::Equal,
                    _ => FloatCC::NotEqual,
                };
                let lhs_re = self.lane0(lhs);
                let rhs_re = self.lane0(rhs);
                let flag = self.builder.ins().fcmp(condition_code, lhs_re, rhs_re);
                Ok(self.bool_value(flag))
            }

            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    /// `&&` / `||` evaluate the right operand only when the left does not
    /// decide the result, and produce a canonical `(1,0)` or `(0,0)`.
    fn emit_short_circuit(
        &mut self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
    ) -> Result<Value, JitError> {
        let lhs = self.emit(left)?;
        let truth = self.truthy(lhs);

        let rhs_label = self.builder.create_block();
        let merge = self.builder.create_block();
        self.builder.append_block_param(merge, types::F64X2);

        let decided = match op {
            // left false decides &&; left true decides ||
            BinaryOp::And => self.pack_constant(0.0, 0.0),
            _ => self.pack_constant(1.0, 0.0),
        };
        match op {
            BinaryOp::And => self
                .builder
                .ins()
                .brif(truth, rhs_label, &[], merge, &[decided]),
            _ => self
                .builder
                .ins()
                .brif(truth, merge, &[decided], rhs_label, &[]),
        };

        self.builder.switch_to_block(rhs_label);
        let rhs = self.emit(right)?;
        let rhs_truth = self.truthy(rhs);
        let normalised = self.bool_value(rhs_truth);
        self.builder.ins().jump(merge, &[normalised]);

        self.builder.switch_to_block(merge);
        Ok(self.builder.block_params(merge)[0])
    }

    fn emit_call(&mut self, name: &str, arg: &Node) -> Result<Value, JitError> {
        let value = self.emit(arg)?;
        match name {
            // conj negates the high lane
            "conj" => {
                let re = self.lane0(value);
                let im = self.lane1(value);
                let negated = self.builder.ins().fneg(im);
                Ok(self.pack(re, negated))
            }
            // flip swaps the lanes
            "flip" => Ok(self.swap(value)),
            "ident" => Ok(value),
            _ => {
                let function = self.runtime_ref(name)?;
                let argument = self.lane0(value);
                let call = self.builder.ins().call(function, &[argument]);
                let result = self.builder.inst_results(call)[0];
                let zero = self.builder.ins().f64const(0.0);
                Ok(self.pack(result, zero))
            }
        }
    }

    // ==================== lane helpers ====================

    fn lane0(&mut self, value: Value) -> Value {
        self.builder.ins().extractlane(value, 0)
    }

    fn lane1(&mut self, value: Value) -> Value {
        self.builder.ins().extractlane(value, 1)
    }

    fn pack(&mut self, re: Value, im: Value) -> Value {
        let vector = self.builder.ins().splat(types::F64X2, re);
        self.builder.ins().insertlane(vector, im, 1)
    }

    fn pack_constant(&mut self, re: f64, im: f64) -> Value {
        let re = self.builder.ins().f64const(re);
        let im = self.builder.ins().f64const(im);
        self.pack(re, im)
    }

    fn swap(&mut self, value: Value) -> Value {
        let re = self.lane0(value);
        let im = self.lane1(value);
        self.pack(im, re)
    }

    /// `|z|`: square both lanes, add them into the low lane, zero the
    /// high lane.
    fn modulus_sqr(&mut self, value: Value) -> Value {
        let squares = self.builder.ins().fmul(value, value);
        let re2 = self.lane0(squares);
        let im2 = self.lane1(squares);
        let sum = self.builder.ins().fadd(re2, im2);
        let zero = self.builder.ins().f64const(0.0);
        self.pack(sum, zero)
    }

    /// Truthiness of a complex value: low lane compared against zero.
    fn truthy(&mut self, value: Value) -> Value {
        let re = self.lane0(value);
        let zero = self.builder.ins().f64const(0.0);
        self.builder.ins().fcmp(FloatCC::NotEqual, re, zero)
    }

    /// Turn an integer flag into a packed `(1,0)` / `(0,0)`.
    fn bool_value(&mut self, flag: Value) -> Value {
        let one = self.builder.ins().f64const(1.0);
        let zero = self.builder.ins().f64const(0.0);
        let re = self.builder.ins().select(flag, one, zero);
        self.pack(re, zero)
    }

    // ==================== data and function references ====================

    fn symbol_binding(&mut self, name: &str) -> Result<DataId, JitError> {
        if let Some(binding) = self.state.layout.symbols.get(name) {
            return Ok(binding.id);
        }
        let id = self
            .state
            .module
            .declare_data(&format!("sym${name}"), Linkage::Export, true, false)
            .map_err(|err| JitError::DataEmission(err.to_string()))?;
        self.state
            .layout
            .symbols
            .insert(name.to_string(), DataBinding { id, bound: false });
        Ok(id)
    }

    fn constant_binding(&mut self, value: Complex) -> Result<DataId, JitError> {
        let key = ConstantKey(value);
        if let Some(binding) = self.state.layout.constants.get(&key) {
            return Ok(binding.id);
        }
        let label = format!("const${}", self.state.layout.constants.len());
        let id = self
            .state
            .module
            .declare_data(&label, Linkage::Export, false, false)
            .map_err(|err| JitError::DataEmission(err.to_string()))?;
        self.state
            .layout
            .constants
            .insert(key, DataBinding { id, bound: false });
        Ok(id)
    }

    fn data_address(&mut self, slot: DataId) -> Value {
        let global = match self.data_addrs.get(&slot) {
            Some(global) => *global,
            None => {
                let global = self
                    .state
                    .module
                    .declare_data_in_func(slot, self.builder.func);
                self.data_addrs.insert(slot, global);
                global
            }
        };
        self.builder.ins().global_value(self.ptr_type, global)
    }

    fn load_complex(&mut self, address: Value) -> Value {
        self.builder
            .ins()
            .load(types::F64X2, MemFlags::trusted(), address, 0)
    }

    fn runtime_ref(&mut self, name: &str) -> Result<FuncRef, JitError> {
        if let Some(func_ref) = self.func_refs.get(name) {
            return Ok(*func_ref);
        }
        let Some(&func_id) = self.state.runtime_fns.get(name) else {
            return Err(JitError::Unsupported(format!(
                "no runtime implementation for function '{name}'"
            )));
        };
        let func_ref = self
            .state
            .module
            .declare_func_in_func(func_id, self.builder.func);
        self.func_refs.insert(name.to_string(), func_ref);
        Ok(func_ref)
    }

    fn pow_ref(&mut self) -> FuncRef {
        if let Some(func_ref) = self.func_refs.get("pow$intrinsic") {
            return *func_ref;
        }
        let func_ref = self
            .state
            .module
            .declare_func_in_func(self.state.pow_fn, self.builder.func);
        self.func_refs.insert("pow$intrinsic".to_string(), func_ref);
        func_ref
    }
}
