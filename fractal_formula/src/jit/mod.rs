//! Cranelift JIT backend
//!
//! Compiles the initialize / iterate / bailout sections to native code.
//! A complex value lives in a single 128-bit vector value, real part in
//! the low lane and imaginary part in the high lane; every leaf operation
//! honours that layout.
//!
//! Constants and referenced symbols live in data objects owned by the
//! JIT module. Symbol slots are snapshotted from the host symbol table
//! when the data section is materialised (one copy per symbol per
//! session); after every call the runtime copies each slot back into the
//! host table, which is how results and assignments become visible.

mod codegen;

use std::collections::{BTreeMap, HashMap};

use cranelift_codegen::ir::{types, AbiParam, Function, InstBuilder, UserFuncName};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{DataDescription, DataId, FuncId, Linkage, Module};
use thiserror::Error;

use fractal_formula_parser::ast::{Expr, FormulaSections, Section};
use fractal_formula_runtime::{functions, Complex};

use crate::symbols::{SymbolTable, RESULT_SLOT};
use codegen::SectionCompiler;

/// JIT compilation error. Any failure aborts the whole compilation; no
/// partially registered function pointers are exposed.
#[derive(Debug, Error)]
pub enum JitError {
    #[error("module creation error: {0}")]
    ModuleCreation(String),
    #[error("function compilation error: {0}")]
    FunctionCompilation(String),
    #[error("data emission error: {0}")]
    DataEmission(String),
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

/// A data object label for one constant or symbol. Fresh bindings start
/// unbound; each is defined exactly once when the data section is
/// materialised, preventing duplicate emission.
#[derive(Debug)]
pub(crate) struct DataBinding {
    pub id: DataId,
    pub bound: bool,
}

/// Constant-pool key: lexicographic order over (re, im). NaN constants
/// are not valid keys.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConstantKey(pub Complex);

impl PartialEq for ConstantKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for ConstantKey {}

impl PartialOrd for ConstantKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConstantKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The emitter's data-section state: constant pool and symbol labels.
#[derive(Debug, Default)]
pub(crate) struct DataLayout {
    pub constants: BTreeMap<ConstantKey, DataBinding>,
    pub symbols: BTreeMap<String, DataBinding>,
}

/// Shared pieces threaded through section compilation.
pub(crate) struct SessionState<'a> {
    pub module: &'a mut JITModule,
    pub layout: &'a mut DataLayout,
    pub runtime_fns: &'a HashMap<String, FuncId>,
    pub pow_fn: FuncId,
}

/// A compiled formula: the emitted code, its data section and the entry
/// points for each compiled section. Dropping the program releases the
/// code memory, invalidating every pointer obtained from it.
pub struct JitProgram {
    module: Option<JITModule>,
    initialize: Option<*const u8>,
    iterate: Option<*const u8>,
    bailout: Option<*const u8>,
    symbol_slots: Vec<(String, DataId)>,
}

impl std::fmt::Debug for JitProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitProgram")
            .field("initialize", &self.initialize.is_some())
            .field("iterate", &self.iterate.is_some())
            .field("bailout", &self.bailout.is_some())
            .field("symbols", &self.symbol_slots.len())
            .finish()
    }
}

impl Drop for JitProgram {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // Safety: every function pointer into the module is private
            // to this program and dies with it.
            unsafe { module.free_memory() };
        }
    }
}

impl JitProgram {
    /// Invoke a compiled section, then propagate every symbol slot back
    /// to the host table. Returns the `_result` slot; a section that was
    /// never compiled yields `(0,0)`.
    pub fn run(&self, section: Section, symbols: &mut SymbolTable) -> Complex {
        let entry = match section {
            Section::Initialize => self.initialize,
            Section::Iterate => self.iterate,
            Section::Bailout => self.bailout,
            _ => None,
        };
        let (Some(entry), Some(module)) = (entry, self.module.as_ref()) else {
            return Complex::ZERO;
        };

        // Safety: the pointer came from this module's finalized code and
        // the signature is the one every section is compiled with.
        let function: extern "C" fn() = unsafe { std::mem::transmute(entry) };
        function();

        for (name, slot) in &self.symbol_slots {
            symbols.set(name, read_slot(module, *slot));
        }
        symbols.get(RESULT_SLOT)
    }
}

fn read_slot(module: &JITModule, slot: DataId) -> Complex {
    let (ptr, len) = module.get_finalized_data(slot);
    debug_assert!(len >= 16);
    // Safety: every slot is a 16-byte, 16-aligned pair of doubles
    // defined by this module.
    unsafe {
        let doubles = ptr as *const f64;
        Complex::new(doubles.read(), doubles.add(1).read())
    }
}

/// Compile the initialize / iterate / bailout sections of a formula.
/// Referenced symbols are snapshotted from (and default-inserted into)
/// the host symbol table.
pub(crate) fn compile_sections(
    sections: &FormulaSections,
    symbols: &mut SymbolTable,
) -> Result<JitProgram, JitError> {
    let mut builder = JITBuilder::new(cranelift_module::default_libcall_names())
        .map_err(|err| JitError::ModuleCreation(err.to_string()))?;
    for (name, function) in functions::scalar_functions() {
        builder.symbol(name, function as *const u8);
    }
    builder.symbol("pow", functions::pow as *const u8);

    let mut module = JITModule::new(builder);

    // Import the scalar runtime helpers and the pow intrinsic.
    let mut runtime_fns = HashMap::new();
    let mut unary_sig = module.make_signature();
    unary_sig.params.push(AbiParam::new(types::F64));
    unary_sig.returns.push(AbiParam::new(types::F64));
    for (name, _) in functions::scalar_functions() {
        let id = module
            .declare_function(name, Linkage::Import, &unary_sig)
            .map_err(|err| JitError::ModuleCreation(err.to_string()))?;
        runtime_fns.insert(name.to_string(), id);
    }
    let mut pow_sig = module.make_signature();
    pow_sig.params.push(AbiParam::new(types::F64));
    pow_sig.params.push(AbiParam::new(types::F64));
    pow_sig.returns.push(AbiParam::new(types::F64));
    let pow_fn = module
        .declare_function("pow", Linkage::Import, &pow_sig)
        .map_err(|err| JitError::ModuleCreation(err.to_string()))?;

    let mut layout = DataLayout::default();
    let mut ctx = Context::new();
    let mut builder_ctx = FunctionBuilderContext::new();

    let parts = [
        ("formula_init", &sections.initialize),
        ("formula_iter", &sections.iterate),
        ("formula_bailout", &sections.bailout),
    ];
    let mut compiled = [None, None, None];
    for (slot, (name, section)) in compiled.iter_mut().zip(parts) {
        let Some(expr) = section else {
            continue;
        };
        let mut state = SessionState {
            module: &mut module,
            layout: &mut layout,
            runtime_fns: &runtime_fns,
            pow_fn,
        };
        *slot = Some(compile_section(
            &mut state,
            &mut ctx,
            &mut builder_ctx,
            name,
            expr,
        )?);
    }
    let [initialize, iterate, bailout] = compiled;

    emit_data_section(&mut module, &mut layout, symbols)?;

    module
        .finalize_definitions()
        .map_err(|err| JitError::FunctionCompilation(err.to_string()))?;

    let finalized = |id: Option<FuncId>| id.map(|id| module.get_finalized_function(id));
    let initialize = finalized(initialize);
    let iterate = finalized(iterate);
    let bailout = finalized(bailout);
    let symbol_slots = layout
        .symbols
        .iter()
        .map(|(name, binding)| (name.clone(), binding.id))
        .collect();

    Ok(JitProgram {
        module: Some(module),
        initialize,
        iterate,
        bailout,
        symbol_slots,
    })
}

/// Compile one section body into its own `extern "C" fn()`. The section
/// result is stored to the `_result` slot before returning.
fn compile_section(
    state: &mut SessionState<'_>,
    ctx: &mut Context,
    builder_ctx: &mut FunctionBuilderContext,
    name: &str,
    expr: &Expr,
) -> Result<FuncId, JitError> {
    let signature = state.module.make_signature();
    let func_id = state
        .module
        .declare_function(name, Linkage::Export, &signature)
        .map_err(|err| JitError::FunctionCompilation(err.to_string()))?;

    ctx.func = Function::with_name_signature(UserFuncName::user(0, func_id.as_u32()), signature);

    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, builder_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);

        let mut compiler = SectionCompiler::new(state, builder)?;
        let value = compiler.emit(expr)?;
        compiler.store_result(value)?;

        let mut builder = compiler.finish();
        builder.ins().return_(&[]);
        builder.seal_all_blocks();
        builder.finalize();
    }

    state
        .module
        .define_function(func_id, ctx)
        .map_err(|err| JitError::FunctionCompilation(err.to_string()))?;
    state.module.clear_context(ctx);
    Ok(func_id)
}

/// Bind every unbound label: constants from their values, symbols from
/// the live host table.
fn emit_data_section(
    module: &mut JITModule,
    layout: &mut DataLayout,
    symbols: &mut SymbolTable,
) -> Result<(), JitError> {
    for (name, binding) in layout.symbols.iter_mut() {
        if binding.bound {
            continue;
        }
        binding.bound = true;
        let value = symbols.get_or_insert(name);
        define_complex(module, binding.id, value)?;
    }
    for (key, binding) in layout.constants.iter_mut() {
        if binding.bound {
            continue;
        }
        binding.bound = true;
        define_complex(module, binding.id, key.0)?;
    }
    Ok(())
}

fn define_complex(module: &mut JITModule, id: DataId, value: Complex) -> Result<(), JitError> {
    let mut bytes = Vec::with_capacity(16);
    bytes.extend_from_slice(&value.re.to_ne_bytes());
    bytes.extend_from_slice(&value.im.to_ne_bytes());

    let mut description = DataDescription::new();
    description.define(bytes.into_boxed_slice());
    description.set_align(16);
    module
        .define_data(id, &description)
        .map_err(|err| JitError::DataEmission(err.to_string()))
}
