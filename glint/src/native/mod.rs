//! Natively implemented packages
//!
//! Native functions are registered into the symbol table before binding and
//! are called by the evaluator with already evaluated arguments.

mod sys;

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::interp::{InterpResult, Value};
use crate::symbols::{
    FunctionKind, FunctionRef, FunctionSymbol, SymbolIds, SymbolTable, TypeSymbol, VariableKind,
};

/// What a native callable can reach besides its arguments
pub struct NativeContext<'a> {
    /// Sink for everything the program prints
    pub out: &'a mut dyn Write,
}

/// Native function: `(context, arguments) -> value`
pub type NativeFn = fn(&mut NativeContext<'_>, &[Value]) -> InterpResult<Value>;

/// Native method: `(context, receiver, arguments) -> value`
pub type NativeMethod = fn(&mut NativeContext<'_>, &Value, &[Value]) -> InterpResult<Value>;

/// Host callable behind a native function symbol
#[derive(Clone, Copy)]
pub enum NativeCallable {
    Function(NativeFn),
    Method(NativeMethod),
}

impl NativeCallable {
    pub fn invoke(
        &self,
        context: &mut NativeContext<'_>,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> InterpResult<Value> {
        match (self, receiver) {
            (NativeCallable::Function(f), _) => f(context, args),
            (NativeCallable::Method(m), Some(receiver)) => m(context, receiver, args),
            (NativeCallable::Method(_), None) => Err(crate::interp::RuntimeError::native(
                "native method called without a receiver",
            )),
        }
    }
}

impl fmt::Debug for NativeCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCallable::Function(_) => f.write_str("NativeCallable::Function"),
            NativeCallable::Method(_) => f.write_str("NativeCallable::Method"),
        }
    }
}

/// Builds native function symbols with fresh ids
pub(crate) struct NativeBuilder<'a> {
    ids: &'a mut SymbolIds,
    package: &'static str,
}

impl<'a> NativeBuilder<'a> {
    pub(crate) fn new(ids: &'a mut SymbolIds, package: &'static str) -> Self {
        NativeBuilder { ids, package }
    }

    fn symbol(
        &mut self,
        name: &str,
        params: &[(&str, TypeSymbol)],
        return_type: TypeSymbol,
        receiver: Option<TypeSymbol>,
        callable: NativeCallable,
    ) -> FunctionRef {
        let params = params
            .iter()
            .map(|(param, ty)| self.ids.variable(param, ty.clone(), VariableKind::Parameter))
            .collect();
        let receiver = receiver.map(|ty| self.ids.variable("this", ty, VariableKind::Instance));
        Rc::new(FunctionSymbol {
            id: self.ids.function(),
            name: name.to_string(),
            package: self.package.to_string(),
            params,
            return_type,
            receiver,
            kind: FunctionKind::Native(callable),
        })
    }

    pub(crate) fn function(
        &mut self,
        name: &str,
        params: &[(&str, TypeSymbol)],
        return_type: TypeSymbol,
        f: NativeFn,
    ) -> FunctionRef {
        self.symbol(name, params, return_type, None, NativeCallable::Function(f))
    }

    pub(crate) fn method(
        &mut self,
        container: &TypeSymbol,
        name: &str,
        params: &[(&str, TypeSymbol)],
        return_type: TypeSymbol,
        m: NativeMethod,
    ) -> FunctionRef {
        self.symbol(
            name,
            params,
            return_type,
            Some(container.clone()),
            NativeCallable::Method(m),
        )
    }

    pub(crate) fn field(&mut self, name: &str, ty: TypeSymbol) -> crate::symbols::VariableRef {
        self.ids.variable(name, ty, VariableKind::Field)
    }
}

/// Register every native package
pub fn register_natives(table: &mut SymbolTable, ids: &mut SymbolIds) {
    sys::register(table, ids);
    tracing::debug!("registered native packages");
}
