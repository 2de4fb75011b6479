//! The `sys` package: output, exit, math and `StringBuilder`

use std::collections::HashMap;
use std::io::Write;

use super::{NativeBuilder, NativeContext};
use crate::interp::{InterpResult, RuntimeError, Value};
use crate::symbols::{ContainerSymbol, SymbolIds, SymbolTable, TypeSymbol};

pub const PACKAGE: &str = "sys";
const BUILDER: &str = "StringBuilder";
const BUFFER: &str = "buffer";

pub fn register(table: &mut SymbolTable, ids: &mut SymbolIds) {
    let builder_ty = TypeSymbol::container(BUILDER);
    let mut natives = NativeBuilder::new(ids, PACKAGE);

    let functions = [
        natives.function("Print", &[("text", TypeSymbol::string())], TypeSymbol::void(), print),
        natives.function("Write", &[("text", TypeSymbol::string())], TypeSymbol::void(), write),
        natives.function("Exit", &[("code", TypeSymbol::int())], TypeSymbol::void(), exit),
        natives.function("Sqrt", &[("x", TypeSymbol::double())], TypeSymbol::double(), sqrt),
        natives.function("Abs", &[("n", TypeSymbol::int())], TypeSymbol::int(), abs),
        natives.function("Builder", &[], builder_ty.clone(), builder),
    ];

    let container = ContainerSymbol {
        ty: builder_ty.clone(),
        fields: vec![natives.field(BUFFER, TypeSymbol::string())],
        methods: vec![
            natives.method(&builder_ty, "Append", &[("text", TypeSymbol::string())], TypeSymbol::void(), append),
            natives.method(&builder_ty, "Build", &[], TypeSymbol::string(), build),
            natives.method(&builder_ty, "Length", &[], TypeSymbol::int(), length),
            natives.method(&builder_ty, "Clear", &[], TypeSymbol::void(), clear),
        ],
    };

    table.register_container(container);
    let package = table.ensure_package(PACKAGE);
    for function in functions {
        package.register_function(function);
    }
}

fn emit(ctx: &mut NativeContext<'_>, text: &str, newline: bool) -> InterpResult<Value> {
    let result = if newline {
        writeln!(ctx.out, "{text}")
    } else {
        write!(ctx.out, "{text}")
    };
    result.map_err(|e| RuntimeError::native(format!("cannot write output: {e}")))?;
    Ok(Value::Void)
}

fn print(ctx: &mut NativeContext<'_>, args: &[Value]) -> InterpResult<Value> {
    emit(ctx, arg(args, 0)?.as_str()?, true)
}

fn write(ctx: &mut NativeContext<'_>, args: &[Value]) -> InterpResult<Value> {
    emit(ctx, arg(args, 0)?.as_str()?, false)
}

fn exit(ctx: &mut NativeContext<'_>, args: &[Value]) -> InterpResult<Value> {
    let code = arg(args, 0)?.as_int()?;
    ctx.out
        .flush()
        .map_err(|e| RuntimeError::native(format!("cannot flush output: {e}")))?;
    Err(RuntimeError::exit(code as i32))
}

fn sqrt(_: &mut NativeContext<'_>, args: &[Value]) -> InterpResult<Value> {
    match arg(args, 0)? {
        Value::Double(x) => Ok(Value::Double(x.sqrt())),
        other => Err(RuntimeError::operand_mismatch("double", other.type_name())),
    }
}

fn abs(_: &mut NativeContext<'_>, args: &[Value]) -> InterpResult<Value> {
    match arg(args, 0)? {
        Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
        other => Err(RuntimeError::operand_mismatch("int", other.type_name())),
    }
}

fn builder(_: &mut NativeContext<'_>, _: &[Value]) -> InterpResult<Value> {
    let fields = HashMap::from([(BUFFER.to_string(), Value::str(""))]);
    Ok(Value::container(TypeSymbol::container(BUILDER), fields))
}

fn arg(args: &[Value], index: usize) -> InterpResult<&Value> {
    args.get(index)
        .ok_or_else(|| RuntimeError::native(format!("missing argument {index}")))
}

/// Run `f` on the buffer of a `StringBuilder` receiver
fn with_buffer<T>(receiver: &Value, f: impl FnOnce(&mut String) -> T) -> InterpResult<T> {
    let Value::Container(instance) = receiver else {
        return Err(RuntimeError::operand_mismatch(BUILDER, receiver.type_name()));
    };
    let mut instance = instance.borrow_mut();
    let mut buffer = match instance.fields.get(BUFFER) {
        Some(Value::Str(s)) => s.to_string(),
        _ => String::new(),
    };
    let result = f(&mut buffer);
    instance
        .fields
        .insert(BUFFER.to_string(), Value::str(&buffer));
    Ok(result)
}

fn append(_: &mut NativeContext<'_>, receiver: &Value, args: &[Value]) -> InterpResult<Value> {
    let text = arg(args, 0)?.as_str()?.to_string();
    with_buffer(receiver, |buffer| buffer.push_str(&text))?;
    Ok(Value::Void)
}

fn build(_: &mut NativeContext<'_>, receiver: &Value, _: &[Value]) -> InterpResult<Value> {
    with_buffer(receiver, |buffer| Value::str(buffer))
}

fn length(_: &mut NativeContext<'_>, receiver: &Value, _: &[Value]) -> InterpResult<Value> {
    with_buffer(receiver, |buffer| Value::Int(buffer.chars().count() as i32))
}

fn clear(_: &mut NativeContext<'_>, receiver: &Value, _: &[Value]) -> InterpResult<Value> {
    with_buffer(receiver, String::clear)?;
    Ok(Value::Void)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    #[test]
    fn test_print_and_write() {
        let mut out = Vec::new();
        let mut ctx = NativeContext { out: &mut out };
        print(&mut ctx, &[Value::str("a")]).unwrap();
        write(&mut ctx, &[Value::str("b")]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb");
    }

    #[test]
    fn test_exit_unwinds() {
        let mut out = Vec::new();
        let mut ctx = NativeContext { out: &mut out };
        let err = exit(&mut ctx, &[Value::Int(3)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Exit(3));
    }

    #[test]
    fn test_string_builder() {
        let mut out = Vec::new();
        let mut ctx = NativeContext { out: &mut out };
        let sb = builder(&mut ctx, &[]).unwrap();
        append(&mut ctx, &sb, &[Value::str("ab")]).unwrap();
        append(&mut ctx, &sb, &[Value::str("c")]).unwrap();
        assert_eq!(length(&mut ctx, &sb, &[]).unwrap(), Value::Int(3));
        assert_eq!(build(&mut ctx, &sb, &[]).unwrap(), Value::str("abc"));
        clear(&mut ctx, &sb, &[]).unwrap();
        assert_eq!(build(&mut ctx, &sb, &[]).unwrap(), Value::str(""));
    }

    #[test]
    fn test_math() {
        let mut out = Vec::new();
        let mut ctx = NativeContext { out: &mut out };
        assert_eq!(sqrt(&mut ctx, &[Value::Double(9.0)]).unwrap(), Value::Double(3.0));
        assert_eq!(abs(&mut ctx, &[Value::Int(-4)]).unwrap(), Value::Int(4));
    }
}
