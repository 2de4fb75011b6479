//! Runtime values
//!
//! Scalars are copied by value. Arrays and containers are shared handles:
//! cloning a `Value::Array` aliases the same instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::error::{InterpResult, RuntimeError};
use crate::bound::{BinaryOperator, Constant, UnaryOperator};
use crate::symbols::{SymbolTable, TypeGroup, TypeSymbol};

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInstance {
    pub element_type: TypeSymbol,
    pub elements: Vec<Value>,
}

pub type ArrayRef = Rc<RefCell<ArrayInstance>>;

/// Instance of a native container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInstance {
    pub ty: TypeSymbol,
    pub fields: HashMap<String, Value>,
}

pub type ContainerRef = Rc<RefCell<ContainerInstance>>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(Rc<str>),
    Array(ArrayRef),
    Container(ContainerRef),
    Void,
}

impl Value {
    /// Zero value of `ty`; containers get a fresh instance with defaulted fields
    pub fn default_for(ty: &TypeSymbol, table: &SymbolTable) -> Value {
        match ty.name() {
            "byte" => Value::Byte(0),
            "short" => Value::Short(0),
            "int" => Value::Int(0),
            "long" => Value::Long(0),
            "float" => Value::Float(0.0),
            "double" => Value::Double(0.0),
            "bool" => Value::Bool(false),
            "string" => Value::Str(Rc::from("")),
            _ => match (ty.group(), ty.element_type(), table.container(ty)) {
                (TypeGroup::Array, Some(element), _) => Value::array(element.clone(), Vec::new()),
                (TypeGroup::Container, _, Some(container)) => {
                    let fields = container
                        .fields
                        .iter()
                        .map(|f| (f.name.clone(), Value::default_for(&f.ty, table)))
                        .collect();
                    Value::container(ty.clone(), fields)
                }
                _ => Value::Void,
            },
        }
    }

    pub fn array(element_type: TypeSymbol, elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(ArrayInstance {
            element_type,
            elements,
        })))
    }

    pub fn container(ty: TypeSymbol, fields: HashMap<String, Value>) -> Value {
        Value::Container(Rc::new(RefCell::new(ContainerInstance { ty, fields })))
    }

    pub fn str(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    pub fn from_constant(constant: &Constant) -> Value {
        match constant {
            Constant::Int(n) => Value::Int(*n),
            Constant::Float(x) => Value::Float(*x),
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Container(_) => "container",
            Value::Void => "void",
        }
    }

    /// Integer of any width, widened to `i64`
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Byte(n) => Some(i64::from(*n)),
            Value::Short(n) => Some(i64::from(*n)),
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(f64::from(*x)),
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> InterpResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::operand_mismatch("bool", other.type_name())),
        }
    }

    pub fn as_int(&self) -> InterpResult<i64> {
        self.as_integer()
            .ok_or_else(|| RuntimeError::operand_mismatch("integer", self.type_name()))
    }

    pub fn as_str(&self) -> InterpResult<&str> {
        match self {
            Value::Str(s) => Ok(&**s),
            other => Err(RuntimeError::operand_mismatch("string", other.type_name())),
        }
    }

    /// Integer `n` wrapped to the width of `ty`
    fn integer_of(ty: &TypeSymbol, n: i64) -> Option<Value> {
        Some(match ty.name() {
            "byte" => Value::Byte(n as i8),
            "short" => Value::Short(n as i16),
            "int" => Value::Int(n as i32),
            "long" => Value::Long(n),
            "float" => Value::Float(n as f32),
            "double" => Value::Double(n as f64),
            _ => return None,
        })
    }

    fn float_of(ty: &TypeSymbol, x: f64) -> Option<Value> {
        match ty.name() {
            "float" => Some(Value::Float(x as f32)),
            "double" => Some(Value::Double(x)),
            _ => Self::integer_of(ty, x as i64),
        }
    }

    fn parse_as(ty: &TypeSymbol, text: &str) -> Option<Value> {
        let text = text.trim();
        Some(match ty.name() {
            "byte" => Value::Byte(text.parse().ok()?),
            "short" => Value::Short(text.parse().ok()?),
            "int" => Value::Int(text.parse().ok()?),
            "long" => Value::Long(text.parse().ok()?),
            "float" => Value::Float(text.parse().ok()?),
            "double" => Value::Double(text.parse().ok()?),
            "bool" => Value::Bool(text.parse().ok()?),
            _ => return None,
        })
    }

    /// Convert to `ty` the way a conversion node does
    ///
    /// Numeric casts wrap to the target width; floats truncate toward zero.
    pub fn convert(&self, ty: &TypeSymbol) -> InterpResult<Value> {
        if *ty == TypeSymbol::string() {
            return Ok(match self {
                Value::Str(_) => self.clone(),
                other => Value::str(&other.to_string()),
            });
        }

        let converted = match self {
            Value::Str(s) => Self::parse_as(ty, s),
            _ => match (self.as_integer(), self.as_float()) {
                (Some(n), _) => Self::integer_of(ty, n),
                (_, Some(x)) => Self::float_of(ty, x),
                _ => None,
            },
        };
        converted.ok_or_else(|| RuntimeError::conversion_failed(&self.to_string(), ty.name()))
    }

    /// Apply a unary operator
    pub fn unary(&self, op: UnaryOperator) -> InterpResult<Value> {
        Ok(match (op, self) {
            (UnaryOperator::Identity, value) if value.as_integer().is_some() || value.as_float().is_some() => {
                value.clone()
            }
            (UnaryOperator::Negate, Value::Byte(n)) => Value::Byte(n.wrapping_neg()),
            (UnaryOperator::Negate, Value::Short(n)) => Value::Short(n.wrapping_neg()),
            (UnaryOperator::Negate, Value::Int(n)) => Value::Int(n.wrapping_neg()),
            (UnaryOperator::Negate, Value::Long(n)) => Value::Long(n.wrapping_neg()),
            (UnaryOperator::Negate, Value::Float(x)) => Value::Float(-x),
            (UnaryOperator::Negate, Value::Double(x)) => Value::Double(-x),
            (UnaryOperator::LogicalNot, Value::Bool(b)) => Value::Bool(!b),
            (_, other) => return Err(RuntimeError::operand_mismatch("numeric or bool", other.type_name())),
        })
    }

    /// Apply a binary operator to two operands of the same runtime type
    ///
    /// `&&` and `||` are accepted here too, but the evaluator short-circuits
    /// them before both sides are evaluated.
    pub fn binary(op: BinaryOperator, left: &Value, right: &Value) -> InterpResult<Value> {
        macro_rules! integer {
            ($variant:ident, $a:expr, $b:expr) => {{
                let (a, b) = ($a, $b);
                match op {
                    BinaryOperator::Add => Value::$variant(a.wrapping_add(b)),
                    BinaryOperator::Sub => Value::$variant(a.wrapping_sub(b)),
                    BinaryOperator::Mul => Value::$variant(a.wrapping_mul(b)),
                    BinaryOperator::Div | BinaryOperator::Rem if b == 0 => {
                        return Err(RuntimeError::division_by_zero());
                    }
                    BinaryOperator::Div => Value::$variant(a.wrapping_div(b)),
                    BinaryOperator::Rem => Value::$variant(a.wrapping_rem(b)),
                    _ => Value::Bool(compare(op, &a, &b)?),
                }
            }};
        }
        macro_rules! float {
            ($variant:ident, $a:expr, $b:expr) => {{
                let (a, b) = ($a, $b);
                match op {
                    BinaryOperator::Add => Value::$variant(a + b),
                    BinaryOperator::Sub => Value::$variant(a - b),
                    BinaryOperator::Mul => Value::$variant(a * b),
                    BinaryOperator::Div => Value::$variant(a / b),
                    BinaryOperator::Rem => Value::$variant(a % b),
                    _ => Value::Bool(compare(op, &a, &b)?),
                }
            }};
        }

        Ok(match (left, right) {
            (Value::Byte(a), Value::Byte(b)) => integer!(Byte, *a, *b),
            (Value::Short(a), Value::Short(b)) => integer!(Short, *a, *b),
            (Value::Int(a), Value::Int(b)) => integer!(Int, *a, *b),
            (Value::Long(a), Value::Long(b)) => integer!(Long, *a, *b),
            (Value::Float(a), Value::Float(b)) => float!(Float, *a, *b),
            (Value::Double(a), Value::Double(b)) => float!(Double, *a, *b),
            (Value::Bool(a), Value::Bool(b)) => match op {
                BinaryOperator::And => Value::Bool(*a && *b),
                BinaryOperator::Or => Value::Bool(*a || *b),
                _ => Value::Bool(equality(op, a == b)?),
            },
            (Value::Str(a), Value::Str(b)) => match op {
                BinaryOperator::Concat => Value::Str(Rc::from(format!("{a}{b}"))),
                _ => Value::Bool(equality(op, a == b)?),
            },
            (Value::Array(a), Value::Array(b)) => Value::Bool(equality(op, Rc::ptr_eq(a, b))?),
            (Value::Container(a), Value::Container(b)) => {
                Value::Bool(equality(op, Rc::ptr_eq(a, b))?)
            }
            (a, b) => {
                return Err(RuntimeError::operand_mismatch(a.type_name(), b.type_name()));
            }
        })
    }
}

fn compare<T: PartialOrd>(op: BinaryOperator, a: &T, b: &T) -> InterpResult<bool> {
    Ok(match op {
        BinaryOperator::Eq => a == b,
        BinaryOperator::Ne => a != b,
        BinaryOperator::Lt => a < b,
        BinaryOperator::Gt => a > b,
        BinaryOperator::Le => a <= b,
        BinaryOperator::Ge => a >= b,
        other => {
            return Err(RuntimeError::operand_mismatch(
                "bool or string",
                &format!("numeric operands of `{}`", other.symbol()),
            ));
        }
    })
}

fn equality(op: BinaryOperator, equal: bool) -> InterpResult<bool> {
    match op {
        BinaryOperator::Eq => Ok(equal),
        BinaryOperator::Ne => Ok(!equal),
        other => Err(RuntimeError::operand_mismatch(
            "numeric",
            &format!("operands of `{}`", other.symbol()),
        )),
    }
}

/// Scalars compare by value, arrays and containers by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Container(a), Value::Container(b)) => Rc::ptr_eq(a, b),
            (Value::Void, Value::Void) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(n) => write!(f, "{n}"),
            Value::Short(n) => write!(f, "{n}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(array) => {
                write!(f, "[")?;
                for (i, element) in array.borrow().elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Value::Container(container) => write!(f, "<{}>", container.borrow().ty),
            Value::Void => Ok(()),
        }
    }
}
