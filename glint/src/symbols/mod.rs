//! Symbols shared by the binder, lowerer and evaluator
//!
//! Types, variables and functions are created once and shared through `Rc`.
//! Type equality is structural; variables and functions are identified by the
//! ids handed out by [`SymbolIds`].

pub mod registry;
pub mod scope;

pub use registry::{Package, SymbolTable};
pub use scope::ScopeChain;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::bound::Label;
use crate::native::NativeCallable;

// ============================================================================
// Types
// ============================================================================

/// Family a type belongs to; drives conversion and operator rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeGroup {
    Integer,
    Float,
    /// bool, string, void and the error placeholder
    Opaque,
    Array,
    Container,
}

#[derive(Debug)]
struct TypeData {
    name: String,
    group: TypeGroup,
    subtypes: Vec<TypeSymbol>,
    /// Size class used for numeric promotion
    size: u8,
}

/// A data type, shared by reference and compared structurally
#[derive(Debug, Clone)]
pub struct TypeSymbol(Rc<TypeData>);

impl TypeSymbol {
    fn new(name: &str, group: TypeGroup, subtypes: Vec<TypeSymbol>, size: u8) -> Self {
        TypeSymbol(Rc::new(TypeData {
            name: name.to_string(),
            group,
            subtypes,
            size,
        }))
    }

    pub fn byte() -> Self {
        Self::new("byte", TypeGroup::Integer, Vec::new(), 1)
    }

    pub fn short() -> Self {
        Self::new("short", TypeGroup::Integer, Vec::new(), 2)
    }

    pub fn int() -> Self {
        Self::new("int", TypeGroup::Integer, Vec::new(), 4)
    }

    pub fn long() -> Self {
        Self::new("long", TypeGroup::Integer, Vec::new(), 8)
    }

    pub fn float() -> Self {
        Self::new("float", TypeGroup::Float, Vec::new(), 4)
    }

    pub fn double() -> Self {
        Self::new("double", TypeGroup::Float, Vec::new(), 8)
    }

    pub fn bool() -> Self {
        Self::new("bool", TypeGroup::Opaque, Vec::new(), 1)
    }

    pub fn string() -> Self {
        Self::new("string", TypeGroup::Opaque, Vec::new(), 0)
    }

    pub fn void() -> Self {
        Self::new("void", TypeGroup::Opaque, Vec::new(), 0)
    }

    /// Type of nodes whose binding failed
    pub fn error() -> Self {
        Self::new("?", TypeGroup::Opaque, Vec::new(), 0)
    }

    pub fn array(element: TypeSymbol) -> Self {
        Self::new("array", TypeGroup::Array, vec![element], 0)
    }

    pub fn container(name: &str) -> Self {
        Self::new(name, TypeGroup::Container, Vec::new(), 0)
    }

    /// Every type a source file can name directly
    pub fn builtins() -> Vec<TypeSymbol> {
        vec![
            Self::byte(),
            Self::short(),
            Self::int(),
            Self::long(),
            Self::float(),
            Self::double(),
            Self::bool(),
            Self::string(),
            Self::void(),
        ]
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn group(&self) -> TypeGroup {
        self.0.group
    }

    pub fn subtypes(&self) -> &[TypeSymbol] {
        &self.0.subtypes
    }

    pub fn size(&self) -> u8 {
        self.0.size
    }

    /// Element type of an array type
    pub fn element_type(&self) -> Option<&TypeSymbol> {
        match self.group() {
            TypeGroup::Array => self.0.subtypes.first(),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.group(), TypeGroup::Integer | TypeGroup::Float)
    }

    pub fn is_error(&self) -> bool {
        *self == Self::error()
    }

    pub fn is_void(&self) -> bool {
        *self == Self::void()
    }
}

impl PartialEq for TypeSymbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
            || (self.0.name == other.0.name
                && self.0.group == other.0.group
                && self.0.subtypes == other.0.subtypes)
    }
}

impl Eq for TypeSymbol {}

impl Hash for TypeSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.group.hash(state);
        self.0.subtypes.hash(state);
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for sub in self.subtypes() {
            write!(f, "[{sub}]")?;
        }
        Ok(())
    }
}

// ============================================================================
// Variables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

/// Where a variable lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Parameter,
    /// Package-level; stored process-wide by the evaluator
    Global,
    /// Field of a native container
    Field,
    /// Receiver slot of a native method
    Instance,
}

#[derive(Debug)]
pub struct VariableSymbol {
    pub id: VariableId,
    pub name: String,
    pub ty: TypeSymbol,
    pub kind: VariableKind,
}

pub type VariableRef = Rc<VariableSymbol>;

impl VariableSymbol {
    pub fn is_global(&self) -> bool {
        self.kind == VariableKind::Global
    }
}

// ============================================================================
// Functions and containers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

/// How a function body is provided
#[derive(Debug, Clone)]
pub enum FunctionKind {
    /// Body lives in the bound program under the function's id
    Interpreted,
    /// Host callable
    Native(NativeCallable),
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub id: FunctionId,
    pub name: String,
    /// Owning package
    pub package: String,
    pub params: Vec<VariableRef>,
    pub return_type: TypeSymbol,
    /// Receiver slot for container methods
    pub receiver: Option<VariableRef>,
    pub kind: FunctionKind,
}

pub type FunctionRef = Rc<FunctionSymbol>;

impl FunctionSymbol {
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.package, self.name)
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, FunctionKind::Native(_))
    }
}

/// A natively implemented struct type with fields and methods
#[derive(Debug, Clone)]
pub struct ContainerSymbol {
    pub ty: TypeSymbol,
    pub fields: Vec<VariableRef>,
    pub methods: Vec<FunctionRef>,
}

impl ContainerSymbol {
    pub fn method(&self, name: &str) -> Option<&FunctionRef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

// ============================================================================
// Id generation
// ============================================================================

/// Fresh ids for variables, functions and labels, one counter each per session
#[derive(Debug, Default)]
pub struct SymbolIds {
    next_variable: u32,
    next_function: u32,
    next_label: u32,
}

impl SymbolIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&mut self, name: &str, ty: TypeSymbol, kind: VariableKind) -> VariableRef {
        let id = VariableId(self.next_variable);
        self.next_variable += 1;
        Rc::new(VariableSymbol {
            id,
            name: name.to_string(),
            ty,
            kind,
        })
    }

    pub fn function(&mut self) -> FunctionId {
        let id = FunctionId(self.next_function);
        self.next_function += 1;
        id
    }

    pub fn label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }
}
