//! Package and type registry
//!
//! Every insertion is first-registration-wins: a duplicate name is refused and
//! the existing entry stays untouched.

use std::collections::HashMap;

use super::{ContainerSymbol, FunctionRef, TypeSymbol, VariableRef};

/// A package: its functions, globals and what it loads
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    /// Functions in registration order
    functions: Vec<FunctionRef>,
    function_index: HashMap<String, usize>,
    globals: Vec<VariableRef>,
    /// Every loaded package, in declaration order
    loads: Vec<String>,
    /// Loaded packages that join unqualified lookup, in declaration order
    includes: Vec<String>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Package {
            name: name.into(),
            functions: Vec::new(),
            function_index: HashMap::new(),
            globals: Vec::new(),
            loads: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// Register a function; returns `false` if the name is taken
    pub fn register_function(&mut self, function: FunctionRef) -> bool {
        if self.function_index.contains_key(&function.name) {
            return false;
        }
        self.function_index
            .insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
        true
    }

    pub fn function(&self, name: &str) -> Option<&FunctionRef> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    pub fn functions(&self) -> &[FunctionRef] {
        &self.functions
    }

    /// Register a global; returns `false` if the name is taken
    pub fn register_global(&mut self, variable: VariableRef) -> bool {
        if self.global(&variable.name).is_some() {
            return false;
        }
        self.globals.push(variable);
        true
    }

    pub fn global(&self, name: &str) -> Option<&VariableRef> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn globals(&self) -> &[VariableRef] {
        &self.globals
    }

    /// Record a `load`; repeated loads of the same package are ignored
    pub fn add_load(&mut self, package: &str, include: bool) {
        if !self.loads.iter().any(|p| p == package) {
            self.loads.push(package.to_string());
        }
        if include && !self.includes.iter().any(|p| p == package) {
            self.includes.push(package.to_string());
        }
    }

    pub fn loads(&self) -> &[String] {
        &self.loads
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Whether `package` may be named in a qualified call from this package
    pub fn can_reference(&self, package: &str) -> bool {
        package == self.name || self.loads.iter().any(|p| p == package)
    }
}

/// Registry of packages, named types and native containers
#[derive(Debug, Clone)]
pub struct SymbolTable {
    packages: HashMap<String, Package>,
    types: HashMap<String, TypeSymbol>,
    containers: HashMap<String, ContainerSymbol>,
}

impl SymbolTable {
    /// Create a table holding the built-in types and no packages
    pub fn new() -> Self {
        let mut table = SymbolTable {
            packages: HashMap::new(),
            types: HashMap::new(),
            containers: HashMap::new(),
        };
        for ty in TypeSymbol::builtins() {
            table.register_type(ty);
        }
        table
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Get a package, creating it empty on first use
    pub fn ensure_package(&mut self, name: &str) -> &mut Package {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| Package::new(name))
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Register a named type; returns `false` if the name is taken
    pub fn register_type(&mut self, ty: TypeSymbol) -> bool {
        if self.types.contains_key(ty.name()) {
            return false;
        }
        self.types.insert(ty.name().to_string(), ty);
        true
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeSymbol> {
        self.types.get(name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Register a container and its type; returns `false` if the name is taken
    pub fn register_container(&mut self, container: ContainerSymbol) -> bool {
        if !self.register_type(container.ty.clone()) {
            return false;
        }
        self.containers
            .insert(container.ty.name().to_string(), container);
        true
    }

    pub fn container(&self, ty: &TypeSymbol) -> Option<&ContainerSymbol> {
        self.containers.get(ty.name()).filter(|c| c.ty == *ty)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
