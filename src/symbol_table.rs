//! Name resolution for the code generator.
//!
//! A class is compiled with two tables: one for static and field variables that lives for the
//! whole class, and one for arguments and locals that is reset for every subroutine.

use std::collections::HashMap;
use std::fmt;

use crate::jack::ast::Type;
use crate::vm::Segment;

/// Storage class of a declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// The segment through which variables of this kind are accessed.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }

    fn slot(self) -> usize {
        match self {
            Kind::Static => 0,
            Kind::Field => 1,
            Kind::Argument => 2,
            Kind::Local => 3,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Argument => "argument",
            Kind::Local => "local",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub ty: Type,
    pub kind: Kind,
    /// Position among the symbols of the same kind in the same table.
    pub index: u16,
}

/// Returned when a name is declared twice in the same scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Redefinition {
    pub name: String,
    pub previous: Symbol,
}

impl fmt::Display for Redefinition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "'{}' is already declared as {} {} {}",
            self.name, self.previous.kind, self.previous.ty, self.previous.index,
        )
    }
}

impl std::error::Error for Redefinition {}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    counts: [u16; 4],
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Forgets every symbol and restarts all indices from zero.
    pub fn reset(&mut self) {
        self.symbols.clear();
        self.counts = [0; 4];
    }

    /// Declares `name` and assigns it the next index of its kind.
    pub fn define<S: Into<String>>(&mut self, name: S, ty: Type, kind: Kind) -> Result<u16, Redefinition> {
        let name = name.into();

        if let Some(previous) = self.symbols.get(&name) {
            return Err(Redefinition {
                name,
                previous: previous.clone(),
            });
        }

        let index = self.counts[kind.slot()];
        self.counts[kind.slot()] += 1;

        self.symbols.insert(name, Symbol { ty, kind, index });

        Ok(index)
    }

    /// Number of symbols of `kind` defined so far.
    pub fn var_count(&self, kind: Kind) -> u16 {
        self.counts[kind.slot()]
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.get(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.get(name).map(|s| &s.ty)
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.get(name).map(|s| s.index)
    }

    pub fn names(&self) -> impl Iterator<Item=&str> {
        self.symbols.keys().map(|k| &**k)
    }
}

/// Class and subroutine tables with subroutine-first lookup.
#[derive(Debug, Clone, Default)]
pub struct Scopes {
    pub class: SymbolTable,
    pub subroutine: SymbolTable,
}

impl Scopes {
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.subroutine.get(name)
            .or_else(|| self.class.get(name))
    }

    /// The visible name closest to `name`, for diagnostics.
    pub fn suggest(&self, name: &str) -> Option<&str> {
        self.subroutine.names()
            .chain(self.class.names())
            .map(|candidate| (edit_distance::edit_distance(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= 2)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate)
    }
}
