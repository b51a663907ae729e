//! The type lattice used for method dispatch
//!
//! Types form a single-inheritance tree rooted at `Any`. A method parameter
//! annotated with `T` accepts any value whose type is a subtype of `T`.

use std::fmt;

/// A type in the lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Any,
    Number,
    Real,
    Integer,
    AbstractFloat,
    Int64,
    Float64,
    Bool,
    AbstractString,
    String,
    Nothing,
    Tuple,
    NamedTuple,
    AbstractArray,
    Vector,
    UnitRange,
    Function,
    DataType,
    Module,
}

impl Type {
    /// Immediate supertype; `None` for `Any`
    pub fn parent(self) -> Option<Type> {
        use Type::*;
        Some(match self {
            Any => return None,
            Number | AbstractString | Nothing | Tuple | NamedTuple | AbstractArray | Function | DataType
            | Module => Any,
            Real => Number,
            Integer | AbstractFloat => Real,
            Int64 | Bool => Integer,
            Float64 => AbstractFloat,
            String => AbstractString,
            Vector | UnitRange => AbstractArray,
        })
    }

    /// `self <: other`
    pub fn is_subtype(self, other: Type) -> bool {
        let mut current = Some(self);
        while let Some(t) = current {
            if t == other {
                return true;
            }
            current = t.parent();
        }
        false
    }

    /// Distance from `Any`; deeper types are more specific
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(t) = current {
            depth += 1;
            current = t.parent();
        }
        depth
    }

    /// Resolve a type name as written in source, accepting common aliases
    pub fn from_name(name: &str) -> Option<Type> {
        use Type::*;
        Some(match name {
            "Any" => Any,
            "Number" => Number,
            "Real" => Real,
            "Integer" => Integer,
            "AbstractFloat" => AbstractFloat,
            "Int" | "Int64" => Int64,
            "Float64" => Float64,
            "Bool" => Bool,
            "AbstractString" => AbstractString,
            "String" => String,
            "Nothing" => Nothing,
            "Tuple" => Tuple,
            "NamedTuple" => NamedTuple,
            "AbstractArray" | "AbstractVector" => AbstractArray,
            "Vector" | "Array" => Vector,
            "UnitRange" => UnitRange,
            "Function" => Function,
            "DataType" | "Type" => DataType,
            "Module" => Module,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use Type::*;
        match self {
            Any => "Any",
            Number => "Number",
            Real => "Real",
            Integer => "Integer",
            AbstractFloat => "AbstractFloat",
            Int64 => "Int64",
            Float64 => "Float64",
            Bool => "Bool",
            AbstractString => "AbstractString",
            String => "String",
            Nothing => "Nothing",
            Tuple => "Tuple",
            NamedTuple => "NamedTuple",
            AbstractArray => "AbstractArray",
            Vector => "Vector",
            UnitRange => "UnitRange",
            Function => "Function",
            DataType => "DataType",
            Module => "Module",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtyping() {
        assert!(Type::Int64.is_subtype(Type::Real));
        assert!(Type::Int64.is_subtype(Type::Any));
        assert!(Type::Bool.is_subtype(Type::Integer));
        assert!(!Type::Float64.is_subtype(Type::Integer));
        assert!(!Type::Real.is_subtype(Type::Int64));
        assert!(Type::Vector.is_subtype(Type::AbstractArray));
    }

    #[test]
    fn test_depth_orders_specificity() {
        assert!(Type::Int64.depth() > Type::Real.depth());
        assert_eq!(Type::Any.depth(), 0);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Type::from_name("Int"), Some(Type::Int64));
        assert_eq!(Type::from_name("Array"), Some(Type::Vector));
        assert_eq!(Type::from_name("Widget"), None);
    }
}
