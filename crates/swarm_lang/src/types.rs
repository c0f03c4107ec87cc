//! The Swarm type system.
//!
//! Types are plain values compared structurally, with two deliberate
//! exceptions: primitives are canonical constants compared by kind, and
//! object types are nominal — two object types are equal only when they come
//! from the same declaration site, regardless of their property lists.
//!
//! Functions are curried: an n-argument function is a chain of single
//! parameter lambdas, and a zero-argument function is a lambda whose
//! parameter slot is `void`. [`Type::lambda_of`] builds either shape.
//!
//! [`Type::Ambiguous`] exists only between parsing and name analysis. Every
//! type reaching type analysis must survive [`Type::disambiguate_statically`].

use std::fmt;

/// The primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Number,
    String,
    Void,
    /// The type of type literals themselves.
    Type,
    /// The unit value produced by statements and void calls.
    Unit,
    /// Placeholder for positions the analyses have not reached yet. Must not
    /// survive type analysis.
    Error,
}

/// Flat classification of a type, used by passes that dispatch on shape
/// without caring about element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    Boolean,
    Number,
    String,
    Void,
    Type,
    Unit,
    Error,
    Enumerable,
    Map,
    Lambda,
    Object,
    Ambiguous,
}

/// An object (class) type: named, with ordered properties and at most one
/// parent. Identity is the declaration site, carried as `id`.
#[derive(Debug, Clone)]
pub struct ObjectType {
    /// Declaration-site identity. Two `ObjectType`s with equal `id` denote
    /// the same type everywhere, including across serialization.
    pub id: String,
    pub name: String,
    /// Own properties, in declaration order. Parent properties are reached
    /// through `parent`.
    pub properties: Vec<(String, Type)>,
    pub parent: Option<Box<ObjectType>>,
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl ObjectType {
    /// Looks up a property by name, searching the parent chain after own
    /// properties.
    pub fn property(&self, name: &str) -> Option<&Type> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
            .or_else(|| self.parent.as_ref().and_then(|p| p.property(name)))
    }

    /// All properties, parent-first, in declaration order. Used when
    /// constructing instances.
    pub fn all_properties(&self) -> Vec<(String, Type)> {
        let mut out = match &self.parent {
            Some(parent) => parent.all_properties(),
            None => Vec::new(),
        };
        for (name, ty) in &self.properties {
            match out.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = ty.clone(),
                None => out.push((name.clone(), ty.clone())),
            }
        }
        out
    }
}

/// A Swarm type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(Primitive),
    /// Homogeneous ordered sequence.
    Enumerable(Box<Type>),
    /// String-keyed, insertion-order-independent mapping.
    Map(Box<Type>),
    /// One curried parameter. Zero-argument functions use a `void` parameter.
    Lambda { param: Box<Type>, ret: Box<Type> },
    Object(ObjectType),
    /// Pre-disambiguation placeholder holding its candidate constraints.
    Ambiguous(Vec<Type>),
}

impl Type {
    pub const BOOLEAN: Type = Type::Primitive(Primitive::Boolean);
    pub const NUMBER: Type = Type::Primitive(Primitive::Number);
    pub const STRING: Type = Type::Primitive(Primitive::String);
    pub const VOID: Type = Type::Primitive(Primitive::Void);
    pub const TYPE: Type = Type::Primitive(Primitive::Type);
    pub const UNIT: Type = Type::Primitive(Primitive::Unit);
    pub const ERROR: Type = Type::Primitive(Primitive::Error);

    pub fn enumerable(values: Type) -> Type {
        Type::Enumerable(Box::new(values))
    }

    pub fn map(values: Type) -> Type {
        Type::Map(Box::new(values))
    }

    pub fn lambda(param: Type, ret: Type) -> Type {
        Type::Lambda {
            param: Box::new(param),
            ret: Box::new(ret),
        }
    }

    /// Curries a parameter list into nested lambdas. An empty list yields the
    /// zero-argument shape `void -> ret`.
    pub fn lambda_of(params: &[Type], ret: Type) -> Type {
        if params.is_empty() {
            return Type::lambda(Type::VOID, ret);
        }
        params
            .iter()
            .rev()
            .fold(ret, |acc, param| Type::lambda(param.clone(), acc))
    }

    pub fn intrinsic(&self) -> Intrinsic {
        match self {
            Type::Primitive(Primitive::Boolean) => Intrinsic::Boolean,
            Type::Primitive(Primitive::Number) => Intrinsic::Number,
            Type::Primitive(Primitive::String) => Intrinsic::String,
            Type::Primitive(Primitive::Void) => Intrinsic::Void,
            Type::Primitive(Primitive::Type) => Intrinsic::Type,
            Type::Primitive(Primitive::Unit) => Intrinsic::Unit,
            Type::Primitive(Primitive::Error) => Intrinsic::Error,
            Type::Enumerable(_) => Intrinsic::Enumerable,
            Type::Map(_) => Intrinsic::Map,
            Type::Lambda { .. } => Intrinsic::Lambda,
            Type::Object(_) => Intrinsic::Object,
            Type::Ambiguous(_) => Intrinsic::Ambiguous,
        }
    }

    /// A type is concrete when no `Ambiguous` or `Error` appears anywhere in
    /// it. Every expression must have a concrete type after type analysis.
    pub fn is_concrete(&self) -> bool {
        match self {
            Type::Primitive(Primitive::Error) => false,
            Type::Primitive(_) => true,
            Type::Enumerable(t) | Type::Map(t) => t.is_concrete(),
            Type::Lambda { param, ret } => param.is_concrete() && ret.is_concrete(),
            Type::Object(obj) => obj.properties.iter().all(|(_, t)| t.is_concrete()),
            Type::Ambiguous(_) => false,
        }
    }

    /// Assignability is equality, except that lambdas are covariant in their
    /// return type: `p -> r1` is assignable to `p -> r2` iff `r1` is
    /// assignable to `r2`.
    pub fn is_assignable_to(&self, to: &Type) -> bool {
        match (self, to) {
            (
                Type::Lambda { param: p1, ret: r1 },
                Type::Lambda { param: p2, ret: r2 },
            ) => p1 == p2 && r1.is_assignable_to(r2),
            _ => self == to,
        }
    }

    /// Narrows an `Ambiguous` to a concrete type, recursing through
    /// containers. Fails with a description when the constraint set does not
    /// pin down exactly one candidate.
    pub fn disambiguate_statically(&self) -> Result<Type, String> {
        match self {
            Type::Primitive(_) => Ok(self.clone()),
            Type::Enumerable(t) => Ok(Type::enumerable(t.disambiguate_statically()?)),
            Type::Map(t) => Ok(Type::map(t.disambiguate_statically()?)),
            Type::Lambda { param, ret } => Ok(Type::lambda(
                param.disambiguate_statically()?,
                ret.disambiguate_statically()?,
            )),
            Type::Object(obj) => {
                let mut properties = Vec::with_capacity(obj.properties.len());
                for (name, ty) in &obj.properties {
                    properties.push((name.clone(), ty.disambiguate_statically()?));
                }
                Ok(Type::Object(ObjectType {
                    id: obj.id.clone(),
                    name: obj.name.clone(),
                    properties,
                    parent: obj.parent.clone(),
                }))
            }
            Type::Ambiguous(constraints) => {
                let mut unique: Vec<&Type> = Vec::new();
                for candidate in constraints {
                    if !unique.contains(&candidate) {
                        unique.push(candidate);
                    }
                }
                match unique.as_slice() {
                    [single] => single.disambiguate_statically(),
                    [] => Err("ambiguous type has no candidates".into()),
                    _ => Err(format!(
                        "ambiguous type has {} viable candidates",
                        unique.len()
                    )),
                }
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(Primitive::Boolean) => write!(f, "boolean"),
            Type::Primitive(Primitive::Number) => write!(f, "number"),
            Type::Primitive(Primitive::String) => write!(f, "string"),
            Type::Primitive(Primitive::Void) => write!(f, "void"),
            Type::Primitive(Primitive::Type) => write!(f, "type"),
            Type::Primitive(Primitive::Unit) => write!(f, "unit"),
            Type::Primitive(Primitive::Error) => write!(f, "<error>"),
            Type::Enumerable(t) => write!(f, "enumerable<{t}>"),
            Type::Map(t) => write!(f, "map<{t}>"),
            Type::Lambda { param, ret } => write!(f, "({param} -> {ret})"),
            Type::Object(obj) => write!(f, "{}", obj.name),
            Type::Ambiguous(cands) => write!(f, "ambiguous<{} candidates>", cands.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str, name: &str, properties: Vec<(String, Type)>) -> ObjectType {
        ObjectType {
            id: id.into(),
            name: name.into(),
            properties,
            parent: None,
        }
    }

    #[test]
    fn primitive_equality_is_by_kind() {
        assert_eq!(Type::NUMBER, Type::NUMBER);
        assert_ne!(Type::NUMBER, Type::STRING);
    }

    #[test]
    fn container_equality_is_structural() {
        assert_eq!(
            Type::enumerable(Type::NUMBER),
            Type::enumerable(Type::NUMBER)
        );
        assert_ne!(Type::enumerable(Type::NUMBER), Type::map(Type::NUMBER));
    }

    #[test]
    fn object_equality_is_nominal() {
        let a = object("site-1", "Point", vec![("x".into(), Type::NUMBER)]);
        let b = object("site-1", "Point", vec![]);
        let c = object("site-2", "Point", vec![("x".into(), Type::NUMBER)]);
        assert_eq!(Type::Object(a.clone()), Type::Object(b));
        assert_ne!(Type::Object(a), Type::Object(c));
    }

    #[test]
    fn lambda_of_curries_left_to_right() {
        let ty = Type::lambda_of(&[Type::NUMBER, Type::STRING], Type::BOOLEAN);
        assert_eq!(
            ty,
            Type::lambda(Type::NUMBER, Type::lambda(Type::STRING, Type::BOOLEAN))
        );
    }

    #[test]
    fn lambda_of_empty_params_uses_void_slot() {
        assert_eq!(
            Type::lambda_of(&[], Type::NUMBER),
            Type::lambda(Type::VOID, Type::NUMBER)
        );
    }

    #[test]
    fn assignability_is_covariant_in_lambda_returns() {
        let wide = Type::lambda(Type::NUMBER, Type::lambda(Type::VOID, Type::NUMBER));
        let narrow = Type::lambda(Type::NUMBER, Type::lambda(Type::VOID, Type::NUMBER));
        assert!(narrow.is_assignable_to(&wide));

        let different_param = Type::lambda(Type::STRING, Type::NUMBER);
        let number_param = Type::lambda(Type::NUMBER, Type::NUMBER);
        assert!(!different_param.is_assignable_to(&number_param));
    }

    #[test]
    fn disambiguation_accepts_a_single_candidate() {
        let ambiguous = Type::Ambiguous(vec![Type::NUMBER, Type::NUMBER]);
        assert_eq!(ambiguous.disambiguate_statically().unwrap(), Type::NUMBER);
    }

    #[test]
    fn disambiguation_rejects_competing_candidates() {
        let ambiguous = Type::Ambiguous(vec![Type::NUMBER, Type::STRING]);
        assert!(ambiguous.disambiguate_statically().is_err());

        let nested = Type::enumerable(Type::Ambiguous(vec![]));
        assert!(nested.disambiguate_statically().is_err());
    }

    #[test]
    fn parent_properties_are_visible_through_child() {
        let parent = object("p", "Base", vec![("tag".into(), Type::STRING)]);
        let child = ObjectType {
            id: "c".into(),
            name: "Derived".into(),
            properties: vec![("x".into(), Type::NUMBER)],
            parent: Some(Box::new(parent)),
        };
        assert_eq!(child.property("tag"), Some(&Type::STRING));
        assert_eq!(child.property("x"), Some(&Type::NUMBER));
        assert_eq!(child.property("missing"), None);

        let all = child.all_properties();
        assert_eq!(all[0].0, "tag");
        assert_eq!(all[1].0, "x");
    }

    #[test]
    fn concreteness_excludes_error_and_ambiguous() {
        assert!(Type::enumerable(Type::NUMBER).is_concrete());
        assert!(!Type::ERROR.is_concrete());
        assert!(!Type::map(Type::Ambiguous(vec![])).is_concrete());
    }
}
