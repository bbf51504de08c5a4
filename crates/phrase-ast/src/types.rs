use std::fmt;
use std::ops::BitOr;

/// Bitmask over the runtime types an expression is statically known to
/// produce. This is a parse-time hint only; no inference happens beyond
/// what is syntactically obvious.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSet(u16);

impl TypeSet {
    pub const UNKNOWN: TypeSet = TypeSet(0);
    pub const STRING: TypeSet = TypeSet(1 << 0);
    pub const INTEGER: TypeSet = TypeSet(1 << 1);
    pub const FLOAT: TypeSet = TypeSet(1 << 2);
    pub const BOOLEAN: TypeSet = TypeSet(1 << 3);
    pub const NULL: TypeSet = TypeSet(1 << 4);
    pub const RESOURCE: TypeSet = TypeSet(1 << 5);
    pub const ARRAY: TypeSet = TypeSet(1 << 6);
    pub const OBJECT: TypeSet = TypeSet(1 << 7);
    pub const FUNCTION: TypeSet = TypeSet(1 << 8);

    /// Every value type. Closures carry their own flag.
    pub const ANY: TypeSet = TypeSet(0xff);

    pub fn contains(self, other: TypeSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TypeSet {
    type Output = TypeSet;

    fn bitor(self, rhs: TypeSet) -> TypeSet {
        TypeSet(self.0 | rhs.0)
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(TypeSet, &str)] = &[
            (TypeSet::STRING, "string"),
            (TypeSet::INTEGER, "int"),
            (TypeSet::FLOAT, "float"),
            (TypeSet::BOOLEAN, "bool"),
            (TypeSet::NULL, "null"),
            (TypeSet::RESOURCE, "resource"),
            (TypeSet::ARRAY, "array"),
            (TypeSet::OBJECT, "object"),
            (TypeSet::FUNCTION, "function"),
        ];
        if self.is_unknown() {
            return write!(f, "unknown");
        }
        if *self == TypeSet::ANY {
            return write!(f, "any");
        }
        let mut first = true;
        for (mask, name) in NAMES {
            if self.contains(*mask) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_is_union_of_value_types() {
        let all = TypeSet::STRING
            | TypeSet::INTEGER
            | TypeSet::FLOAT
            | TypeSet::BOOLEAN
            | TypeSet::NULL
            | TypeSet::RESOURCE
            | TypeSet::ARRAY
            | TypeSet::OBJECT;
        assert_eq!(all, TypeSet::ANY);
        assert!(!TypeSet::ANY.contains(TypeSet::FUNCTION));
    }

    #[test]
    fn test_contains() {
        let t = TypeSet::INTEGER | TypeSet::FLOAT;
        assert!(t.contains(TypeSet::INTEGER));
        assert!(t.contains(TypeSet::FLOAT));
        assert!(!t.contains(TypeSet::STRING));
    }

    #[test]
    fn test_unknown_is_empty() {
        assert!(TypeSet::UNKNOWN.is_unknown());
        assert!(!TypeSet::STRING.is_unknown());
    }

    #[test]
    fn test_debug_names() {
        assert_eq!(format!("{:?}", TypeSet::STRING), "string");
        assert_eq!(format!("{:?}", TypeSet::UNKNOWN), "unknown");
        assert_eq!(format!("{:?}", TypeSet::ANY), "any");
        assert_eq!(
            format!("{:?}", TypeSet::INTEGER | TypeSet::FLOAT),
            "int|float"
        );
    }
}
