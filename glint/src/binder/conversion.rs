//! Conversion classification between types

use crate::symbols::{TypeGroup, TypeSymbol};

/// How a value of one type may become another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Same type; no node is emitted
    Identity,
    /// Allowed anywhere
    Implicit,
    /// Allowed only through conversion syntax `T(x)`
    Explicit,
    /// No path
    None,
}

/// Classify the conversion from `from` to `to`
pub fn classify(from: &TypeSymbol, to: &TypeSymbol) -> Conversion {
    if from == to {
        return Conversion::Identity;
    }
    if from.is_error() || to.is_error() || from.is_void() || to.is_void() {
        return Conversion::None;
    }

    match (from.group(), to.group()) {
        (TypeGroup::Integer, TypeGroup::Integer) | (TypeGroup::Float, TypeGroup::Float) => {
            if to.size() > from.size() {
                Conversion::Implicit
            } else {
                Conversion::Explicit
            }
        }
        (TypeGroup::Integer, TypeGroup::Float) | (TypeGroup::Float, TypeGroup::Integer) => {
            Conversion::Explicit
        }
        _ if *to == TypeSymbol::string() => Conversion::Explicit,
        _ if *from == TypeSymbol::string() => Conversion::Explicit,
        _ => Conversion::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_for_every_type() {
        let mut types = TypeSymbol::builtins();
        types.push(TypeSymbol::error());
        types.push(TypeSymbol::array(TypeSymbol::int()));
        for ty in &types {
            assert_eq!(classify(ty, ty), Conversion::Identity, "{ty}");
        }
    }

    #[test]
    fn test_widening_is_implicit() {
        let ints = [TypeSymbol::byte(), TypeSymbol::short(), TypeSymbol::int(), TypeSymbol::long()];
        for (i, from) in ints.iter().enumerate() {
            for (j, to) in ints.iter().enumerate() {
                let expected = match i.cmp(&j) {
                    std::cmp::Ordering::Equal => Conversion::Identity,
                    std::cmp::Ordering::Less => Conversion::Implicit,
                    std::cmp::Ordering::Greater => Conversion::Explicit,
                };
                assert_eq!(classify(from, to), expected, "{from} -> {to}");
                if expected == Conversion::Implicit {
                    assert!(to.size() >= from.size());
                }
            }
        }
        assert_eq!(classify(&TypeSymbol::float(), &TypeSymbol::double()), Conversion::Implicit);
        assert_eq!(classify(&TypeSymbol::double(), &TypeSymbol::float()), Conversion::Explicit);
    }

    #[test]
    fn test_cross_family_is_explicit() {
        assert_eq!(classify(&TypeSymbol::byte(), &TypeSymbol::double()), Conversion::Explicit);
        assert_eq!(classify(&TypeSymbol::double(), &TypeSymbol::long()), Conversion::Explicit);
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(classify(&TypeSymbol::bool(), &TypeSymbol::string()), Conversion::Explicit);
        assert_eq!(classify(&TypeSymbol::string(), &TypeSymbol::int()), Conversion::Explicit);
        assert_eq!(classify(&TypeSymbol::string(), &TypeSymbol::void()), Conversion::None);
        assert_eq!(
            classify(&TypeSymbol::array(TypeSymbol::int()), &TypeSymbol::string()),
            Conversion::Explicit
        );
    }

    #[test]
    fn test_error_and_void_never_convert() {
        assert_eq!(classify(&TypeSymbol::error(), &TypeSymbol::int()), Conversion::None);
        assert_eq!(classify(&TypeSymbol::int(), &TypeSymbol::error()), Conversion::None);
        assert_eq!(classify(&TypeSymbol::void(), &TypeSymbol::string()), Conversion::None);
        assert_eq!(classify(&TypeSymbol::bool(), &TypeSymbol::int()), Conversion::None);
    }
}
