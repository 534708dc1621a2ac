//! Reverse lookup of bit flags in protocol codes.

/// A fixed set of named codes that can be matched against a value.
pub trait FlagSet: Copy + Sized + 'static {
    /// Every member of the set.
    const ALL: &'static [Self];

    /// Numeric value of this member.
    fn value(self) -> u32;
}

/// Result of [`decompose_flags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposed<T> {
    /// Matched members, highest value first.
    pub flags: Vec<T>,
    /// Bits no member accounted for.
    pub remainder: u32,
}

/// Splits `value` into the members of `T` whose bits it contains.
///
/// Members are tried from the highest value down; each match removes its
/// bits from the value. Zero-valued members never match.
pub fn decompose_flags<T: FlagSet>(value: u32) -> Decomposed<T> {
    let mut members: Vec<T> = T::ALL.iter().copied().filter(|m| m.value() != 0).collect();
    members.sort_by(|a, b| b.value().cmp(&a.value()));

    let mut remainder = value;
    let mut flags = Vec::new();
    for member in members {
        let bits = member.value();
        if remainder & bits == bits {
            remainder &= !bits;
            flags.push(member);
        }
    }

    Decomposed { flags, remainder }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phonetic {
        Alpha = 0x01,
        Bravo = 0x02,
        Charlie = 0x04,
        Delta = 0x08,
        Echo = 0x10,
        Foxtrot = 0x20,
    }

    impl FlagSet for Phonetic {
        const ALL: &'static [Self] = &[
            Phonetic::Alpha,
            Phonetic::Bravo,
            Phonetic::Charlie,
            Phonetic::Delta,
            Phonetic::Echo,
            Phonetic::Foxtrot,
        ];

        fn value(self) -> u32 {
            self as u32
        }
    }

    #[test]
    fn test_decompose_with_remainder() {
        // 64 + 8 + 4 + 1
        let result = decompose_flags::<Phonetic>(77);
        assert_eq!(
            result.flags,
            vec![Phonetic::Delta, Phonetic::Charlie, Phonetic::Alpha]
        );
        assert_eq!(result.remainder, 64);
    }

    #[test]
    fn test_decompose_exact() {
        let result = decompose_flags::<Phonetic>(0x22);
        assert_eq!(result.flags, vec![Phonetic::Foxtrot, Phonetic::Bravo]);
        assert_eq!(result.remainder, 0);
    }

    #[test]
    fn test_decompose_zero() {
        let result = decompose_flags::<Phonetic>(0);
        assert!(result.flags.is_empty());
        assert_eq!(result.remainder, 0);
    }
}
