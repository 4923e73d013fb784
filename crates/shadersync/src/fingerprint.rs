use std::fmt;

/// 32-bit rolling hash of a shader source, used to skip redundant recompiles.
///
/// Computed as `hash = hash * 31 + unit` over the UTF-16 code units of the text,
/// wrapping at 2^32 and read back as a signed integer. The empty string hashes
/// to `0`, but so can other inputs, so "never synced" is tracked separately as
/// `Option<Fingerprint>` rather than with a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(i32);

impl Fingerprint {
    pub fn of(source: &str) -> Self {
        let hash = source.encode_utf16().fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        });
        Self(hash)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Fingerprint {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_hashes_to_zero() {
        assert_eq!(Fingerprint::of("").value(), 0);
    }

    #[test]
    fn matches_reference_values() {
        assert_eq!(Fingerprint::of("a").value(), 97);
        assert_eq!(Fingerprint::of("abc").value(), 96354);
        assert_eq!(Fingerprint::of("hello").value(), 99162322);
    }

    #[test]
    fn pins_minimal_fragment_shader() {
        let source = "void main(){gl_FragColor=vec4(1.0);}";
        assert_eq!(Fingerprint::of(source).value(), -645961105);
        assert_eq!(Fingerprint::of(source), Fingerprint::of(source));
    }

    #[test]
    fn hashes_utf16_code_units() {
        // Non-BMP characters contribute a surrogate pair, not one scalar value.
        assert_eq!(Fingerprint::of("\u{1F600}").value(), 1772899);
        assert_eq!(Fingerprint::of("\u{e9}").value(), 233);
    }

    #[test]
    fn nul_source_collides_with_empty_source() {
        assert_eq!(Fingerprint::of("\0"), Fingerprint::of(""));
    }
}
