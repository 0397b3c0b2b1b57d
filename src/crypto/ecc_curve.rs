/// The named curves this implementation understands, identified by their
/// OIDs as they appear in key material.
/// Ref: <https://tools.ietf.org/html/rfc6637#section-11>
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EccCurve {
    P256,
    P384,
    P521,
    Curve25519,
    Ed25519,
}

impl EccCurve {
    pub fn oid(self) -> &'static [u8] {
        match self {
            EccCurve::P256 => &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
            EccCurve::P384 => &[0x2B, 0x81, 0x04, 0x00, 0x22],
            EccCurve::P521 => &[0x2B, 0x81, 0x04, 0x00, 0x23],
            EccCurve::Curve25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01],
            EccCurve::Ed25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
        }
    }

    pub fn try_from_oid(oid: &[u8]) -> Option<Self> {
        [
            EccCurve::P256,
            EccCurve::P384,
            EccCurve::P521,
            EccCurve::Curve25519,
            EccCurve::Ed25519,
        ]
        .into_iter()
        .find(|c| c.oid() == oid)
    }

    /// Byte size of a field element.
    pub fn field_size(self) -> usize {
        match self {
            EccCurve::P256 => 32,
            EccCurve::P384 => 48,
            EccCurve::P521 => 66,
            EccCurve::Curve25519 | EccCurve::Ed25519 => 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_roundtrip() {
        for curve in [
            EccCurve::P256,
            EccCurve::P384,
            EccCurve::P521,
            EccCurve::Curve25519,
            EccCurve::Ed25519,
        ] {
            assert_eq!(EccCurve::try_from_oid(curve.oid()), Some(curve));
        }
        assert_eq!(EccCurve::try_from_oid(&[0x01, 0x02]), None);
    }
}
