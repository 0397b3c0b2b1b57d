use snafu::{Backtrace, Snafu};

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error types
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// Malformed framing, illegal packet ordering, or otherwise broken
    /// OpenPGP structure.
    #[snafu(display("openpgp: invalid data: {message}"))]
    Structural {
        message: String,
        backtrace: Option<Backtrace>,
    },
    /// Well formed input using an algorithm or feature this build does not
    /// implement. The message names the feature ("hash ...", "cipher ...",
    /// "public key ...").
    #[snafu(display("openpgp: unsupported feature: {message}"))]
    Unsupported {
        message: String,
        backtrace: Option<Backtrace>,
    },
    /// The caller-supplied input is not OpenPGP data at all.
    #[snafu(display("openpgp: invalid argument: {message}"))]
    InvalidArgument {
        message: String,
        backtrace: Option<Backtrace>,
    },
    /// Decryption with the provided key or passphrase failed its
    /// integrity check.
    #[snafu(display("openpgp: incorrect key"))]
    KeyIncorrect { backtrace: Option<Backtrace> },
    /// The signing key id is not present in the keyring, or no signature
    /// with a usable hash algorithm was available.
    #[snafu(display("openpgp: signature made by unknown entity"))]
    UnknownIssuer { backtrace: Option<Backtrace> },
    /// The issuer is known but the signature value does not verify.
    #[snafu(display("openpgp: invalid signature"))]
    InvalidSignature { backtrace: Option<Backtrace> },
    #[snafu(display("openpgp: signature expired"))]
    SignatureExpired { backtrace: Option<Backtrace> },
    #[snafu(display("openpgp: key expired"))]
    KeyExpired { backtrace: Option<Backtrace> },
    #[snafu(display("openpgp: key revoked"))]
    KeyRevoked { backtrace: Option<Backtrace> },
    /// The Modification Detection Code of an integrity protected packet
    /// did not match: the ciphertext was tampered with.
    #[snafu(display("openpgp: modification detection code mismatch"))]
    MdcMismatch { backtrace: Option<Backtrace> },
    #[snafu(display("IO error: {source}"), context(false))]
    Io {
        source: std::io::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    Rsa {
        source: rsa::errors::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    Utf8 {
        source: std::str::Utf8Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    Base64Decode {
        source: base64::DecodeError,
        backtrace: Option<Backtrace>,
    },
}

impl Error {
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    pub fn is_key_incorrect(&self) -> bool {
        matches!(self, Error::KeyIncorrect { .. })
    }

    pub fn is_unknown_issuer(&self) -> bool {
        matches!(self, Error::UnknownIssuer { .. })
    }

    pub fn is_mdc_mismatch(&self) -> bool {
        matches!(self, Error::MdcMismatch { .. })
    }

    pub(crate) fn key_incorrect() -> Self {
        KeyIncorrectSnafu.build()
    }

    pub(crate) fn mdc_mismatch() -> Self {
        MdcMismatchSnafu.build()
    }

    pub(crate) fn unknown_issuer() -> Self {
        UnknownIssuerSnafu.build()
    }

    pub(crate) fn invalid_signature() -> Self {
        InvalidSignatureSnafu.build()
    }

    pub(crate) fn signature_expired() -> Self {
        SignatureExpiredSnafu.build()
    }

    pub(crate) fn key_expired() -> Self {
        KeyExpiredSnafu.build()
    }

    pub(crate) fn key_revoked() -> Self {
        KeyRevokedSnafu.build()
    }
}

impl From<ecdsa::signature::Error> for Error {
    fn from(_: ecdsa::signature::Error) -> Error {
        Error::invalid_signature()
    }
}

/// Fail with a [`Error::Structural`].
#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Structural {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Structural {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

/// Construct a [`Error::Structural`] without returning it.
#[macro_export]
macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Structural {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Structural {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        }
    };
}

/// Fail with a [`Error::Unsupported`].
#[macro_export]
macro_rules! unsupported_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unsupported {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unsupported {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

/// Construct a [`Error::Unsupported`] without returning it.
#[macro_export]
macro_rules! unsupported_error {
    ($e:expr) => {
        $crate::errors::Error::Unsupported {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Unsupported {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        }
    };
}

/// Fail with a [`Error::InvalidArgument`].
#[macro_export]
macro_rules! invalid_arg_err {
    ($e:expr) => {
        return Err($crate::errors::Error::InvalidArgument {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::InvalidArgument {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, left_val, right_val,
                           ::std::format_args!($($arg)+))
                }
            }
        }
    });
}
