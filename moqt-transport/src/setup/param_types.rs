/// Setup parameter type codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u64)]
pub enum ParameterType {
    Path = 0x1,
    MaxRequestId = 0x2,
    /// Opaque authorization token framing; issuance is out of scope.
    AuthorizationToken = 0x3,
    MaxAuthTokenCacheSize = 0x4,
}

impl From<ParameterType> for u64 {
    fn from(value: ParameterType) -> Self {
        value as u64
    }
}
