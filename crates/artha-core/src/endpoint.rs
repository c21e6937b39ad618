//! Endpoint classification and the credential-precedence table.
//!
//! Classification is a pure function from a request path to the role the
//! endpoint requires. The precedence table below is the single source of
//! truth for which stored token a request may attach, replacing the
//! per-call-site key probing the backend's web clients grew over time.

use crate::credentials::CredentialSlot;

/// Role a backend endpoint requires, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Login, signup and password-reset paths. Never authenticated, even
    /// when a token is stored.
    Public,
    /// Student dashboard endpoints, plus anything unrecognized. The server
    /// still makes its own authorization decision.
    Student,
    /// School staff endpoints (teachers, counselors, principals).
    School,
    /// Parent portal endpoints.
    Parent,
    /// Admin console endpoints.
    Admin,
}

const PUBLIC_MARKERS: &[&str] = &["/auth/login", "/auth/signup", "/auth/forgot-password"];

/// All school-staff path segments map to the one school credential slot.
const SCHOOL_MARKERS: &[&str] = &[
    "/school/",
    "/teacher/",
    "/counselor/",
    "/principal/",
    "/vice-principal/",
];

/// Classifies a request path.
pub fn classify(path: &str) -> EndpointClass {
    if PUBLIC_MARKERS.iter().any(|marker| path.contains(marker)) {
        return EndpointClass::Public;
    }
    if path.contains("/admin/") {
        return EndpointClass::Admin;
    }
    if SCHOOL_MARKERS.iter().any(|marker| path.contains(marker)) {
        return EndpointClass::School;
    }
    if path.contains("/parent/") {
        return EndpointClass::Parent;
    }
    EndpointClass::Student
}

impl EndpointClass {
    /// Credential precedence for this class: the role slot first, then the
    /// generic slot where the backend accepts the shared login token.
    /// School and parent endpoints never fall back.
    pub fn slot_chain(self) -> &'static [CredentialSlot] {
        match self {
            EndpointClass::Public => &[],
            EndpointClass::Student => &[CredentialSlot::Student, CredentialSlot::Generic],
            EndpointClass::School => &[CredentialSlot::School],
            EndpointClass::Parent => &[CredentialSlot::Parent],
            EndpointClass::Admin => &[CredentialSlot::Admin, CredentialSlot::Generic],
        }
    }
}
