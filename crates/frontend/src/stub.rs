//! AIDL stub detection.

use engine::{MethodDecl, StubDetector};

/// Recognizes methods of classes that extend (or anonymously instantiate)
/// a generated `IFoo.Stub`.
#[derive(Debug, Clone, Copy)]
pub struct AidlStubDetector {
    /// Only accept methods marked `@Override`.
    pub require_override: bool,
}

impl Default for AidlStubDetector {
    fn default() -> Self {
        Self {
            require_override: true,
        }
    }
}

impl StubDetector for AidlStubDetector {
    fn stub_interface(&self, method: &MethodDecl) -> Option<String> {
        if method.is_static {
            return None;
        }
        if self.require_override && !method.has_annotation("Override") {
            return None;
        }
        interface_of(method.supertype.as_deref()?)
    }
}

/// `IFoo` for `IFoo.Stub` or `com.example.IFoo.Stub`.
pub fn interface_of(supertype: &str) -> Option<String> {
    let outer = supertype.strip_suffix(".Stub")?;
    let name = outer.rsplit('.').next().unwrap_or(outer);
    (!name.is_empty()).then(|| name.to_string())
}
