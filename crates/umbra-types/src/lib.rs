//! # umbra-types: Core types for `Umbra`
//!
//! This crate contains the identifiers shared across the harness:
//! - Framework type identity ([`RealType`], [`MethodSignature`])
//! - Virtual thread identity ([`VirtualThreadId`])
//! - Simulated platform version ([`ApiLevel`])
//! - Test identity ([`TestIdentity`])
//!
//! Every type here is immutable once constructed and cheap to clone.

use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Framework Type Identity
// ============================================================================

/// Identifier of a framework class or interface being simulated.
///
/// Real types are identified by their fully qualified name
/// (`android.graphics.drawable.Drawable`). The name is interned in an
/// `Arc<str>` so cloning a `RealType` never allocates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RealType(Arc<str>);

impl RealType {
    pub fn new(qualified_name: impl AsRef<str>) -> Self {
        Self(Arc::from(qualified_name.as_ref()))
    }

    /// Returns the fully qualified name.
    pub fn qualified_name(&self) -> &str {
        &self.0
    }

    /// Returns the name after the last `.` (and after the last `$` for
    /// nested types).
    ///
    /// # Examples
    ///
    /// ```
    /// # use umbra_types::RealType;
    /// let ty = RealType::new("android.app.ActivityThread$AppBindData");
    /// assert_eq!(ty.simple_name(), "AppBindData");
    /// ```
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(['.', '$']).next().unwrap_or(&self.0)
    }
}

impl Display for RealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RealType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RealType {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<RealType> for String {
    fn from(value: RealType) -> Self {
        value.0.to_string()
    }
}

/// Signature of a method on a real type, e.g. `getBounds()` or
/// `createFromStream(java.io.InputStream,java.lang.String)`.
///
/// Signatures are compared as opaque strings; two overloads of the same
/// method name are distinct signatures.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MethodSignature(Arc<str>);

impl MethodSignature {
    pub fn new(signature: impl AsRef<str>) -> Self {
        Self(Arc::from(signature.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the method name without its parameter list.
    ///
    /// # Examples
    ///
    /// ```
    /// # use umbra_types::MethodSignature;
    /// assert_eq!(MethodSignature::new("getBounds()").name(), "getBounds");
    /// assert_eq!(MethodSignature::new("onCreate").name(), "onCreate");
    /// ```
    pub fn name(&self) -> &str {
        self.0.split('(').next().unwrap_or(&self.0)
    }
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodSignature {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MethodSignature {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<MethodSignature> for String {
    fn from(value: MethodSignature) -> Self {
        value.0.to_string()
    }
}

// ============================================================================
// Virtual Threads
// ============================================================================

/// Identity of a simulated thread.
///
/// Each virtual thread owns at most one scheduler; exactly one virtual
/// thread is designated as the simulated main thread per environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VirtualThreadId(Arc<str>);

impl VirtualThreadId {
    /// Name of the thread the harness designates as main by default.
    pub const MAIN_NAME: &'static str = "main";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The conventional main thread identity.
    pub fn main() -> Self {
        Self::new(Self::MAIN_NAME)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for VirtualThreadId {
    fn default() -> Self {
        Self::main()
    }
}

impl Display for VirtualThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VirtualThreadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VirtualThreadId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<VirtualThreadId> for String {
    fn from(value: VirtualThreadId) -> Self {
        value.0.to_string()
    }
}

// ============================================================================
// Platform Version
// ============================================================================

/// Simulated platform API level.
///
/// Configuration fields and bootstrap steps are gated on this value; the
/// named constants cover the levels the harness gates on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ApiLevel(u16);

impl ApiLevel {
    pub const BASE: ApiLevel = ApiLevel(1);
    pub const FROYO: ApiLevel = ApiLevel(8);
    pub const HONEYCOMB_MR2: ApiLevel = ApiLevel(13);
    pub const JELLY_BEAN_MR1: ApiLevel = ApiLevel(17);
    pub const KITKAT: ApiLevel = ApiLevel(19);
    pub const M: ApiLevel = ApiLevel(23);
    pub const N: ApiLevel = ApiLevel(24);
    pub const O: ApiLevel = ApiLevel(26);

    pub const fn new(level: u16) -> Self {
        Self(level)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Returns true if a feature introduced at `introduced` is available.
    pub const fn supports(self, introduced: ApiLevel) -> bool {
        self.0 >= introduced.0
    }
}

impl Display for ApiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for ApiLevel {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ApiLevel> for u16 {
    fn from(level: ApiLevel) -> Self {
        level.0
    }
}

// ============================================================================
// Test Identity
// ============================================================================

/// Identity of the test method an environment is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    /// Fully qualified name of the test class (or module path).
    pub class_name: String,
    /// Name of the test method.
    pub method_name: String,
}

impl TestIdentity {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// Returns a file-system safe directory name for this test.
    ///
    /// The name is `<SimpleClass>_<method>` where every character of the
    /// method name outside `[A-Za-z0-9.-]` is replaced with `_`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use umbra_types::TestIdentity;
    /// let test = TestIdentity::new("com.example.DrawableTest", "bounds are [0,0]");
    /// assert_eq!(test.data_dir_name(), "DrawableTest_bounds_are__0_0_");
    /// ```
    pub fn data_dir_name(&self) -> String {
        let simple_class = self
            .class_name
            .rsplit(['.', ':'])
            .find(|part| !part.is_empty())
            .unwrap_or("Test");
        let method: String = self
            .method_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{simple_class}_{method}")
    }
}

impl Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class_name, self.method_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn real_type_clone_shares_storage() {
        let ty = RealType::new("android.view.View");
        let copy = ty.clone();
        assert_eq!(ty, copy);
        assert!(std::ptr::eq(ty.qualified_name(), copy.qualified_name()));
    }

    #[test_case("android.view.View", "View"; "package qualified")]
    #[test_case("android.app.ActivityThread$H", "H"; "nested type")]
    #[test_case("Drawable", "Drawable"; "unqualified")]
    fn simple_name_strips_package(qualified: &str, expected: &str) {
        assert_eq!(RealType::new(qualified).simple_name(), expected);
    }

    #[test]
    fn method_name_ignores_parameters() {
        let sig = MethodSignature::new("createFromStream(java.io.InputStream,java.lang.String)");
        assert_eq!(sig.name(), "createFromStream");
    }

    #[test]
    fn api_level_gates_are_inclusive() {
        assert!(ApiLevel::JELLY_BEAN_MR1.supports(ApiLevel::JELLY_BEAN_MR1));
        assert!(ApiLevel::KITKAT.supports(ApiLevel::JELLY_BEAN_MR1));
        assert!(!ApiLevel::new(16).supports(ApiLevel::JELLY_BEAN_MR1));
    }

    #[test]
    fn default_thread_is_main() {
        assert_eq!(VirtualThreadId::default().name(), "main");
    }

    #[test_case("com.example.FooTest", "shouldWork", "FooTest_shouldWork"; "plain")]
    #[test_case("FooTest", "with space/slash", "FooTest_with_space_slash"; "unsafe characters")]
    #[test_case("my_crate::tests", "it.works-ok", "tests_it.works-ok"; "rust module path")]
    fn data_dir_name_is_filesystem_safe(class: &str, method: &str, expected: &str) {
        assert_eq!(TestIdentity::new(class, method).data_dir_name(), expected);
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let json = serde_json::to_string(&RealType::new("android.view.View")).unwrap();
        assert_eq!(json, "\"android.view.View\"");
        let level: ApiLevel = serde_json::from_str("23").unwrap();
        assert_eq!(level, ApiLevel::M);
    }
}
