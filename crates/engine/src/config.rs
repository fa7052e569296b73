//! Engine configuration: the check-API vocabulary and the policy knobs.
//!
//! Every field has a built-in default, so an empty JSON object is a valid
//! config. The API table is data, not control flow: adding a new
//! `enforceFoo(...)` idiom means adding a [`CheckApi`] entry.

use common::Severity;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a permission API reports denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    /// Throws `SecurityException` itself (`enforceCallingPermission`).
    Enforce,
    /// Returns a grant code compared against `PERMISSION_GRANTED`.
    Check,
    /// Returns `boolean`, `true` meaning granted.
    Predicate,
}

/// How several permissions of one check combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    #[default]
    Single,
    AnyOf,
    AllOf,
}

/// One recognized manual-check API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckApi {
    /// Method name, matched against the call target regardless of receiver.
    pub method: String,
    pub kind: ApiKind,
    /// Index of the (first) permission argument.
    #[serde(default)]
    pub permission_arg: usize,
    /// Every argument from `permission_arg` on is a permission.
    #[serde(default)]
    pub variadic: bool,
    /// Combinator for variadic APIs; ignored when one permission is passed.
    #[serde(default)]
    pub combinator: Combinator,
    /// Arguments naming whose permission is checked. A call only matches
    /// when each of them identifies the binder caller.
    #[serde(default)]
    pub identity_args: Vec<IdentityArg>,
}

/// A pid/uid argument of a check API, e.g. `uid` of
/// `checkPermission(permission, pid, uid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityArg {
    pub index: usize,
    /// Accepted calls, written `Receiver.method` (`Binder.getCallingUid`).
    /// A bare `method` also accepts a receiverless (statically imported) call.
    pub calls: Vec<String>,
}

impl IdentityArg {
    fn new(index: usize, calls: &[&str]) -> Self {
        Self {
            index,
            calls: strings(calls),
        }
    }

    /// `true` if `receiver.method()` is one of the accepted calls.
    pub fn accepts(&self, receiver: Option<&str>, method: &str) -> bool {
        self.calls.iter().any(|c| match (c.rsplit_once('.'), receiver) {
            (Some((r, m)), Some(recv)) => r == recv && m == method,
            (Some((_, m)), None) => m == method,
            (None, _) => c == method,
        })
    }
}

impl CheckApi {
    fn single(method: &str, kind: ApiKind) -> Self {
        Self {
            method: method.to_string(),
            kind,
            permission_arg: 0,
            variadic: false,
            combinator: Combinator::Single,
            identity_args: Vec::new(),
        }
    }

    /// `Context` APIs taking an explicit `(permission, pid, uid, ..)`.
    fn for_caller(method: &str, kind: ApiKind) -> Self {
        Self {
            identity_args: vec![
                IdentityArg::new(1, &["Binder.getCallingPid"]),
                IdentityArg::new(2, &["Binder.getCallingUid"]),
            ],
            ..Self::single(method, kind)
        }
    }
}

/// Treatment of extra statements in a denial branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectMode {
    /// Any extra statement disqualifies the guard.
    Reject,
    /// Logging calls are tolerated; the conversion becomes approximate.
    #[default]
    AllowLogging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffectPolicy {
    pub mode: SideEffectMode,
    /// Receivers whose calls count as logging (`Slog.w(...)`, `Log.e(...)`).
    pub logging_receivers: Vec<String>,
}

impl Default for SideEffectPolicy {
    fn default() -> Self {
        Self {
            mode: SideEffectMode::AllowLogging,
            logging_receivers: ["Log", "Slog", "Slogf", "LOG", "sLogger", "EventLog"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SideEffectPolicy {
    /// `true` if a call through `receiver` counts as benign logging.
    pub fn is_logging_receiver(&self, receiver: &str) -> bool {
        self.mode == SideEffectMode::AllowLogging
            && self.logging_receivers.iter().any(|r| r == receiver)
    }
}

/// Severity requested from the reporting layer.
///
/// Findings are non-blocking while adoption of the annotation style is
/// incomplete; flipping `escalate_exact` turns exact findings into errors
/// without touching matching or classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    pub escalate_exact: bool,
}

impl SeverityPolicy {
    pub fn tier(&self, exact: bool) -> Severity {
        if exact && self.escalate_exact {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Annotation inserted above converted methods, as it should be written.
    pub annotation: String,
    pub check_apis: Vec<CheckApi>,
    /// When a config file lists `check_apis`, also keep the built-in ones.
    pub extend_defaults: bool,
    /// Names meaning "granted" on the other side of `!=`.
    pub granted_values: Vec<String>,
    /// Names meaning "denied": accepted in `== DENIED` guards and as the
    /// canonical value of a `return` denial.
    pub denied_values: Vec<String>,
    /// Exception types whose `throw new T(...)` is an exact denial.
    pub denial_exceptions: Vec<String>,
    pub side_effects: SideEffectPolicy,
    pub severity: SeverityPolicy,
    /// Skip methods that already carry the annotation.
    pub skip_annotated: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The `android.content.Context` permission APIs plus the common
/// at-least-one helper.
pub fn default_check_apis() -> Vec<CheckApi> {
    vec![
        CheckApi::single("enforceCallingOrSelfPermission", ApiKind::Enforce),
        CheckApi::single("enforceCallingPermission", ApiKind::Enforce),
        CheckApi::for_caller("enforcePermission", ApiKind::Enforce),
        CheckApi::single("checkCallingOrSelfPermission", ApiKind::Check),
        CheckApi::single("checkCallingPermission", ApiKind::Check),
        CheckApi::for_caller("checkPermission", ApiKind::Check),
        CheckApi {
            method: "enforceCallingHasAtLeastOnePermission".into(),
            kind: ApiKind::Enforce,
            permission_arg: 1,
            variadic: true,
            combinator: Combinator::AnyOf,
            identity_args: Vec::new(),
        },
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            annotation: "EnforcePermission".into(),
            check_apis: default_check_apis(),
            extend_defaults: false,
            granted_values: strings(&["PackageManager.PERMISSION_GRANTED", "PERMISSION_GRANTED"]),
            denied_values: strings(&["PackageManager.PERMISSION_DENIED", "PERMISSION_DENIED"]),
            denial_exceptions: strings(&["SecurityException", "java.lang.SecurityException"]),
            side_effects: SideEffectPolicy::default(),
            severity: SeverityPolicy::default(),
            skip_annotated: true,
        }
    }
}

/// Errors from loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = serde_json::from_str(json)?;
        if config.extend_defaults {
            for api in default_check_apis() {
                if !config.check_apis.iter().any(|a| a.method == api.method) {
                    config.check_apis.push(api);
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.annotation.trim().is_empty() {
            return Err(ConfigError::Invalid("`annotation` must not be empty".into()));
        }
        if let Some(api) = self.check_apis.iter().find(|a| a.method.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "check API with empty method name: {api:?}"
            )));
        }
        Ok(())
    }

    /// Last segment of the configured annotation (`EnforcePermission`).
    pub fn annotation_simple_name(&self) -> &str {
        self.annotation
            .rsplit('.')
            .next()
            .unwrap_or(self.annotation.as_str())
    }

    pub fn lookup(&self, method: &str) -> Option<&CheckApi> {
        self.check_apis.iter().find(|a| a.method == method)
    }

    pub fn is_granted(&self, name: &str) -> bool {
        self.granted_values.iter().any(|g| g == name)
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.denied_values.iter().any(|d| d == name)
    }

    pub fn is_denial_exception(&self, type_name: &str) -> bool {
        self.denial_exceptions.iter().any(|e| e == type_name)
    }
}
