//! Source descriptors and the ordered source catalog.
//!
//! A [`SourceCatalog`] is a plain, versioned configuration value. It is built
//! once at startup and handed to the failover controller for each run; nothing
//! in the engine mutates it.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::health::SourceHealth;
use crate::{RequestedCount, ValidationError};

/// Placeholder substituted with the requested count in endpoint templates.
pub const COUNT_PLACEHOLDER: &str = "{count}";

/// Rule deciding whether a parsed response body reports success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessPredicate {
    /// The value at `field` must equal `value` exactly.
    ExactValueMatch { field: String, value: Value },
    /// The value at `field` must be present and not `null`/`false`.
    TruthyField { field: String },
    /// `field` must exist in the payload.
    FieldPresence { field: String },
}

impl SuccessPredicate {
    pub fn exact(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ExactValueMatch {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn truthy(field: impl Into<String>) -> Self {
        Self::TruthyField {
            field: field.into(),
        }
    }

    pub fn presence(field: impl Into<String>) -> Self {
        Self::FieldPresence {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::ExactValueMatch { field, .. }
            | Self::TruthyField { field }
            | Self::FieldPresence { field } => field,
        }
    }

    pub fn evaluate(&self, body: &Value) -> bool {
        match self {
            Self::ExactValueMatch { field, value } => lookup(body, field) == Some(value),
            Self::TruthyField { field } => lookup(body, field).is_some_and(is_truthy),
            Self::FieldPresence { field } => lookup(body, field).is_some(),
        }
    }
}

/// Immutable description of one random-number provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDescriptor {
    name: String,
    endpoint_template: String,
    data_field: String,
    success: SuccessPredicate,
    enabled: bool,
}

impl SourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        endpoint_template: impl Into<String>,
        data_field: impl Into<String>,
        success: SuccessPredicate,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let endpoint_template = endpoint_template.into();
        let data_field = data_field.into();

        if name.trim().is_empty() {
            return Err(ValidationError::EmptySourceName);
        }
        if !endpoint_template.contains(COUNT_PLACEHOLDER) {
            return Err(ValidationError::MissingCountPlaceholder { name });
        }
        if data_field.trim().is_empty() || success.field().trim().is_empty() {
            return Err(ValidationError::EmptyFieldPath { name });
        }

        Ok(Self {
            name,
            endpoint_template,
            data_field,
            success,
            enabled: true,
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint_template(&self) -> &str {
        &self.endpoint_template
    }

    pub fn data_field(&self) -> &str {
        &self.data_field
    }

    pub fn success(&self) -> &SuccessPredicate {
        &self.success
    }

    pub fn success_field(&self) -> &str {
        self.success.field()
    }

    /// Exact value required at the success field, if the source defines one.
    pub fn expected_success_value(&self) -> Option<&Value> {
        match &self.success {
            SuccessPredicate::ExactValueMatch { value, .. } => Some(value),
            SuccessPredicate::TruthyField { .. } | SuccessPredicate::FieldPresence { .. } => None,
        }
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn endpoint(&self, count: RequestedCount) -> String {
        self.endpoint_template
            .replace(COUNT_PLACEHOLDER, &count.to_string())
    }
}

/// Ordered, versioned list of sources. Order is fallback priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCatalog {
    version: u32,
    sources: Vec<SourceDescriptor>,
}

impl SourceCatalog {
    pub fn new(version: u32, sources: Vec<SourceDescriptor>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name()) {
                return Err(ValidationError::DuplicateSource {
                    name: source.name().to_owned(),
                });
            }
        }

        Ok(Self { version, sources })
    }

    /// Catalog shipped with the binary.
    ///
    /// The first three providers are kept for reference but disabled: they
    /// answered with 404s, HTML error pages and DNS failures respectively.
    pub fn builtin() -> Self {
        let sources = vec![
            builtin(
                "ANU QRNG (wp-json endpoint)",
                "https://qrng.anu.edu.au/wp-json/qrng/random-numbers?count={count}",
                "data",
                SuccessPredicate::truthy("success"),
                false,
            ),
            builtin(
                "HotBits",
                "https://www.fourmilab.ch/cgi-bin/Hotbits.api?nbytes={count}&fmt=json&key=Pseudorandom",
                "random-data",
                SuccessPredicate::exact("status", "success"),
                false,
            ),
            builtin(
                "QNu Labs QRNG",
                "https://api.qnulabs.com/qrng/random?length={count}&type=uint8",
                "numbers",
                SuccessPredicate::truthy("success"),
                false,
            ),
            builtin(
                "ANU QRNG (jsonI endpoint)",
                "https://qrng.anu.edu.au/API/jsonI.php?length={count}&type=uint8",
                "data",
                SuccessPredicate::truthy("success"),
                true,
            ),
            builtin(
                "QRandom.io",
                "https://qrandom.io/api/random/ints?min=0&max=255&n={count}",
                "numbers",
                SuccessPredicate::presence("numbers"),
                true,
            ),
            builtin(
                "LfD QRNG (OTH Regensburg)",
                "https://lfdr.de/qrng_api/qrng?length={count}&format=HEX",
                "qrn",
                SuccessPredicate::presence("qrn"),
                true,
            ),
        ];

        Self { version: 1, sources }
    }

    pub const fn version(&self) -> u32 {
        self.version
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|source| source.name() == name)
    }

    /// Enabled sources that the health ledger does not quarantine, in order.
    pub fn active<'a>(&'a self, health: &SourceHealth) -> Vec<&'a SourceDescriptor> {
        self.sources
            .iter()
            .filter(|source| source.enabled())
            .filter(|source| !health.is_quarantined(source.name()))
            .collect()
    }

    /// Returns a new catalog version with the named sources disabled.
    pub fn without<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ValidationError> {
        self.ensure_known(names)?;
        Ok(self.derive(|source| {
            source.enabled() && !names.iter().any(|name| name.as_ref() == source.name())
        }))
    }

    /// Returns a new catalog version where only the named sources are enabled.
    ///
    /// Named sources are enabled even if the base catalog disables them.
    pub fn only<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ValidationError> {
        self.ensure_known(names)?;
        Ok(self.derive(|source| names.iter().any(|name| name.as_ref() == source.name())))
    }

    fn ensure_known<S: AsRef<str>>(&self, names: &[S]) -> Result<(), ValidationError> {
        for name in names {
            if self.get(name.as_ref()).is_none() {
                return Err(ValidationError::UnknownSource {
                    name: name.as_ref().to_owned(),
                });
            }
        }
        Ok(())
    }

    fn derive(&self, enabled: impl Fn(&SourceDescriptor) -> bool) -> Self {
        let sources = self
            .sources
            .iter()
            .map(|source| source.clone().with_enabled(enabled(source)))
            .collect();
        Self {
            version: self.version.saturating_add(1),
            sources,
        }
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin(
    name: &str,
    template: &str,
    data_field: &str,
    success: SuccessPredicate,
    enabled: bool,
) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_owned(),
        endpoint_template: template.to_owned(),
        data_field: data_field.to_owned(),
        success,
        enabled,
    }
}

/// Resolve a dot-separated field path inside a JSON object.
pub(crate) fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = body.get(path) {
        return Some(value);
    }

    path.split('.')
        .try_fold(body, |current, segment| current.get(segment))
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
