//! A configured variable inside a project.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::kind_by_label;
use super::config::VariableConfig;
use super::field::FieldValues;
use super::kind::{AutoCapture, BiometricKind, ModuleFamily, Role, VariableKind};
use super::value::{check_value, parse_value, CapturedValue};
use crate::capture::Unit;
use crate::error::{ConfigurationError, RecordError, ValueProblem};
use crate::ghosts::GhostVariable;

/// One configured occurrence of a kind. `kind` and `name` never change
/// after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInstance {
    id: Uuid,
    name: String,
    kind: VariableKind,
    role: Role,
    config: VariableConfig,
}

/// Persisted form of a [`VariableInstance`].
///
/// Kinds are stored by family and label so the on-disk format does not
/// depend on enum layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub id: Uuid,
    pub name: String,
    pub family: String,
    pub kind: String,
    pub role: Role,
    pub fields: FieldValues,
}

impl VariableInstance {
    /// Create and configure a new variable. Nothing is created if the
    /// configuration is invalid.
    pub fn create(
        name: &str,
        kind: VariableKind,
        role: Role,
        fields: &FieldValues,
    ) -> Result<Self, ConfigurationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::single("name", "must not be empty"));
        }
        let config = VariableConfig::from_fields(kind, fields)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            role,
            config,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-folded name used for uniqueness checks.
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &VariableConfig {
        &self.config
    }

    pub fn configured_values(&self) -> FieldValues {
        self.config.to_fields(self.kind)
    }

    /// Replace the configuration. On error the old configuration stays.
    pub fn configure(&mut self, fields: &FieldValues) -> Result<(), ConfigurationError> {
        let config = VariableConfig::from_fields(self.kind, fields)?;
        self.config = config;
        Ok(())
    }

    pub fn is_auto_captured(&self) -> bool {
        match self.kind.spec().auto_capture {
            AutoCapture::Never => false,
            AutoCapture::Always => true,
            AutoCapture::Optional => self.config.auto_capture_flag(),
        }
    }

    pub fn writes_to_store(&self) -> bool {
        self.config.write_to_store()
    }

    /// Unit the value is expressed in.
    pub fn unit(&self) -> Unit {
        match &self.config {
            VariableConfig::Measurement(m) => m.unit,
            _ => self.kind.fixed_unit(),
        }
    }

    pub fn parse_value(&self, raw: &str) -> Option<CapturedValue> {
        parse_value(&self.config, raw)
    }

    /// Data-entry contract: validate a supplied value.
    pub fn check_value(&self, value: &CapturedValue) -> Result<CapturedValue, ValueProblem> {
        if self.is_auto_captured() {
            return Err(ValueProblem::AutoCaptured);
        }
        check_value(self.kind, &self.config, value)
    }

    /// Ghost variables this computation needs. Depends only on the kind,
    /// name, role and configuration, so repeated calls agree.
    pub fn produce_ghosts(&self) -> Vec<GhostVariable> {
        match self.kind {
            VariableKind::Biometric(BiometricKind::BodyMassIndex) => {
                let auto = self.config.auto_capture_flag();
                [BiometricKind::Weight, BiometricKind::Height]
                    .into_iter()
                    .map(|k| {
                        let kind = VariableKind::Biometric(k);
                        GhostVariable::new(&self.name, kind, self.role, auto)
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn serialize(&self) -> VariableRecord {
        VariableRecord {
            id: self.id,
            name: self.name.clone(),
            family: self.kind.family().as_str().to_string(),
            kind: self.kind.label().to_string(),
            role: self.role,
            fields: self.configured_values(),
        }
    }

    /// Rebuild a variable from its record. An unknown kind is an error, not
    /// a skipped entry.
    pub fn deserialize(record: &VariableRecord) -> Result<Self, RecordError> {
        let unknown = || RecordError::UnknownKind {
            family: record.family.clone(),
            kind: record.kind.clone(),
        };
        let family = ModuleFamily::parse(&record.family).ok_or_else(unknown)?;
        let kind = kind_by_label(family, &record.kind).ok_or_else(unknown)?;
        let config = VariableConfig::from_fields(kind, &record.fields).map_err(|source| {
            RecordError::InvalidConfiguration {
                name: record.name.clone(),
                source,
            }
        })?;
        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            kind,
            role: record.role,
            config,
        })
    }
}
