//! Plugin records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::PluginError;

/// Which hook a plugin answers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    #[default]
    Generic,
    PostReorganization,
    PostUndo,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Generic => "generic",
            Self::PostReorganization => "post_reorganization",
            Self::PostUndo => "post_undo",
        };
        f.write_str(name)
    }
}

/// The executable capability of a plugin
pub trait PluginExecute: Send + Sync {
    fn execute(&self, args: &[String]) -> Result<Option<String>, PluginError>;
}

impl<F> PluginExecute for F
where
    F: Fn(&[String]) -> Result<Option<String>, PluginError> + Send + Sync,
{
    fn execute(&self, args: &[String]) -> Result<Option<String>, PluginError> {
        self(args)
    }
}

/// A registered plugin
#[derive(Clone)]
pub struct PluginRecord {
    pub name: String,
    pub description: String,
    pub kind: PluginKind,
    execute: Option<Arc<dyn PluginExecute>>,
}

impl PluginRecord {
    pub fn new(name: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            execute: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_execute(mut self, execute: impl PluginExecute + 'static) -> Self {
        self.execute = Some(Arc::new(execute));
        self
    }

    pub fn is_executable(&self) -> bool {
        self.execute.is_some()
    }

    pub(crate) fn capability(&self) -> Option<&Arc<dyn PluginExecute>> {
        self.execute.as_ref()
    }

    /// Serializable summary for listings
    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind,
            executable: self.is_executable(),
        }
    }
}

impl fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("executable", &self.is_executable())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub kind: PluginKind,
    pub executable: bool,
}
