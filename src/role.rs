//! Role definitions and lookup

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::CrewError;

/// A named persona: what it is, what it wants, how it talks
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Role {
    pub id: String,
    /// Display name, e.g. "Pesquisador Especialista"
    pub role: String,
    /// Objective the role works toward
    pub goal: String,
    /// Persona text
    pub backstory: String,
}

impl Role {
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }
}

/// Static role lookup, built once per run
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: HashMap<String, Role>,
}

impl RoleRegistry {
    /// Build the registry, rejecting duplicate ids
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Result<Self, CrewError> {
        let mut map = HashMap::new();
        for role in roles {
            if map.contains_key(&role.id) {
                return Err(CrewError::DuplicateRole { id: role.id });
            }
            map.insert(role.id.clone(), role);
        }
        Ok(Self { roles: map })
    }

    /// Look up a role for a task
    pub fn get(&self, role_id: &str, task_id: &str) -> Result<&Role, CrewError> {
        self.roles.get(role_id).ok_or_else(|| CrewError::UnknownRole {
            role_id: role_id.to_string(),
            task_id: task_id.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
