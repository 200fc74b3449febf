use std::collections::BTreeMap;

use pl_core::{Diagnostic, Gender, ParleyError, Value};

use super::Dialogue;

// Typed getters return the type's default when the variable is unset or holds
// a different type.
impl Dialogue {
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Store `value` under `name`. Invalid values and unresolved variable
    /// references are rejected and logged.
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if value.is_invalid() || value.is_variable() {
            self.report(Diagnostic::error(ParleyError::new(
                "RUNTIME_SET_INVALID",
                format!(
                    "Variable \"{}\" cannot hold a {} value.",
                    name,
                    value.type_name()
                ),
            )));
            return;
        }
        self.variables.insert(name.to_string(), value);
    }

    pub fn variable_int(&self, name: &str) -> i32 {
        self.variable(name)
            .and_then(Value::as_int)
            .unwrap_or_default()
    }

    pub fn set_variable_int(&mut self, name: &str, value: i32) {
        self.set_variable(name, value);
    }

    pub fn variable_float(&self, name: &str) -> f32 {
        self.variable(name)
            .and_then(Value::as_float)
            .unwrap_or_default()
    }

    pub fn set_variable_float(&mut self, name: &str, value: f32) {
        self.set_variable(name, value);
    }

    pub fn variable_bool(&self, name: &str) -> bool {
        self.variable(name)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }

    pub fn set_variable_bool(&mut self, name: &str, value: bool) {
        self.set_variable(name, value);
    }

    pub fn variable_text(&self, name: &str) -> &str {
        self.variable(name).and_then(Value::as_text).unwrap_or("")
    }

    pub fn set_variable_text(&mut self, name: &str, value: impl Into<String>) {
        self.set_variable(name, Value::Text(value.into()));
    }

    pub fn variable_gender(&self, name: &str) -> Gender {
        self.variable(name)
            .and_then(Value::as_gender)
            .unwrap_or_default()
    }

    pub fn set_variable_gender(&mut self, name: &str, value: Gender) {
        self.set_variable(name, value);
    }
}
