use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::line_range::LineRange;

/// Structure of one Python module as reported by `parse_file.py`.
///
/// Every list keeps the order in which the items are declared in the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    /// Syntax errors reported by the parser; a non-empty list means the parse failed
    #[serde(default)]
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub docstring: String,
    pub line: u32,
    #[serde(default)]
    pub endline: u32,
    #[serde(default)]
    pub is_testcase: bool,
    #[serde(default)]
    pub bases: Vec<Value>,
    #[serde(default)]
    pub static_fields: Vec<StaticField>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub controls: Vec<ControlInfo>,
}

impl ClassInfo {
    pub fn line_range(&self) -> LineRange {
        LineRange::new(self.line, self.endline.max(self.line))
    }
}

/// A class-level assignment, serialized as `[name, value, line]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticField(pub String, pub String, pub u32);

impl StaticField {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> &str {
        &self.1
    }

    pub fn line(&self) -> u32 {
        self.2
    }
}

/// A UI control declared through `update_locator({...})` in a class `__init__`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInfo {
    pub name: String,
    pub line: u32,
    #[serde(default)]
    pub endline: u32,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

impl ControlInfo {
    /// Control class name, taken from `attrs.type = [module, name]`
    pub fn type_name(&self) -> Option<&str> {
        self.attrs
            .get("type")
            .and_then(|t| t.get(1))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    #[serde(default)]
    pub docstring: String,
    pub line: u32,
    #[serde(default)]
    pub endline: u32,
    #[serde(default)]
    pub steps: Vec<StepInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub name: String,
    #[serde(default)]
    pub docstring: String,
    pub line: u32,
    #[serde(default)]
    pub endline: u32,
}

impl ParsedDocument {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Resolve a docstring for the module (`None`), a class or module function
    /// (`"Name"`), or a method (`"Class.method"`).
    pub fn docstring_for(&self, item: Option<&str>) -> Option<&str> {
        let Some(item) = item else {
            return self.docstring.as_deref();
        };

        if let Some((class_name, func_name)) = item.split_once('.') {
            return self
                .find_class(class_name)?
                .functions
                .iter()
                .find(|f| f.name == func_name)
                .map(|f| f.docstring.as_str());
        }

        if let Some(class) = self.find_class(item) {
            return Some(&class.docstring);
        }
        self.functions
            .iter()
            .find(|f| f.name == item)
            .map(|f| f.docstring.as_str())
    }
}
