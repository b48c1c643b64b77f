//! Request/event descriptors and their typed parameters.

use serde::{Deserialize, Serialize};

/// Wire type of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    Int,
    Uint,
    Fixed,
    String,
    Fd,
    Object,
    NewId,
    Array,
}

impl ArgType {
    /// Human-readable type name.
    pub fn display_name(self) -> &'static str {
        match self {
            ArgType::Int => "int",
            ArgType::Uint => "uint",
            ArgType::Fixed => "fixed",
            ArgType::String => "string",
            ArgType::Fd => "fd",
            ArgType::Object => "object",
            ArgType::NewId => "new_id",
            ArgType::Array => "array",
        }
    }

    fn can_be_null(self) -> bool {
        matches!(self, ArgType::String | ArgType::Object)
    }

    fn can_carry_interface(self) -> bool {
        matches!(self, ArgType::Object | ArgType::NewId)
    }

    fn can_carry_enum(self) -> bool {
        matches!(self, ArgType::Int | ArgType::Uint)
    }
}

/// One declared parameter of a request or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    /// Interface constraint for object / typed new_id parameters. A `new_id`
    /// without one is dynamically typed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_null: bool,
    /// Enumeration constraining an int/uint value, either local (`"foo"`) or
    /// qualified (`"intf_A.foo"`).
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_ref: Option<String>,
}

impl ArgDesc {
    pub fn new(name: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            name: name.into(),
            arg_type,
            interface: None,
            allow_null: false,
            enum_ref: None,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::Int)
    }

    pub fn uint(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::Uint)
    }

    pub fn fixed(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::Fixed)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::String)
    }

    pub fn fd(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::Fd)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::Array)
    }

    /// Object reference, optionally constrained to an interface.
    pub fn object(name: impl Into<String>, interface: Option<&str>) -> Self {
        Self {
            interface: interface.map(str::to_string),
            ..Self::new(name, ArgType::Object)
        }
    }

    /// New object of a statically known interface.
    pub fn new_id(name: impl Into<String>, interface: &str) -> Self {
        Self {
            interface: Some(interface.to_string()),
            ..Self::new(name, ArgType::NewId)
        }
    }

    /// New object whose interface and version travel on the wire.
    pub fn new_id_dynamic(name: impl Into<String>) -> Self {
        Self::new(name, ArgType::NewId)
    }

    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn with_enum(mut self, enum_ref: impl Into<String>) -> Self {
        self.enum_ref = Some(enum_ref.into());
        self
    }

    /// True for a `new_id` carrying its interface name and version on the wire.
    pub fn is_dynamic_new_id(&self) -> bool {
        self.arg_type == ArgType::NewId && self.interface.is_none()
    }

    /// Signature fragment, e.g. `obj: object<another_intf>?`.
    pub fn signature(&self) -> String {
        let mut out = format!("{}: {}", self.name, self.arg_type.display_name());
        if let Some(interface) = &self.interface {
            out.push_str(&format!("<{}>", interface));
        }
        if let Some(enum_ref) = &self.enum_ref {
            out.push_str(&format!("<enum {}>", enum_ref));
        }
        if self.allow_null {
            out.push('?');
        }
        out
    }

    pub(crate) fn check(&self, owner: &str) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err(format!("{}: parameter name cannot be empty", owner));
        }
        if self.allow_null && !self.arg_type.can_be_null() {
            return Err(format!(
                "{}.{}: {} parameters cannot be nullable",
                owner,
                self.name,
                self.arg_type.display_name()
            ));
        }
        if self.interface.is_some() && !self.arg_type.can_carry_interface() {
            return Err(format!(
                "{}.{}: only object and new_id parameters take an interface",
                owner, self.name
            ));
        }
        if self.enum_ref.is_some() && !self.arg_type.can_carry_enum() {
            return Err(format!(
                "{}.{}: only int and uint parameters take an enum",
                owner, self.name
            ));
        }
        Ok(())
    }
}

/// Whether a request ends the object's life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Normal,
    Destructor,
}

fn default_since() -> u32 {
    1
}

/// A request or event. Its opcode is its position in the owning sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDesc {
    pub name: String,
    #[serde(default = "default_since")]
    pub since: u32,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub args: Vec<ArgDesc>,
}

impl MessageDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            since: 1,
            kind: MessageKind::Normal,
            args: Vec::new(),
        }
    }

    pub fn since(mut self, since: u32) -> Self {
        self.since = since;
        self
    }

    pub fn destructor(mut self) -> Self {
        self.kind = MessageKind::Destructor;
        self
    }

    pub fn arg(mut self, arg: ArgDesc) -> Self {
        self.args.push(arg);
        self
    }

    pub fn is_destructor(&self) -> bool {
        self.kind == MessageKind::Destructor
    }

    /// Number of file descriptors the message carries out of band.
    pub fn fd_count(&self) -> usize {
        self.args
            .iter()
            .filter(|a| a.arg_type == ArgType::Fd)
            .count()
    }

    /// Signature line, e.g. `rq1(interface: string, ...) since 1`.
    pub fn to_signature_line(&self) -> String {
        let args: Vec<String> = self.args.iter().map(ArgDesc::signature).collect();
        let destructor = if self.is_destructor() { " [destructor]" } else { "" };
        format!(
            "{}({}) since {}{}",
            self.name,
            args.join(", "),
            self.since,
            destructor
        )
    }
}
