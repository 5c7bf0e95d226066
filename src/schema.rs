//! Schema model: domains, classes, methods and fields.
//!
//! A [`Schema`] holds declarations as an ingester produces them (field types
//! named through domains). [`ResolvedSchema::resolve`] substitutes every
//! domain alias, normalizes defaults and rejects schemas the codec layout
//! cannot represent. Everything downstream reads the resolved model only.

use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Property flags live in one 16-bit word; bit 0 marks a continuation word,
/// which this codec never produces.
pub const MAX_PROPERTY_FIELDS: usize = 15;

/// Wire type of packed boolean fields.
pub const BIT_TYPE: &str = "bit";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("class {class} declares {count} property fields (at most {max} fit in one flags word)", max = MAX_PROPERTY_FIELDS)]
    TooManyProperties { class: String, count: usize },
    #[error("duplicate class index {index}")]
    DuplicateClass { index: u16 },
    #[error("duplicate method {class_index}/{method_index}")]
    DuplicateMethod { class_index: u16, method_index: u16 },
    #[error("field {field} of {owner} has no scalar codec for type {ty}")]
    UnsupportedType { owner: String, field: String, ty: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub value: i64,
}

/// Named type aliases. A domain may name another domain.
#[derive(Debug, Clone, Default)]
pub struct Domains {
    aliases: HashMap<String, String>,
}

impl Domains {
    pub fn insert(&mut self, name: impl Into<String>, ty: impl Into<String>) {
        self.aliases.insert(name.into(), ty.into());
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Follow aliases until a name has no mapping or a name repeats.
    ///
    /// Unknown names resolve to themselves. A self-alias (`bit -> bit`) is how
    /// schemas declare primitives; a longer cycle resolves to the first name
    /// seen twice and is reported.
    pub fn resolve(&self, name: &str) -> String {
        let mut seen = HashSet::new();
        let mut current = name;
        loop {
            if !seen.insert(current) {
                warn!(domain = name, at = current, "domain alias cycle");
                return current.to_string();
            }
            match self.aliases.get(current) {
                Some(next) if next == current => return current.to_string(),
                Some(next) => current = next.as_str(),
                None => return current.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    /// Domain or base type name.
    pub domain: String,
    pub reserved: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        FieldDecl { name: name.into(), domain: domain.into(), reserved: false }
    }

    pub fn reserved(name: impl Into<String>, domain: impl Into<String>) -> Self {
        FieldDecl { name: name.into(), domain: domain.into(), reserved: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub index: u16,
    pub name: String,
    pub content: bool,
    pub deprecated: bool,
    /// `None` when the schema omits the attribute.
    pub synchronous: Option<bool>,
    pub responses: Vec<String>,
    pub fields: Vec<FieldDecl>,
}

impl MethodDecl {
    pub fn new(index: u16, name: impl Into<String>) -> Self {
        MethodDecl {
            index,
            name: name.into(),
            content: false,
            deprecated: false,
            synchronous: None,
            responses: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn content(mut self) -> Self {
        self.content = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = Some(synchronous);
        self
    }

    pub fn response(mut self, name: impl Into<String>) -> Self {
        self.responses.push(name.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub index: u16,
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    pub fn new(index: u16, name: impl Into<String>) -> Self {
        ClassDecl { index, name: name.into(), fields: Vec::new(), methods: Vec::new() }
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

/// Root schema as supplied by ingestion: version, port, constants, domains, classes.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: Version,
    pub port: u16,
    pub constants: Vec<Constant>,
    pub domains: Domains,
    pub classes: Vec<ClassDecl>,
}

impl Schema {
    pub fn new(version: Version, port: u16) -> Self {
        Schema {
            version,
            port,
            constants: Vec::new(),
            domains: Domains::default(),
            classes: Vec::new(),
        }
    }

    pub fn constant(mut self, name: impl Into<String>, value: i64) -> Self {
        self.constants.push(Constant { name: name.into(), value });
        self
    }

    pub fn domain(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.domains.insert(name, ty);
        self
    }

    pub fn class(mut self, class: ClassDecl) -> Self {
        self.classes.push(class);
        self
    }
}

/// A field with its type already domain-resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: String,
    pub reserved: bool,
}

impl Field {
    pub fn is_bit(&self) -> bool {
        self.ty == BIT_TYPE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub class_name: String,
    pub class_index: u16,
    pub content: bool,
    pub deprecated: bool,
    pub index: u16,
    pub name: String,
    pub synchronous: bool,
    pub responses: Vec<String>,
    pub fields: Vec<Field>,
}

impl Method {
    /// `class-method`, the name constructors are derived from.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.class_name, self.name)
    }

    pub fn accessible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.reserved)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub index: u16,
    pub name: String,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

impl Class {
    /// `class-properties`, the name the property constructor is derived from.
    pub fn full_name(&self) -> String {
        format!("{}-properties", self.name)
    }

    pub fn accessible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.reserved)
    }
}

/// Reject a class whose properties do not fit a single flags word.
pub fn check_property_capacity(class: &Class) -> Result<(), SchemaError> {
    if class.fields.len() > MAX_PROPERTY_FIELDS {
        return Err(SchemaError::TooManyProperties {
            class: class.name.clone(),
            count: class.fields.len(),
        });
    }
    Ok(())
}

/// Resolved, validated schema. Immutable once built.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub version: Version,
    pub port: u16,
    pub constants: Vec<Constant>,
    classes: Vec<Class>,
    classes_by_index: HashMap<u16, usize>,
    methods_by_index: HashMap<(u16, u16), (usize, usize)>,
}

impl ResolvedSchema {
    pub fn resolve(schema: &Schema) -> Result<Self, SchemaError> {
        let resolve_fields = |fields: &[FieldDecl]| -> Vec<Field> {
            fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    ty: schema.domains.resolve(&f.domain),
                    reserved: f.reserved,
                })
                .collect()
        };

        let mut classes = Vec::with_capacity(schema.classes.len());
        let mut classes_by_index = HashMap::new();
        let mut methods_by_index = HashMap::new();
        for (ci, c) in schema.classes.iter().enumerate() {
            if classes_by_index.insert(c.index, ci).is_some() {
                return Err(SchemaError::DuplicateClass { index: c.index });
            }
            let methods = c
                .methods
                .iter()
                .map(|m| Method {
                    class_name: c.name.clone(),
                    class_index: c.index,
                    content: m.content,
                    deprecated: m.deprecated,
                    index: m.index,
                    name: m.name.clone(),
                    synchronous: m.synchronous.unwrap_or(true),
                    responses: m.responses.clone(),
                    fields: resolve_fields(&m.fields),
                })
                .collect::<Vec<_>>();
            for (mi, m) in methods.iter().enumerate() {
                if methods_by_index.insert((c.index, m.index), (ci, mi)).is_some() {
                    return Err(SchemaError::DuplicateMethod {
                        class_index: c.index,
                        method_index: m.index,
                    });
                }
            }
            let class = Class {
                index: c.index,
                name: c.name.clone(),
                fields: resolve_fields(&c.fields),
                methods,
            };
            check_property_capacity(&class)?;
            classes.push(class);
        }

        Ok(ResolvedSchema {
            version: schema.version,
            port: schema.port,
            constants: schema.constants.clone(),
            classes,
            classes_by_index,
            methods_by_index,
        })
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    /// All methods, class by class, in declared order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.classes.iter().flat_map(|c| c.methods.iter())
    }

    pub fn get_class(&self, index: u16) -> Option<&Class> {
        self.classes_by_index.get(&index).map(|&i| &self.classes[i])
    }

    pub fn get_method(&self, class_index: u16, method_index: u16) -> Option<&Method> {
        self.methods_by_index
            .get(&(class_index, method_index))
            .map(|&(ci, mi)| &self.classes[ci].methods[mi])
    }
}
