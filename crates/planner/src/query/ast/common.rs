#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

/// A type used in a cast, e.g. `"int4"` or `"text"[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub name: String,
    pub array: bool,
}

impl TypeName {
    pub fn new(name: &str) -> Self {
        TypeName {
            name: name.to_string(),
            array: false,
        }
    }

    pub fn array_of(name: &str) -> Self {
        TypeName {
            name: name.to_string(),
            array: true,
        }
    }
}
