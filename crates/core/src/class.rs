//! Class database: class/method/field definitions and parent-chain lookup.

use std::collections::HashMap;

use crate::ast::StmtId;
use crate::errors::{MachineError, MemberKind};

#[derive(Debug)]
pub struct FieldDef {
    pub name: String,
}

#[derive(Debug)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<String>,
    pub entry: StmtId,
}

#[derive(Debug)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub fields: HashMap<String, FieldDef>,
    pub methods: HashMap<String, MethodDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        ClassDef {
            name: name.into(),
            parent,
            fields: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

/// The process-wide (here: per-[`crate::context::MachineContext`]) registry of
/// classes. `lookupMethod`/`lookupField` recurse toward the root, returning the
/// shallowest match; `register` overwrites on a name collision, matching the
/// assumption that class names are unique in a well-formed program.
#[derive(Debug, Default)]
pub struct ClassDatabase {
    classes: HashMap<String, ClassDef>,
}

impl ClassDatabase {
    pub fn new() -> Self {
        ClassDatabase {
            classes: HashMap::new(),
        }
    }

    pub fn register(&mut self, class: ClassDef) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn lookup_method(&self, class_name: &str, method: &str) -> Result<&MethodDef, MachineError> {
        let mut current = class_name;
        loop {
            let class = self.classes.get(current).ok_or_else(|| MachineError::NoSuchMember {
                class_name: class_name.to_string(),
                member: method.to_string(),
                kind: MemberKind::Method,
            })?;
            if let Some(m) = class.methods.get(method) {
                return Ok(m);
            }
            match &class.parent {
                Some(parent) => current = parent,
                None => {
                    return Err(MachineError::NoSuchMember {
                        class_name: class_name.to_string(),
                        member: method.to_string(),
                        kind: MemberKind::Method,
                    })
                }
            }
        }
    }

    pub fn lookup_field(&self, class_name: &str, field: &str) -> Result<&FieldDef, MachineError> {
        let mut current = class_name;
        loop {
            let class = self.classes.get(current).ok_or_else(|| MachineError::NoSuchMember {
                class_name: class_name.to_string(),
                member: field.to_string(),
                kind: MemberKind::Field,
            })?;
            if let Some(f) = class.fields.get(field) {
                return Ok(f);
            }
            match &class.parent {
                Some(parent) => current = parent,
                None => {
                    return Err(MachineError::NoSuchMember {
                        class_name: class_name.to_string(),
                        member: field.to_string(),
                        kind: MemberKind::Field,
                    })
                }
            }
        }
    }

    /// `T` equals this class's name, or is the name of any ancestor.
    pub fn is_instance_of(&self, class_name: &str, target: &str) -> bool {
        let mut current = Some(class_name);
        while let Some(name) = current {
            if name == target {
                return true;
            }
            current = self.classes.get(name).and_then(|c| c.parent.as_deref());
        }
        false
    }

    /// The first class, in registration order, whose method table contains `main`.
    pub fn find_main_class(&self, order: &[String]) -> Option<&str> {
        order
            .iter()
            .find(|name| {
                self.classes
                    .get(name.as_str())
                    .map(|c| c.methods.contains_key("main"))
                    .unwrap_or(false)
            })
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StmtArena;

    fn dummy_entry(arena: &mut StmtArena) -> StmtId {
        arena.alloc(crate::ast::StmtKind::Skip, None)
    }

    #[test]
    fn is_instance_of_is_reflexive_and_walks_ancestors() {
        let mut arena = StmtArena::new();
        let entry = dummy_entry(&mut arena);
        let _ = entry;

        let mut db = ClassDatabase::new();
        db.register(ClassDef::new("Object", None));
        db.register(ClassDef::new("Animal", Some("Object".to_string())));
        db.register(ClassDef::new("Dog", Some("Animal".to_string())));

        assert!(db.is_instance_of("Dog", "Dog"));
        assert!(db.is_instance_of("Dog", "Animal"));
        assert!(db.is_instance_of("Dog", "Object"));
        assert!(!db.is_instance_of("Dog", "Cat"));
    }

    #[test]
    fn lookup_method_returns_shallowest_match() {
        let mut arena = StmtArena::new();
        let base_entry = dummy_entry(&mut arena);
        let derived_entry = dummy_entry(&mut arena);

        let mut base = ClassDef::new("Base", None);
        base.methods.insert(
            "greet".to_string(),
            MethodDef {
                name: "greet".to_string(),
                params: vec![],
                entry: base_entry,
            },
        );

        let mut derived = ClassDef::new("Derived", Some("Base".to_string()));
        derived.methods.insert(
            "greet".to_string(),
            MethodDef {
                name: "greet".to_string(),
                params: vec![],
                entry: derived_entry,
            },
        );

        let mut db = ClassDatabase::new();
        db.register(base);
        db.register(derived);

        let found = db.lookup_method("Derived", "greet").unwrap();
        assert_eq!(found.entry, derived_entry);
    }

    #[test]
    fn lookup_method_fails_past_the_root() {
        let mut db = ClassDatabase::new();
        db.register(ClassDef::new("Object", None));
        assert!(db.lookup_method("Object", "nope").is_err());
    }

    #[test]
    fn lookup_field_walks_the_parent_chain_and_fails_past_the_root() {
        let mut base = ClassDef::new("Base", None);
        base.fields.insert("x".to_string(), FieldDef { name: "x".to_string() });

        let mut db = ClassDatabase::new();
        db.register(base);
        db.register(ClassDef::new("Derived", Some("Base".to_string())));

        assert!(db.lookup_field("Derived", "x").is_ok());
        assert!(db.lookup_field("Derived", "nope").is_err());
    }
}
