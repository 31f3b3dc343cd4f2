//! Serialized type names.
//!
//! Attribute blobs name types as strings: `System.Type` arguments, the enum type of a named
//! argument or boxed value. The grammar is the reflection one:
//!
//! ```text
//! Namespace.Outer+Inner`1[[Arg, Assembly],Arg2][,]*&, Assembly, Version=1.0.0.0
//! ```
//!
//! Names are turned into synthesized [`crate::metadata::typesystem::TypeReference`]s interned
//! by their owning module, never into definitions.

use std::fmt;

use crate::{
    metadata::{
        signatures::{ArrayShape, NamedTypeRef, TypeSig},
        typesystem::{Module, ResolutionScope},
    },
    Result,
};

/// A type constructor applied after the name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeNameSuffix {
    /// `[]`
    Vector,
    /// `[*]` or `[,,]`, with its rank
    Array(u32),
    /// `*`
    Pointer,
    /// `&`
    ByRef,
}

/// A parsed serialized type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Namespace of the outermost type
    pub namespace: String,
    /// The outermost type followed by each nested type
    pub names: Vec<String>,
    /// Generic arguments, enclosing types' first
    pub arguments: Vec<TypeName>,
    /// Array, pointer and by-ref constructors in application order
    pub suffixes: Vec<TypeNameSuffix>,
    /// Assembly qualification, as written
    pub assembly: Option<String>,
}

impl TypeName {
    /// Parse an assembly-qualified or plain type name.
    ///
    /// # Errors
    /// Returns an error for an empty name, unbalanced brackets or trailing input.
    pub fn parse(input: &str) -> Result<TypeName> {
        let mut cursor = Cursor {
            chars: input.chars().collect(),
            position: 0,
        };

        let name = cursor.type_name(true, false)?;
        cursor.skip_whitespace();
        if cursor.peek().is_some() {
            return Err(malformed_error!(
                "Unexpected input at {} in type name '{}'",
                cursor.position,
                input
            ));
        }
        Ok(name)
    }

    /// `Namespace.Outer.Inner`, the key enum widths are cached under
    #[must_use]
    pub fn full_name(&self) -> String {
        let mut full_name = String::new();
        if !self.namespace.is_empty() {
            full_name.push_str(&self.namespace);
            full_name.push('.');
        }
        full_name.push_str(&self.names.join("."));
        full_name
    }

    /// The named type without arguments or suffixes, interned in `module`
    #[must_use]
    pub fn named_type(&self, module: &Module) -> NamedTypeRef {
        let scope = match &self.assembly {
            Some(assembly) => ResolutionScope::AssemblyName(assembly.clone()),
            None => ResolutionScope::None,
        };

        let (outermost, nested) = self.names.split_first().map_or(("", &[][..]), |(first, rest)| {
            (first.as_str(), rest)
        });
        let mut reference = module.synthesized_type(&self.namespace, outermost, scope);
        for name in nested {
            reference = module.synthesized_type("", name, ResolutionScope::Enclosing(reference));
        }
        NamedTypeRef::reference(&reference)
    }

    /// The full type, with generic arguments and suffixes applied
    #[must_use]
    pub fn to_type_sig(&self, module: &Module) -> TypeSig {
        let definition = self.named_type(module);
        let mut ty = if self.arguments.is_empty() {
            TypeSig::Named(definition)
        } else {
            TypeSig::GenericInstance {
                definition,
                arguments: self
                    .arguments
                    .iter()
                    .map(|argument| argument.to_type_sig(module))
                    .collect(),
            }
        };

        for suffix in &self.suffixes {
            ty = match suffix {
                TypeNameSuffix::Vector => TypeSig::Array {
                    element: Box::new(ty),
                    shape: None,
                },
                TypeNameSuffix::Array(rank) => TypeSig::Array {
                    element: Box::new(ty),
                    shape: Some(ArrayShape {
                        rank: *rank,
                        ..ArrayShape::default()
                    }),
                },
                TypeNameSuffix::Pointer => TypeSig::Pointer(Box::new(ty)),
                TypeNameSuffix::ByRef => TypeSig::ByRef(Box::new(ty)),
            };
        }
        ty
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }
        f.write_str(&self.names.join("+"))?;

        if !self.arguments.is_empty() {
            f.write_str("[")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "[{argument}]")?;
            }
            f.write_str("]")?;
        }

        for suffix in &self.suffixes {
            match suffix {
                TypeNameSuffix::Vector => f.write_str("[]")?,
                TypeNameSuffix::Array(1) => f.write_str("[*]")?,
                TypeNameSuffix::Array(rank) => {
                    write!(f, "[{}]", ",".repeat(rank.saturating_sub(1) as usize))?;
                }
                TypeNameSuffix::Pointer => f.write_str("*")?,
                TypeNameSuffix::ByRef => f.write_str("&")?,
            }
        }

        if let Some(assembly) = &self.assembly {
            write!(f, ", {assembly}")?;
        }
        Ok(())
    }
}

struct Cursor {
    chars: Vec<char>,
    position: usize,
}

impl Cursor {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_past_whitespace(&self) -> Option<char> {
        self.chars[self.position.min(self.chars.len())..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.position += 1;
                Ok(())
            }
            other => Err(malformed_error!(
                "Expected '{}' at {} in type name, found {:?}",
                expected,
                self.position,
                other
            )),
        }
    }

    /// An identifier up to the next unescaped delimiter
    fn identifier(&mut self) -> Result<String> {
        self.skip_whitespace();
        let mut identifier = String::new();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.position += 1;
                    let Some(escaped) = self.peek() else {
                        return Err(malformed_error!("Dangling escape in type name"));
                    };
                    identifier.push(escaped);
                }
                ',' | '+' | '[' | ']' | '*' | '&' => break,
                _ => identifier.push(c),
            }
            self.position += 1;
        }

        let identifier = identifier.trim_end().to_string();
        if identifier.is_empty() {
            return Err(malformed_error!("Empty name at {} in type name", self.position));
        }
        Ok(identifier)
    }

    fn type_name(&mut self, allow_assembly: bool, bracketed: bool) -> Result<TypeName> {
        let dotted = self.identifier()?;
        let (namespace, outermost) = match dotted.rsplit_once('.') {
            Some((namespace, name)) => (namespace.to_string(), name.to_string()),
            None => (String::new(), dotted),
        };

        let mut names = vec![outermost];
        while self.peek() == Some('+') {
            self.position += 1;
            names.push(self.identifier()?);
        }

        let mut name = TypeName {
            namespace,
            names,
            arguments: Vec::new(),
            suffixes: Vec::new(),
            assembly: None,
        };

        if self.peek() == Some('[') && self.opens_arguments() {
            self.position += 1;
            loop {
                self.skip_whitespace();
                let argument = if self.peek() == Some('[') {
                    self.position += 1;
                    let argument = self.type_name(true, true)?;
                    self.expect(']')?;
                    argument
                } else {
                    self.type_name(false, false)?
                };
                name.arguments.push(argument);

                self.skip_whitespace();
                match self.peek() {
                    Some(',') => self.position += 1,
                    Some(']') => {
                        self.position += 1;
                        break;
                    }
                    other => {
                        return Err(malformed_error!(
                            "Unterminated generic arguments in type name, found {:?}",
                            other
                        ))
                    }
                }
            }
        }

        self.suffixes(&mut name.suffixes)?;

        self.skip_whitespace();
        if allow_assembly && self.peek() == Some(',') {
            self.position += 1;
            let mut assembly = String::new();
            while let Some(c) = self.peek() {
                if bracketed && c == ']' {
                    break;
                }
                assembly.push(c);
                self.position += 1;
            }

            let assembly = assembly.trim();
            if assembly.is_empty() {
                return Err(malformed_error!("Empty assembly name in type name"));
            }
            name.assembly = Some(assembly.to_string());
        }

        Ok(name)
    }

    /// True if the `[` at the cursor starts a generic argument list rather than an array
    fn opens_arguments(&self) -> bool {
        let next = self.chars[self.position + 1..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace());
        !matches!(next, None | Some(']' | ',' | '*'))
    }

    fn suffixes(&mut self, suffixes: &mut Vec<TypeNameSuffix>) -> Result<()> {
        loop {
            match self.peek_past_whitespace() {
                Some('*') => {
                    self.skip_whitespace();
                    self.position += 1;
                    suffixes.push(TypeNameSuffix::Pointer);
                }
                Some('&') => {
                    self.skip_whitespace();
                    self.position += 1;
                    suffixes.push(TypeNameSuffix::ByRef);
                }
                Some('[') => {
                    self.skip_whitespace();
                    self.position += 1;
                    self.skip_whitespace();
                    match self.peek() {
                        Some(']') => suffixes.push(TypeNameSuffix::Vector),
                        Some('*') => {
                            self.position += 1;
                            suffixes.push(TypeNameSuffix::Array(1));
                            self.skip_whitespace();
                        }
                        Some(',') => {
                            let mut rank = 1;
                            while self.peek() == Some(',') {
                                rank += 1;
                                self.position += 1;
                                self.skip_whitespace();
                            }
                            suffixes.push(TypeNameSuffix::Array(rank));
                        }
                        other => {
                            return Err(malformed_error!(
                                "Invalid array suffix in type name, found {:?}",
                                other
                            ))
                        }
                    }
                    self.expect(']')?;
                }
                _ => return Ok(()),
            }
        }
    }
}
