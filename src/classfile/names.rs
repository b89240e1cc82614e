use crate::typeid::{FieldDescriptor, ParseDescriptor};

/// Check an unqualified name (a single segment of a binary name)
pub fn check_unqualified_name(name: &[u8]) -> Result<(), String> {
    if name.is_empty() {
        Err("Unqualified name is empty".to_string())
    } else if let Some(c) = name.iter().find(|c| matches!(c, b'.' | b';' | b'[' | b'/')) {
        Err(format!(
            "Unqualified name '{}' contains the illegal character '{}'",
            String::from_utf8_lossy(name),
            char::from(*c)
        ))
    } else {
        Ok(())
    }
}

/// Check a binary class name (eg. `java/lang/Object`)
///
/// Array classes (named by their descriptor, eg. `[I`) are only accepted if `allow_arrays` is
/// set, and then the descriptor must be an array of a legal element type.
pub fn check_class_name(name: &[u8], allow_arrays: bool) -> Result<(), String> {
    match name.first() {
        None => Err("Binary name is empty".to_string()),
        Some(b'[') if !allow_arrays => Err(format!(
            "Array class '{}' is not allowed here",
            String::from_utf8_lossy(name)
        )),
        Some(b'[') => match FieldDescriptor::parse(name) {
            Ok(desc) => match desc.element_class() {
                Some(element) => check_class_name(element, false),
                None => Ok(()),
            },
            Err(err) => Err(err.to_string()),
        },
        Some(_) => name.split(|&c| c == b'/').try_for_each(check_unqualified_name),
    }
}

pub fn is_legal_class_name(name: &[u8], allow_arrays: bool) -> bool {
    check_class_name(name, allow_arrays).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn class_names() {
        assert!(is_legal_class_name(b"java/lang/Object", false));
        assert!(is_legal_class_name(b"Foo", false));
        assert!(is_legal_class_name(b"Outer$Inner", false));
        assert!(!is_legal_class_name(b"", false));
        assert!(!is_legal_class_name(b"java//Object", false));
        assert!(!is_legal_class_name(b"java/lang/", false));
        assert!(!is_legal_class_name(b"java.lang.Object", false));
        assert!(!is_legal_class_name(b"Foo;", false));
    }

    #[test]
    fn array_names() {
        assert!(!is_legal_class_name(b"[I", false));
        assert!(is_legal_class_name(b"[I", true));
        assert!(is_legal_class_name(b"[[Ljava/lang/String;", true));
        assert!(!is_legal_class_name(b"[Ljava.lang.String;", true));
        assert!(!is_legal_class_name(b"[V", true));
        assert!(!is_legal_class_name(b"[X", true));
    }
}
