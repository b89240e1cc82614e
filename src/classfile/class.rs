use super::storage::slice;
use super::{
    Arena, ClassAccessFlags, ClassAttributes, ClassStorage, ClassTable, CodeRange, CodeStorage,
    ConstantIndex, ConstantPool, Error, ExceptionHandler, FieldBlock, InnerClass, LineNumber,
    LoaderId, LocalVariable, MethodBlock, Version,
};
use crate::typeid::{
    ClassTypeId, ElementType, ExecEnv, FieldDescriptor, FieldTypeId, MethodTypeId,
    ParseDescriptor, TypeIds,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Type id whose reference belongs to a class
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OwnedTypeId {
    Class(ClassTypeId),
    Field(FieldTypeId),
    Method(MethodTypeId),
}

impl OwnedTypeId {
    pub fn release(self, ids: &TypeIds) {
        match self {
            OwnedTypeId::Class(id) => ids.dispose_class_id(id),
            OwnedTypeId::Field(id) => ids.dispose_field_id(id),
            OwnedTypeId::Method(id) => ids.dispose_method_id(id),
        }
    }
}

/// Layout facts about a primitive type
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PrimitiveInfo {
    pub name: &'static str,

    /// Descriptor character (eg. `I`)
    pub signature: u8,

    /// Array type code, as used by `newarray`
    pub type_code: u8,

    /// Bytes taken by a value in a local variable or field slot
    pub slot_size: u8,

    /// Bytes taken by a value in an array
    pub element_size: u8,
}

impl PrimitiveInfo {
    pub const ALL: [PrimitiveInfo; 9] = [
        PrimitiveInfo::new("void", b'V', 17, 0, 0),
        PrimitiveInfo::new("boolean", b'Z', 4, 4, 1),
        PrimitiveInfo::new("byte", b'B', 8, 4, 1),
        PrimitiveInfo::new("char", b'C', 5, 4, 2),
        PrimitiveInfo::new("short", b'S', 9, 4, 2),
        PrimitiveInfo::new("int", b'I', 10, 4, 4),
        PrimitiveInfo::new("long", b'J', 11, 8, 8),
        PrimitiveInfo::new("float", b'F', 6, 4, 4),
        PrimitiveInfo::new("double", b'D', 7, 8, 8),
    ];

    const fn new(
        name: &'static str,
        signature: u8,
        type_code: u8,
        slot_size: u8,
        element_size: u8,
    ) -> PrimitiveInfo {
        PrimitiveInfo {
            name,
            signature,
            type_code,
            slot_size,
            element_size,
        }
    }

    pub fn named(name: &str) -> Option<PrimitiveInfo> {
        PrimitiveInfo::ALL.iter().find(|info| info.name == name).copied()
    }

    /// Predefined type id of the primitive
    pub fn type_id(&self) -> ClassTypeId {
        match self.signature {
            b'V' => ClassTypeId::VOID,
            b'Z' => ClassTypeId::BOOLEAN,
            b'B' => ClassTypeId::BYTE,
            b'C' => ClassTypeId::CHAR,
            b'S' => ClassTypeId::SHORT,
            b'I' => ClassTypeId::INT,
            b'J' => ClassTypeId::LONG,
            b'F' => ClassTypeId::FLOAT,
            b'D' => ClassTypeId::DOUBLE,
            _ => ClassTypeId::ERROR,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ClassKind {
    /// Class read from a classfile
    Loaded,

    /// Array class synthesized on demand
    Array { depth: u32, element: ClassTypeId },

    /// Class object of a primitive type
    Primitive(PrimitiveInfo),
}

/// Internal representation of a class
///
/// A loaded class owns references to the type ids of itself, its superclass, its interfaces, and
/// its members. These are only given back by `release_type_ids`, once the class is unloaded.
pub struct ClassBlock {
    pub(crate) name: Box<[u8]>,
    pub(crate) id: ClassTypeId,
    pub(crate) super_class: Option<ClassTypeId>,
    pub(crate) loader: Option<LoaderId>,
    pub(crate) access: ClassAccessFlags,
    pub(crate) version: Version,
    pub(crate) kind: ClassKind,
    pub(crate) constants: ConstantPool,
    pub(crate) storage: ClassStorage,
    pub(crate) attributes: ClassAttributes,
    pub(crate) code: Arc<CodeStorage>,
    pub(crate) clinit_code: Mutex<Option<Arc<CodeStorage>>>,
    pub(crate) type_ids: Mutex<Vec<OwnedTypeId>>,
}

/// `Code` attribute of a method
///
/// The view keeps the arena holding the code alive, even if the class frees its `<clinit>`
/// storage in the meantime.
pub struct Code {
    storage: Arc<CodeStorage>,
    range: CodeRange,
}

impl Code {
    pub fn max_stack(&self) -> u16 {
        self.range.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.range.max_locals
    }

    pub fn bytecode(&self) -> &[u8] {
        slice(&self.storage.bytecode, &self.range.bytecode)
    }

    pub fn exception_handlers(&self) -> &[ExceptionHandler] {
        slice(&self.storage.handlers, &self.range.handlers)
    }

    pub fn line_numbers(&self) -> &[LineNumber] {
        slice(&self.storage.line_numbers, &self.range.line_numbers)
    }

    pub fn local_variables(&self) -> &[LocalVariable] {
        slice(&self.storage.local_variables, &self.range.local_variables)
    }
}

impl ClassBlock {
    fn synthesized(
        name: Box<[u8]>,
        id: ClassTypeId,
        super_class: ClassTypeId,
        loader: Option<LoaderId>,
        access: ClassAccessFlags,
        kind: ClassKind,
        type_ids: Vec<OwnedTypeId>,
    ) -> ClassBlock {
        ClassBlock {
            name,
            id,
            super_class: Some(super_class),
            loader,
            access,
            version: Version::JAVA1,
            kind,
            constants: ConstantPool::default(),
            storage: ClassStorage::default(),
            attributes: ClassAttributes::default(),
            code: Arc::new(CodeStorage::default()),
            clinit_code: Mutex::new(None),
            type_ids: Mutex::new(type_ids),
        }
    }

    /// Binary name (or descriptor, for arrays, or keyword, for primitives)
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn id(&self) -> ClassTypeId {
        self.id
    }

    /// Superclass (`None` only for `java/lang/Object`)
    pub fn super_class(&self) -> Option<ClassTypeId> {
        self.super_class
    }

    pub fn loader(&self) -> Option<LoaderId> {
        self.loader
    }

    pub fn access(&self) -> ClassAccessFlags {
        self.access
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array { .. })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ClassKind::Primitive(_))
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn interfaces(&self) -> &[ClassTypeId] {
        &self.storage.interfaces
    }

    pub fn fields(&self) -> &[FieldBlock] {
        &self.storage.fields
    }

    pub fn methods(&self) -> &[MethodBlock] {
        &self.storage.methods
    }

    pub fn inner_classes(&self) -> &[InnerClass] {
        &self.storage.inner_classes
    }

    pub fn find_field(&self, id: FieldTypeId) -> Option<&FieldBlock> {
        self.fields().iter().find(|field| field.id.is_same_member(&id))
    }

    pub fn find_method(&self, id: MethodTypeId) -> Option<&MethodBlock> {
        self.methods().iter().find(|method| method.id.is_same_member(&id))
    }

    fn arena(&self, arena: Arena) -> Option<Arc<CodeStorage>> {
        match arena {
            Arena::Main => Some(self.code.clone()),
            Arena::Clinit => self.clinit_code.lock().clone(),
        }
    }

    /// Code of a method (`None` if it has none, or if it was in freed `<clinit>` storage)
    pub fn code(&self, method: &MethodBlock) -> Option<Code> {
        let range = method.code.clone()?;
        let storage = self.arena(method.arena)?;
        Some(Code { storage, range })
    }

    /// Class constants listed by the `Exceptions` attribute of a method
    pub fn checked_exceptions(&self, method: &MethodBlock) -> Vec<ConstantIndex> {
        match self.arena(method.arena) {
            Some(storage) => slice(&storage.checked_exceptions, &method.exceptions).to_vec(),
            None => vec![],
        }
    }

    pub fn source_file(&self) -> Option<&[u8]> {
        let index = self.attributes.source_file?;
        self.constants.utf8(index).ok()
    }

    pub fn absolute_source_path(&self) -> Option<&[u8]> {
        let index = self.attributes.absolute_source_path?;
        self.constants.utf8(index).ok()
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.attributes.timestamp
    }

    pub fn is_deprecated(&self) -> bool {
        self.attributes.deprecated
    }

    pub fn is_synthetic(&self) -> bool {
        self.attributes.synthetic
    }

    pub fn has_clinit_storage(&self) -> bool {
        self.clinit_code.lock().is_some()
    }

    /// Release the storage of `<clinit>`, once static initialization is over
    ///
    /// Returns whether there was anything to release.
    pub fn free_clinit_memory(&self) -> bool {
        let freed = self.clinit_code.lock().take().is_some();
        if freed {
            log::debug!("Freed <clinit> storage of {}", String::from_utf8_lossy(&self.name));
        }
        freed
    }

    /// Give back every type id reference held by the class (idempotent)
    pub fn release_type_ids(&self, ids: &TypeIds) {
        let owned = std::mem::take(&mut *self.type_ids.lock());
        for id in owned {
            id.release(ids);
        }
    }
}

/// Intern an id which is permanent from then on
fn pinned_class_id(ids: &TypeIds, ee: ExecEnv, name: &[u8]) -> Result<ClassTypeId, Error> {
    let id = ids.new_class_id(ee, name)?;
    ids.pin_class_id(id);
    Ok(id)
}

fn copy_name(name: &[u8]) -> Result<Box<[u8]>, Error> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(name.len())
        .map_err(|_| Error::OutOfMemory)?;
    copy.extend_from_slice(name);
    Ok(copy.into_boxed_slice())
}

/// Synthesize and register the class of an array type (eg. `[I`, `[[Ljava/lang/String;`)
///
/// Arrays of classes are public exactly when their element class is. The class is permanent.
pub fn create_fake_array_class(
    ids: &TypeIds,
    table: &ClassTable,
    ee: ExecEnv,
    name: &[u8],
    element: Option<&ClassBlock>,
    loader: Option<LoaderId>,
) -> Result<Arc<ClassBlock>, Error> {
    let desc = match FieldDescriptor::parse(name) {
        Ok(desc) if desc.dimensions > 0 => desc,
        Ok(_) => return Err(Error::MalformedInput("Bad name")),
        Err(err) => return Err(err.into()),
    };
    let public = match desc.element {
        ElementType::Base(_) => ClassAccessFlags::PUBLIC,
        ElementType::Object(_) => element.map_or(ClassAccessFlags::empty(), |element| {
            element.access() & ClassAccessFlags::PUBLIC
        }),
    };

    let id = pinned_class_id(ids, ee, name)?;
    let object = pinned_class_id(ids, ee, b"java/lang/Object")?;
    let class = ClassBlock::synthesized(
        copy_name(name)?,
        id,
        object,
        loader,
        ClassAccessFlags::FINAL | ClassAccessFlags::ABSTRACT | public,
        ClassKind::Array {
            depth: desc.dimensions,
            element: id.base_type(),
        },
        vec![],
    );
    let class = Arc::new(class);
    table.add(class.clone())?;
    Ok(class)
}

/// Synthesize and register the class object of a primitive type
pub fn create_primitive_class(
    ids: &TypeIds,
    table: &ClassTable,
    ee: ExecEnv,
    info: PrimitiveInfo,
) -> Result<Arc<ClassBlock>, Error> {
    let id = info.type_id();
    if id.is_error() {
        return Err(Error::MalformedInput("Bad name"));
    }
    let object = pinned_class_id(ids, ee, b"java/lang/Object")?;
    let class = ClassBlock::synthesized(
        copy_name(info.name.as_bytes())?,
        id,
        object,
        None,
        ClassAccessFlags::FINAL | ClassAccessFlags::ABSTRACT | ClassAccessFlags::PUBLIC,
        ClassKind::Primitive(info),
        vec![],
    );
    let class = Arc::new(class);
    table.add(class.clone())?;
    Ok(class)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::typeid::TypeIdConfig;

    const EE: ExecEnv = ExecEnv(7);

    #[test]
    fn primitive_classes() {
        let ids = TypeIds::new(TypeIdConfig::default()).unwrap();
        let table = ClassTable::new();
        for info in PrimitiveInfo::ALL {
            let class = create_primitive_class(&ids, &table, EE, info).unwrap();
            assert!(class.is_primitive());
            assert_eq!(ids.class_name_to_string(class.id()), info.name);
            assert_eq!(class.id(), info.type_id());
        }
        assert_eq!(table.len(), 9);
        assert_eq!(PrimitiveInfo::named("void").unwrap().type_id(), ClassTypeId::VOID);
        assert_eq!(PrimitiveInfo::named("boolean").unwrap().type_id(), ClassTypeId::BOOLEAN);
        assert_eq!(PrimitiveInfo::named("double").unwrap().type_id(), ClassTypeId::DOUBLE);
        let long = table.find(b"long", None).unwrap();
        assert_eq!(long.kind(), ClassKind::Primitive(PrimitiveInfo::named("long").unwrap()));
        assert!(long.access().contains(ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL));

        let object = ids.lookup_class_id(b"java/lang/Object").unwrap();
        assert_eq!(long.super_class(), Some(object));
        assert_eq!(ids.class_ref_count(object), Some(u8::MAX));
    }

    #[test]
    fn array_classes() {
        let ids = TypeIds::new(TypeIdConfig::default()).unwrap();
        let table = ClassTable::new();
        let ints = create_fake_array_class(&ids, &table, EE, b"[[I", None, None).unwrap();
        assert_eq!(
            ints.kind(),
            ClassKind::Array {
                depth: 2,
                element: ClassTypeId::INT
            }
        );
        assert!(ints.access().contains(ClassAccessFlags::PUBLIC));
        assert!(ints.methods().is_empty());

        // Not public, since the element class is unknown here
        let loader = Some(LoaderId(3));
        let strings =
            create_fake_array_class(&ids, &table, EE, b"[Ljava/lang/String;", None, loader)
                .unwrap();
        assert!(!strings.access().contains(ClassAccessFlags::PUBLIC));
        assert!(strings.is_array());
        let string = ids.lookup_class_id(b"java/lang/String").unwrap();
        assert_eq!(ids.class_ref_count(string), Some(u8::MAX));

        assert!(matches!(
            create_fake_array_class(&ids, &table, EE, b"[[I", None, None),
            Err(Error::DuplicateDefinition(_))
        ));
        assert!(create_fake_array_class(&ids, &table, EE, b"I", None, None).is_err());
        assert_eq!(table.len(), 2);
    }
}
