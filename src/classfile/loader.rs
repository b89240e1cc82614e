use super::names::is_legal_class_name;
use super::storage::{extend, push};
use super::{
    Arena, ClassAccessFlags, ClassAttributes, ClassBlock, ClassKind, ClassReader, ClassStorage,
    ClassTable, CodeRange, CodeStorage, ConstantIndex, ConstantPool, Error, ExceptionHandler,
    FieldAccessFlags, FieldBlock, InnerClass, InnerClassAccessFlags, LineNumber, LoaderId,
    LocalVariable, MethodAccessFlags, MethodBlock, OwnedTypeId, StorageSizes, Version,
};
use crate::typeid::{
    self, ClassTypeId, ExecEnv, FieldDescriptor, FieldTypeId, MethodDescriptor, MethodSigId,
    MethodTypeId, NameTypeId, ParseDescriptor, TypeIds,
};
use crate::util::decode_modified_utf8;
use parking_lot::Mutex;
use std::sync::Arc;

const CLASSFILE_MAGIC: u32 = 0xCAFE_BABE;

/// Most argument slots a method may have (including `this`)
const MAX_ARGS_SIZE: u32 = 255;

/// Longest byte code array of a method
const MAX_CODE_LENGTH: u32 = 65535;

#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Largest accepted `constant_pool_count`
    pub max_constant_pool_size: usize,

    /// Whether `float` and `double` constants and arguments are accepted
    pub allow_floating_point: bool,

    /// Whether the names of the class and its superclass must be legal binary names
    pub check_class_names: bool,
}

impl Default for LoaderConfig {
    fn default() -> LoaderConfig {
        LoaderConfig {
            max_constant_pool_size: 16384,
            allow_floating_point: true,
            check_class_names: true,
        }
    }
}

/// Type id references taken out while a class is being materialized
///
/// Unless the ledger is committed, dropping it gives every reference back, so that an aborted
/// load leaves the tables as it found them.
struct InternLedger<'a> {
    ids: &'a TypeIds,
    ee: ExecEnv,
    owned: Vec<OwnedTypeId>,
}

impl<'a> InternLedger<'a> {
    fn new(ids: &'a TypeIds, ee: ExecEnv) -> InternLedger<'a> {
        InternLedger {
            ids,
            ee,
            owned: vec![],
        }
    }

    fn record(&mut self, id: OwnedTypeId) -> Result<(), Error> {
        if self.owned.try_reserve(1).is_err() {
            id.release(self.ids);
            return Err(Error::OutOfMemory);
        }
        self.owned.push(id);
        Ok(())
    }

    fn class(&mut self, name: &[u8]) -> Result<ClassTypeId, Error> {
        let id = self.ids.new_class_id(self.ee, name)?;
        self.record(OwnedTypeId::Class(id))?;
        Ok(id)
    }

    fn field(&mut self, name: &[u8], descriptor: &[u8]) -> Result<FieldTypeId, Error> {
        let id = self.ids.new_field_id(self.ee, name, descriptor)?;
        self.record(OwnedTypeId::Field(id))?;
        Ok(id)
    }

    fn method(&mut self, name: &[u8], descriptor: &[u8]) -> Result<MethodTypeId, Error> {
        let id = self.ids.new_method_id(self.ee, name, descriptor)?;
        self.record(OwnedTypeId::Method(id))?;
        Ok(id)
    }

    /// Hand the references over to their new owner
    fn commit(mut self) -> Vec<OwnedTypeId> {
        std::mem::take(&mut self.owned)
    }
}

impl<'a> Drop for InternLedger<'a> {
    fn drop(&mut self) {
        if !self.owned.is_empty() {
            log::debug!("Releasing {} type ids of an aborted load", self.owned.len());
        }
        for id in self.owned.drain(..).rev() {
            id.release(self.ids);
        }
    }
}

/// Sizing only counts, materializing also interns
enum Pass<'l, 'a> {
    Sizing,
    Materializing(&'l mut InternLedger<'a>),
}

/// Everything one pass produces
struct ParsedClass {
    name: ClassTypeId,
    super_class: Option<ClassTypeId>,
    access: ClassAccessFlags,
    version: Version,
    this_class: ConstantIndex,
    constants: ConstantPool,
    storage: ClassStorage,
    code: CodeStorage,
    clinit: CodeStorage,
    attributes: ClassAttributes,
}

impl ParsedClass {
    fn sizes(&self) -> StorageSizes {
        StorageSizes {
            constants: self.constants.len(),
            strings: self.constants.text_len(),
            interfaces: self.storage.interfaces.len(),
            fields: self.storage.fields.len(),
            methods: self.storage.methods.len(),
            inner_classes: self.storage.inner_classes.len(),
            code: self.code.sizes(),
            clinit: self.clinit.sizes(),
        }
    }
}

fn signature_error(err: typeid::Error, detail: &'static str) -> Error {
    match err {
        typeid::Error::MalformedSignature(_) => Error::MalformedInput(detail),
        other => other.into(),
    }
}

/// One walk over the classfile
struct ClassParser<'r, 'b, 'l, 'a> {
    loader: &'r ClassLoader,
    reader: &'r mut ClassReader<'b>,
    defining_loader: Option<LoaderId>,
    expected_name: Option<&'r [u8]>,
    pass: Pass<'l, 'a>,

    version: Version,
    constants: ConstantPool,
    storage: ClassStorage,
    code: CodeStorage,
    clinit: CodeStorage,
    in_clinit: bool,
}

impl<'r, 'b, 'l, 'a> ClassParser<'r, 'b, 'l, 'a> {
    fn intern_class(&mut self, name: &[u8]) -> Result<ClassTypeId, Error> {
        match &mut self.pass {
            Pass::Sizing => Ok(ClassTypeId::ERROR),
            Pass::Materializing(ledger) => ledger.class(name),
        }
    }

    fn arena(&mut self) -> &mut CodeStorage {
        if self.in_clinit {
            &mut self.clinit
        } else {
            &mut self.code
        }
    }

    fn utf8_index(&mut self) -> Result<ConstantIndex, Error> {
        let index = ConstantIndex(self.reader.u2()?);
        self.constants.utf8(index)?;
        Ok(index)
    }

    fn optional_class_index(&mut self) -> Result<Option<ConstantIndex>, Error> {
        let index = ConstantIndex(self.reader.u2()?);
        if index.0 == 0 {
            return Ok(None);
        }
        self.constants.class_name(index)?;
        Ok(Some(index))
    }

    fn parse(mut self) -> Result<ParsedClass, Error> {
        if self.reader.u4()? != CLASSFILE_MAGIC {
            return Err(Error::MalformedInput("Bad magic number"));
        }
        self.version.minor_version = self.reader.u2()?;
        self.version.major_version = self.reader.u2()?;
        self.constants.read(self.reader, &self.loader.config)?;

        let access = ClassAccessFlags::from_classfile(self.reader.u2()?);
        let (this_class, name) = self.read_this_class()?;
        let super_class = self.read_super_class()?;
        self.read_interfaces()?;
        self.read_fields()?;
        self.read_methods()?;
        let attributes = self.read_class_attributes()?;

        if !self.reader.is_at_end() {
            return Err(Error::MalformedInput("Junk at end of class file"));
        }
        Ok(ParsedClass {
            name,
            super_class,
            access,
            version: self.version,
            this_class,
            constants: self.constants,
            storage: self.storage,
            code: self.code,
            clinit: self.clinit,
            attributes,
        })
    }

    fn read_this_class(&mut self) -> Result<(ConstantIndex, ClassTypeId), Error> {
        let index = ConstantIndex(self.reader.u2()?);
        let name = self.constants.class_name(index)?;
        if let Some(expected) = self.expected_name {
            if name != expected {
                return Err(Error::MalformedInput("Wrong name"));
            }
        }
        if let Some(defining_loader) = self.defining_loader {
            if self.loader.config.check_class_names && !is_legal_class_name(name, false) {
                return Err(Error::MalformedInput("Bad name"));
            }
            // Fail early; registration checks again under the table lock
            if self.loader.table.contains(name, Some(defining_loader)) {
                return Err(Error::DuplicateDefinition(decode_modified_utf8(name)));
            }
        }
        let name = name.to_vec();
        Ok((index, self.intern_class(&name)?))
    }

    fn read_super_class(&mut self) -> Result<Option<ClassTypeId>, Error> {
        let index = ConstantIndex(self.reader.u2()?);
        if index.0 == 0 {
            return Ok(None);
        }
        let name = self.constants.class_name(index)?;
        if self.loader.config.check_class_names && !is_legal_class_name(name, false) {
            return Err(Error::MalformedInput("Bad superclass name"));
        }
        let name = name.to_vec();
        self.intern_class(&name).map(Some)
    }

    fn read_interfaces(&mut self) -> Result<(), Error> {
        let count = self.reader.u2()?;
        for _ in 0..count {
            let index = ConstantIndex(self.reader.u2()?);
            let name = self.constants.class_name(index)?.to_vec();
            let id = self.intern_class(&name)?;
            push(&mut self.storage.interfaces, id)?;
        }
        Ok(())
    }

    fn read_fields(&mut self) -> Result<(), Error> {
        let count = self.reader.u2()?;
        for _ in 0..count {
            let access = FieldAccessFlags::from_classfile(self.reader.u2()?);
            let name = self.utf8_index()?;
            let descriptor = self.utf8_index()?;
            let mut field = FieldBlock {
                id: self.field_id(name, descriptor)?,
                access,
                constant_value: None,
                deprecated: false,
                synthetic: false,
            };

            let attribute_count = self.reader.u2()?;
            for _ in 0..attribute_count {
                let attribute_name = self.constants.utf8(ConstantIndex(self.reader.u2()?))?;
                let length = self.reader.u4()?;
                match attribute_name {
                    b"ConstantValue" if access.contains(FieldAccessFlags::STATIC) => {
                        if length != 2 {
                            return Err(Error::MalformedInput("Wrong size for VALUE attribute"));
                        }
                        if field.constant_value.is_some() {
                            return Err(Error::MalformedInput("Duplicate ConstantValue attribute"));
                        }
                        field.constant_value = Some(ConstantIndex(self.reader.u2()?));
                    }
                    b"Deprecated" => {
                        if length > 0 {
                            return Err(Error::MalformedInput("Bad deprecated size"));
                        }
                        field.deprecated = true;
                    }
                    b"Synthetic" => {
                        if length > 0 {
                            return Err(Error::MalformedInput("Bad synthetic attribute size"));
                        }
                        field.synthetic = true;
                    }
                    _ => self.reader.skip(length as usize)?,
                }
            }
            push(&mut self.storage.fields, field)?;
        }
        Ok(())
    }

    fn field_id(
        &mut self,
        name: ConstantIndex,
        descriptor: ConstantIndex,
    ) -> Result<FieldTypeId, Error> {
        let name = self.constants.utf8(name)?;
        let descriptor = self.constants.utf8(descriptor)?;
        FieldDescriptor::parse(descriptor)
            .map_err(|err| signature_error(err, "Bad field signature"))?;
        match &mut self.pass {
            Pass::Sizing => Ok(FieldTypeId::new(NameTypeId::ERROR, ClassTypeId::ERROR)),
            Pass::Materializing(ledger) => ledger.field(name, descriptor),
        }
    }

    fn read_methods(&mut self) -> Result<(), Error> {
        let count = self.reader.u2()?;
        for _ in 0..count {
            let method = self.read_method();
            self.in_clinit = false;
            push(&mut self.storage.methods, method?)?;
        }
        Ok(())
    }

    fn read_method(&mut self) -> Result<MethodBlock, Error> {
        let access = MethodAccessFlags::from_classfile(self.reader.u2()?);
        let name_index = self.utf8_index()?;
        let descriptor_index = self.utf8_index()?;
        let name = self.constants.utf8(name_index)?;
        let descriptor = self.constants.utf8(descriptor_index)?;

        let is_clinit_name = name == b"<clinit>";
        self.in_clinit = is_clinit_name && descriptor == b"()V";

        let desc = MethodDescriptor::parse(descriptor)
            .map_err(|err| signature_error(err, "Bad method signature"))?;
        if !self.loader.config.allow_floating_point
            && desc.parameters.iter().any(FieldDescriptor::is_floating_point)
        {
            return Err(Error::MalformedInput(
                "floating-point arguments should not appear",
            ));
        }
        let receiver = if access.contains(MethodAccessFlags::STATIC) { 0 } else { 1 };
        let args_size = desc.parameter_length() + receiver;
        if args_size > MAX_ARGS_SIZE {
            return Err(Error::MalformedInput("Too many arguments"));
        }

        let id = match &mut self.pass {
            Pass::Sizing => MethodTypeId::new(NameTypeId::ERROR, MethodSigId::ERROR),
            Pass::Materializing(ledger) => ledger.method(name, descriptor)?,
        };
        let arena = if self.in_clinit { Arena::Clinit } else { Arena::Main };
        let exceptions_start = self.arena().checked_exceptions.len() as u32;
        let mut method = MethodBlock {
            id,
            access,
            args_size: args_size as u16,
            arena,
            code: None,
            exceptions: exceptions_start..exceptions_start,
            deprecated: false,
            synthetic: false,
        };

        let mut have_exceptions = false;
        let attribute_count = self.reader.u2()?;
        for _ in 0..attribute_count {
            let attribute_name = self.constants.utf8(ConstantIndex(self.reader.u2()?))?;
            match attribute_name {
                b"Code" => {
                    let bodyless =
                        access.intersects(MethodAccessFlags::NATIVE | MethodAccessFlags::ABSTRACT);
                    if bodyless && !is_clinit_name {
                        return Err(Error::MalformedInput(
                            "Abstract and native methods cannot have code",
                        ));
                    }
                    method.code = Some(self.read_code(method.args_size)?);
                }
                b"Exceptions" => {
                    if have_exceptions {
                        return Err(Error::MalformedInput("Multiple Exceptions attribute"));
                    }
                    have_exceptions = true;
                    method.exceptions = self.read_exceptions()?;
                }
                b"Deprecated" => {
                    if self.reader.u4()? > 0 {
                        return Err(Error::MalformedInput("Bad deprecated size"));
                    }
                    method.deprecated = true;
                }
                b"Synthetic" => {
                    if self.reader.u4()? > 0 {
                        return Err(Error::MalformedInput("Bad synthetic attribute size"));
                    }
                    method.synthetic = true;
                }
                _ => {
                    let length = self.reader.u4()?;
                    self.reader.skip(length as usize)?;
                }
            }
        }
        Ok(method)
    }

    fn read_code(&mut self, args_size: u16) -> Result<CodeRange, Error> {
        let length = self.reader.u4()?;
        let start = self.reader.position();

        let (max_stack, max_locals, code_length) = if self.version.has_short_code_header() {
            let max_stack = u16::from(self.reader.u1()?);
            let max_locals = u16::from(self.reader.u1()?);
            (max_stack, max_locals, u32::from(self.reader.u2()?))
        } else {
            (self.reader.u2()?, self.reader.u2()?, self.reader.u4()?)
        };
        if max_locals < args_size {
            return Err(Error::CapacityExceeded("Arguments can't fit into locals"));
        }
        if code_length > MAX_CODE_LENGTH {
            return Err(Error::MalformedInput("Byte code size exceeds 65535 bytes"));
        }

        let bytecode = self.reader.bytes(code_length as usize)?;
        let bytecode = extend(&mut self.arena().bytecode, bytecode)?;

        let handlers_start = self.arena().handlers.len() as u32;
        let handler_count = self.reader.u2()?;
        for _ in 0..handler_count {
            let handler = ExceptionHandler {
                start_pc: self.reader.u2()?,
                end_pc: self.reader.u2()?,
                handler_pc: self.reader.u2()?,
                catch_type: ConstantIndex(self.reader.u2()?),
            };
            push(&mut self.arena().handlers, handler)?;
        }
        let handlers = handlers_start..self.arena().handlers.len() as u32;

        let first_line = self.arena().line_numbers.len() as u32;
        let mut line_numbers = first_line..first_line;
        let first_variable = self.arena().local_variables.len() as u32;
        let mut local_variables = first_variable..first_variable;

        let attribute_count = self.reader.u2()?;
        for _ in 0..attribute_count {
            let attribute_name = self.constants.utf8(ConstantIndex(self.reader.u2()?))?;
            match attribute_name {
                b"LineNumberTable" => line_numbers = self.read_line_numbers()?,
                b"LocalVariableTable" => local_variables = self.read_local_variables()?,
                _ => {
                    let length = self.reader.u4()?;
                    self.reader.skip(length as usize)?;
                }
            }
        }
        self.reader
            .expect_consumed(start, length, "Code segment was wrong length")?;

        Ok(CodeRange {
            max_stack,
            max_locals,
            bytecode,
            handlers,
            line_numbers,
            local_variables,
        })
    }

    fn read_line_numbers(&mut self) -> Result<std::ops::Range<u32>, Error> {
        let length = self.reader.u4()?;
        let start = self.reader.position();
        let first = self.arena().line_numbers.len() as u32;
        let count = self.reader.u2()?;
        for _ in 0..count {
            let entry = LineNumber {
                start_pc: self.reader.u2()?,
                line_number: self.reader.u2()?,
            };
            push(&mut self.arena().line_numbers, entry)?;
        }
        self.reader
            .expect_consumed(start, length, "Line number table was wrong length?")?;
        Ok(first..self.arena().line_numbers.len() as u32)
    }

    fn read_local_variables(&mut self) -> Result<std::ops::Range<u32>, Error> {
        let length = self.reader.u4()?;
        let start = self.reader.position();
        let first = self.arena().local_variables.len() as u32;
        let count = self.reader.u2()?;
        for _ in 0..count {
            let entry = LocalVariable {
                start_pc: self.reader.u2()?,
                length: self.reader.u2()?,
                name: self.utf8_index()?,
                descriptor: self.utf8_index()?,
                index: self.reader.u2()?,
            };
            push(&mut self.arena().local_variables, entry)?;
        }
        self.reader
            .expect_consumed(start, length, "Local variables table was wrong length?")?;
        Ok(first..self.arena().local_variables.len() as u32)
    }

    fn read_exceptions(&mut self) -> Result<std::ops::Range<u32>, Error> {
        let length = self.reader.u4()?;
        let start = self.reader.position();
        let first = self.arena().checked_exceptions.len() as u32;
        let count = self.reader.u2()?;
        for _ in 0..count {
            let exception = ConstantIndex(self.reader.u2()?);
            push(&mut self.arena().checked_exceptions, exception)?;
        }
        self.reader
            .expect_consumed(start, length, "Exceptions attribute has wrong length")?;
        Ok(first..self.arena().checked_exceptions.len() as u32)
    }

    fn read_class_attributes(&mut self) -> Result<ClassAttributes, Error> {
        let mut attributes = ClassAttributes::default();
        let mut have_inner_classes = false;

        let attribute_count = self.reader.u2()?;
        for _ in 0..attribute_count {
            let attribute_name = self.constants.utf8(ConstantIndex(self.reader.u2()?))?;
            let length = self.reader.u4()?;
            match attribute_name {
                b"SourceFile" => {
                    if length != 2 {
                        return Err(Error::MalformedInput("Wrong size for VALUE attribute"));
                    }
                    attributes.source_file = Some(self.utf8_index()?);
                }
                b"AbsoluteSourcePath" if length == 2 => {
                    attributes.absolute_source_path = Some(self.utf8_index()?);
                }
                b"TimeStamp" if length == 8 => {
                    let high = u64::from(self.reader.u4()?);
                    let low = u64::from(self.reader.u4()?);
                    attributes.timestamp = Some(high << 32 | low);
                }
                b"Deprecated" => {
                    if length > 0 {
                        return Err(Error::MalformedInput("Bad deprecated size"));
                    }
                    attributes.deprecated = true;
                }
                b"Synthetic" => {
                    if length > 0 {
                        return Err(Error::MalformedInput("Bad synthetic attribute size"));
                    }
                    attributes.synthetic = true;
                }
                b"InnerClasses" => {
                    let count = self.reader.u2()?;
                    if u32::from(count) * 8 + 2 != length {
                        return Err(Error::MalformedInput("Bad length of InnerClasses attribute"));
                    }
                    if have_inner_classes {
                        return Err(Error::MalformedInput("Duplicate InnerClasses attribute"));
                    }
                    have_inner_classes = true;
                    for _ in 0..count {
                        let inner_class = self.optional_class_index()?;
                        let outer_class = self.optional_class_index()?;
                        let inner_name = ConstantIndex(self.reader.u2()?);
                        self.constants.optional_utf8(inner_name)?;
                        let access = InnerClassAccessFlags::from_bits_truncate(self.reader.u2()?);
                        let entry = InnerClass {
                            inner_class,
                            outer_class,
                            inner_name: Some(inner_name).filter(|index| index.0 != 0),
                            access,
                        };
                        push(&mut self.storage.inner_classes, entry)?;
                    }
                }
                _ => self.reader.skip(length as usize)?,
            }
        }
        Ok(attributes)
    }
}

/// Reads classfiles into registered classes
///
/// Each load walks the classfile twice: once to check it and measure the storage it needs, and
/// once to fill in exactly sized storage and intern its type ids. Nothing is visible to anyone
/// else until the class is registered, and a failed load releases whatever it interned.
pub struct ClassLoader {
    ids: Arc<TypeIds>,
    table: Arc<ClassTable>,
    config: LoaderConfig,
}

impl ClassLoader {
    pub fn new(ids: Arc<TypeIds>, table: Arc<ClassTable>, config: LoaderConfig) -> ClassLoader {
        ClassLoader { ids, table, config }
    }

    pub fn type_ids(&self) -> &Arc<TypeIds> {
        &self.ids
    }

    pub fn class_table(&self) -> &Arc<ClassTable> {
        &self.table
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn parser<'r, 'b, 'l, 'a>(
        &'r self,
        reader: &'r mut ClassReader<'b>,
        defining_loader: Option<LoaderId>,
        expected_name: Option<&'r [u8]>,
        pass: Pass<'l, 'a>,
        sizes: &StorageSizes,
    ) -> Result<ClassParser<'r, 'b, 'l, 'a>, Error> {
        Ok(ClassParser {
            loader: self,
            reader,
            defining_loader,
            expected_name,
            pass,
            version: Version {
                major_version: 0,
                minor_version: 0,
            },
            constants: ConstantPool::with_sizes(sizes.constants, sizes.strings)?,
            storage: ClassStorage::with_sizes(sizes)?,
            code: CodeStorage::with_sizes(&sizes.code)?,
            clinit: CodeStorage::with_sizes(&sizes.clinit)?,
            in_clinit: false,
        })
    }

    /// Load and register a class
    ///
    /// `expected_name` is the name the caller was looking for, if any. On failure, nothing is
    /// registered and every type id interned along the way is released.
    pub fn load(
        &self,
        ee: ExecEnv,
        bytes: &[u8],
        defining_loader: Option<LoaderId>,
        expected_name: Option<&[u8]>,
    ) -> Result<Arc<ClassBlock>, Error> {
        let result = self.load_inner(ee, bytes, defining_loader, expected_name);
        if let Err(err) = &result {
            log::warn!("Class loading error: {}", err);
        }
        result
    }

    fn load_inner(
        &self,
        ee: ExecEnv,
        bytes: &[u8],
        defining_loader: Option<LoaderId>,
        expected_name: Option<&[u8]>,
    ) -> Result<Arc<ClassBlock>, Error> {
        let mut reader = ClassReader::new(bytes);

        let sizes = self
            .parser(
                &mut reader,
                defining_loader,
                expected_name,
                Pass::Sizing,
                &StorageSizes::default(),
            )?
            .parse()?
            .sizes();
        log::debug!(
            "Sized class: {} bytes, plus {} bytes for <clinit>",
            sizes.main_bytes(),
            sizes.clinit_bytes()
        );

        reader.rewind();
        let mut ledger = InternLedger::new(&self.ids, ee);
        let parsed = self
            .parser(
                &mut reader,
                defining_loader,
                expected_name,
                Pass::Materializing(&mut ledger),
                &sizes,
            )?
            .parse()?;
        debug_assert_eq!(parsed.sizes(), sizes);

        let name = parsed.constants.class_name(parsed.this_class)?;
        let mut name_copy = Vec::new();
        name_copy
            .try_reserve_exact(name.len())
            .map_err(|_| Error::OutOfMemory)?;
        name_copy.extend_from_slice(name);

        let clinit = if parsed.clinit.is_empty() {
            None
        } else {
            Some(Arc::new(parsed.clinit))
        };
        let class = Arc::new(ClassBlock {
            name: name_copy.into_boxed_slice(),
            id: parsed.name,
            super_class: parsed.super_class,
            loader: defining_loader,
            access: parsed.access,
            version: parsed.version,
            kind: ClassKind::Loaded,
            constants: parsed.constants,
            storage: parsed.storage,
            attributes: parsed.attributes,
            code: Arc::new(parsed.code),
            clinit_code: Mutex::new(clinit),
            type_ids: Mutex::new(ledger.commit()),
        });

        if let Err(err) = self.table.add(class.clone()) {
            class.release_type_ids(&self.ids);
            return Err(err);
        }
        Ok(class)
    }

    /// Unregister a class and give back its type ids
    pub fn unload(&self, class: &Arc<ClassBlock>) -> bool {
        let removed = self.table.remove(class);
        if removed {
            class.release_type_ids(&self.ids);
        }
        removed
    }
}
