use super::class_table::ClassTable;
use super::form::{pack_syllables, unpack_syllables};
use super::method_sig::MethodSigTable;
use super::name_and_type::{NameAndType, NameAndTypeTable};
use super::name_table::NameTable;
use super::token::{pack_member, unpack_member};
use super::{
    parse_class_name, ClassTypeId, ElementType, Error, FieldDescriptor, FieldTypeId, MemberToken,
    MemberType, MemberTypeId, MethodDescriptor, MethodSigId, MethodTypeId, NameTypeId,
    ParseDescriptor, Syllable, MAX_ARRAY_DEPTH, MAX_CLASS_INDEX, MAX_INDEX,
};
use crate::util::decode_modified_utf8;
use parking_lot::Mutex;

/// Sizing of the tables
#[derive(Clone, Debug)]
pub struct TypeIdConfig {
    /// Number of entries in each segment appended to a table
    pub segment_capacity: u32,

    /// Largest class table index (capped at `0xfffffe`, since class tokens have 24 bits)
    pub max_class_index: u32,

    /// Largest index in the other tables
    pub max_index: u32,
}

impl Default for TypeIdConfig {
    fn default() -> TypeIdConfig {
        TypeIdConfig {
            segment_capacity: 256,
            max_class_index: MAX_CLASS_INDEX,
            max_index: MAX_INDEX,
        }
    }
}

/// Handle of the execution environment on whose behalf an operation runs
///
/// It is only used to attribute allocation failures.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ExecEnv(pub u32);

/// Number of live entries in each table
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct TypeIdStats {
    pub classes: usize,
    pub packages: usize,
    pub names: usize,
    pub method_sigs: usize,
    pub forms: usize,
    pub members: usize,
}

fn report<T>(ee: ExecEnv, result: Result<T, Error>) -> Result<T, Error> {
    if let Err(Error::OutOfMemory) = &result {
        log::error!("Execution environment {} ran out of memory for type ids", ee.0);
    }
    result
}

/// Java name and descriptor character of a primitive type
fn primitive_names(id: ClassTypeId) -> Option<(&'static str, u8)> {
    let names = match id {
        ClassTypeId::VOID => ("void", b'V'),
        ClassTypeId::INT => ("int", b'I'),
        ClassTypeId::SHORT => ("short", b'S'),
        ClassTypeId::CHAR => ("char", b'C'),
        ClassTypeId::LONG => ("long", b'J'),
        ClassTypeId::BYTE => ("byte", b'B'),
        ClassTypeId::FLOAT => ("float", b'F'),
        ClassTypeId::DOUBLE => ("double", b'D'),
        ClassTypeId::BOOLEAN => ("boolean", b'Z'),
        _ => return None,
    };
    Some(names)
}

/// Interned type identifiers
///
/// Every table sits behind its own lock. Operations that touch several tables take the locks one
/// at a time (names, then classes, then signatures, then members) and never hold two at once.
///
/// Ids handed out by `new_*` and `clone_*` methods are owned references which must eventually be
/// given back to the matching `dispose_*` method. Ids returned by `lookup_*` methods and by
/// accessors (such as `method_return_type`) are borrowed: they stay valid only as long as some
/// owned reference does.
pub struct TypeIds {
    names: Mutex<NameTable>,
    classes: Mutex<ClassTable>,
    sigs: Mutex<MethodSigTable>,
    members: Mutex<NameAndTypeTable>,

    init_name: NameTypeId,
    clinit: MethodTypeId,
    finalize: MethodTypeId,
}

impl TypeIds {
    /// Empty tables, apart from the permanent well-known names
    pub fn new(config: TypeIdConfig) -> Result<TypeIds, Error> {
        let ee = ExecEnv::default();
        let mut ids = TypeIds {
            names: Mutex::new(NameTable::new(&config)),
            classes: Mutex::new(ClassTable::new(&config)?),
            sigs: Mutex::new(MethodSigTable::new(&config)),
            members: Mutex::new(NameAndTypeTable::new(&config)),
            init_name: NameTypeId::ERROR,
            clinit: MemberTypeId::new(NameTypeId::ERROR, MethodSigId::ERROR),
            finalize: MemberTypeId::new(NameTypeId::ERROR, MethodSigId::ERROR),
        };
        ids.init_name = ids.new_member_name(ee, b"<init>")?;
        ids.pin_member_name(ids.init_name);
        ids.clinit = ids.new_method_id(ee, b"<clinit>", b"()V")?;
        ids.pin_method_id(ids.clinit);
        ids.finalize = ids.new_method_id(ee, b"finalize", b"()V")?;
        ids.pin_method_id(ids.finalize);
        Ok(ids)
    }

    // Class and array types

    /// Intern a class name
    ///
    /// Array classes are named by their descriptor (`[I`, `[[Ljava/lang/String;`), others by
    /// their binary name (`java/lang/String`).
    pub fn new_class_id(&self, ee: ExecEnv, name: &[u8]) -> Result<ClassTypeId, Error> {
        let desc = parse_class_name(name)?;
        self.intern_field_descriptor(ee, &desc)
    }

    pub fn lookup_class_id(&self, name: &[u8]) -> Option<ClassTypeId> {
        let desc = parse_class_name(name).ok()?;
        self.lookup_field_descriptor(&desc)
    }

    /// Intern a field descriptor (`I`, `Ljava/lang/String;`, `[J`)
    pub fn new_field_type(&self, ee: ExecEnv, descriptor: &[u8]) -> Result<ClassTypeId, Error> {
        let desc = FieldDescriptor::parse(descriptor)?;
        self.intern_field_descriptor(ee, &desc)
    }

    pub fn lookup_field_type(&self, descriptor: &[u8]) -> Option<ClassTypeId> {
        let desc = FieldDescriptor::parse(descriptor).ok()?;
        self.lookup_field_descriptor(&desc)
    }

    fn intern_field_descriptor(
        &self,
        ee: ExecEnv,
        desc: &FieldDescriptor<'_>,
    ) -> Result<ClassTypeId, Error> {
        let base = match desc.element {
            ElementType::Base(base) => base.class_id().token(),
            ElementType::Object(name) => report(ee, self.classes.lock().intern(name))?.0,
        };
        Ok(ClassTypeId::from_parts(desc.dimensions, base))
    }

    fn lookup_field_descriptor(&self, desc: &FieldDescriptor<'_>) -> Option<ClassTypeId> {
        let base = match desc.element {
            ElementType::Base(base) => base.class_id().token(),
            ElementType::Object(name) => self.classes.lock().lookup(name)?,
        };
        Some(ClassTypeId::from_parts(desc.dimensions, base))
    }

    pub fn clone_class_id(&self, id: ClassTypeId) {
        if let Some(index) = id.class_index() {
            self.classes.lock().clone_class(index);
        }
    }

    pub fn dispose_class_id(&self, id: ClassTypeId) {
        if let Some(index) = id.class_index() {
            self.classes.lock().dispose(index);
        }
    }

    /// Make a class type permanent (for arrays, this pins the element class)
    pub fn pin_class_id(&self, id: ClassTypeId) {
        if let Some(index) = id.class_index() {
            self.classes.lock().pin(index);
        }
    }

    /// Reference count of the class entry backing a type (`None` for primitive types)
    pub fn class_ref_count(&self, id: ClassTypeId) -> Option<u8> {
        let index = id.class_index()?;
        Some(self.classes.lock().ref_count(index))
    }

    /// Owned id of the array type `delta` dimensions deeper (or shallower) than `id`
    ///
    /// The resulting depth must lie within `0..=255`, and `void` has no array types.
    pub fn increment_array_depth(&self, id: ClassTypeId, delta: i32) -> Result<ClassTypeId, Error> {
        assert!(!id.is_error(), "cannot take the array type of the error id");
        let depth = i64::from(id.array_depth()) + i64::from(delta);
        if depth < 0 || depth > i64::from(MAX_ARRAY_DEPTH) {
            return Err(Error::CapacityExceeded("array depth must be between 0 and 255"));
        }
        if id.base_type() == ClassTypeId::VOID && depth > 0 {
            return Err(Error::MalformedSignature("array of void".to_string()));
        }
        self.clone_class_id(id);
        Ok(ClassTypeId::from_parts(depth as u32, id.base_type().token()))
    }

    // Member names

    pub fn new_member_name(&self, ee: ExecEnv, name: &[u8]) -> Result<NameTypeId, Error> {
        report(ee, self.names.lock().intern(name))
    }

    pub fn lookup_member_name(&self, name: &[u8]) -> Option<NameTypeId> {
        self.names.lock().lookup(name)
    }

    pub fn clone_member_name(&self, name: NameTypeId) {
        self.names.lock().clone_name(name);
    }

    pub fn dispose_member_name(&self, name: NameTypeId) {
        self.names.lock().dispose(name);
    }

    pub fn pin_member_name(&self, name: NameTypeId) {
        self.names.lock().pin(name);
    }

    pub fn member_name_ref_count(&self, name: NameTypeId) -> u8 {
        self.names.lock().ref_count(name)
    }

    // Method signatures

    /// Intern a method descriptor (eg. `(I[Ljava/lang/String;)V`)
    ///
    /// The classes mentioned by the signature are interned too, and stay alive for as long as
    /// the signature does.
    pub fn new_method_sig(&self, ee: ExecEnv, descriptor: &[u8]) -> Result<MethodSigId, Error> {
        let desc = MethodDescriptor::parse(descriptor)?;
        let syllables: Vec<Syllable> = desc.syllables().collect();
        let words = report(ee, pack_syllables(&syllables))?;

        let mut details: Vec<ClassTypeId> = vec![];
        for detail in desc.details() {
            match self.intern_field_descriptor(ee, detail) {
                Ok(id) => details.push(id),
                Err(err) => {
                    self.dispose_class_ids(&details);
                    return Err(err);
                }
            }
        }

        let tokens: Vec<u32> = details.iter().map(|id| id.token()).collect();
        let interned = self
            .sigs
            .lock()
            .intern(&words, desc.parameters.len() as u32, &tokens);
        match report(ee, interned) {
            Ok((id, true)) => Ok(id),
            Ok((id, false)) => {
                self.dispose_class_ids(&details);
                Ok(id)
            }
            Err(err) => {
                self.dispose_class_ids(&details);
                Err(err)
            }
        }
    }

    pub fn lookup_method_sig(&self, descriptor: &[u8]) -> Option<MethodSigId> {
        let desc = MethodDescriptor::parse(descriptor).ok()?;
        let syllables: Vec<Syllable> = desc.syllables().collect();
        let words = pack_syllables(&syllables).ok()?;
        let tokens = desc
            .details()
            .map(|detail| self.lookup_field_descriptor(detail).map(|id| id.token()))
            .collect::<Option<Vec<u32>>>()?;
        self.sigs.lock().lookup(&words, &tokens)
    }

    pub fn clone_method_sig(&self, sig: MethodSigId) {
        self.sigs.lock().clone_sig(sig);
    }

    pub fn dispose_method_sig(&self, sig: MethodSigId) {
        let freed = self.sigs.lock().dispose(sig);
        if let Some(details) = freed {
            for &token in details.iter() {
                self.dispose_class_id(ClassTypeId::from_token(token));
            }
        }
    }

    /// Make a signature permanent, along with its form and the classes it mentions
    pub fn pin_method_sig(&self, sig: MethodSigId) {
        let details = {
            let mut sigs = self.sigs.lock();
            sigs.pin(sig);
            sigs.details(sig).map(<[u32]>::to_vec).unwrap_or_default()
        };
        for token in details {
            self.pin_class_id(ClassTypeId::from_token(token));
        }
    }

    pub fn method_sig_ref_count(&self, sig: MethodSigId) -> u8 {
        self.sigs.lock().ref_count(sig)
    }

    fn dispose_class_ids(&self, ids: &[ClassTypeId]) {
        for &id in ids {
            self.dispose_class_id(id);
        }
    }

    // Fields and methods

    pub fn new_field_id(
        &self,
        ee: ExecEnv,
        name: &[u8],
        descriptor: &[u8],
    ) -> Result<FieldTypeId, Error> {
        let name = self.new_member_name(ee, name)?;
        match self.new_field_type(ee, descriptor) {
            Ok(ty) => Ok(MemberTypeId::new(name, ty)),
            Err(err) => {
                self.dispose_member_name(name);
                Err(err)
            }
        }
    }

    pub fn new_method_id(
        &self,
        ee: ExecEnv,
        name: &[u8],
        descriptor: &[u8],
    ) -> Result<MethodTypeId, Error> {
        let name = self.new_member_name(ee, name)?;
        match self.new_method_sig(ee, descriptor) {
            Ok(sig) => Ok(MemberTypeId::new(name, sig)),
            Err(err) => {
                self.dispose_member_name(name);
                Err(err)
            }
        }
    }

    /// Owned field id made of two existing ids (each gets an extra reference)
    pub fn new_field_id_from_name_and_type(&self, name: NameTypeId, ty: ClassTypeId) -> FieldTypeId {
        self.clone_member_name(name);
        self.clone_class_id(ty);
        MemberTypeId::new(name, ty)
    }

    /// Owned method id made of two existing ids (each gets an extra reference)
    pub fn new_method_id_from_name_and_sig(&self, name: NameTypeId, sig: MethodSigId) -> MethodTypeId {
        self.clone_member_name(name);
        self.clone_method_sig(sig);
        MemberTypeId::new(name, sig)
    }

    pub fn lookup_field_id(&self, name: &[u8], descriptor: &[u8]) -> Option<FieldTypeId> {
        let name = self.lookup_member_name(name)?;
        let ty = self.lookup_field_type(descriptor)?;
        Some(MemberTypeId::new(name, ty))
    }

    pub fn lookup_method_id(&self, name: &[u8], descriptor: &[u8]) -> Option<MethodTypeId> {
        let name = self.lookup_member_name(name)?;
        let sig = self.lookup_method_sig(descriptor)?;
        Some(MemberTypeId::new(name, sig))
    }

    pub fn clone_field_id(&self, field: FieldTypeId) {
        self.clone_member_name(field.name());
        self.clone_class_id(field.ty());
    }

    pub fn clone_method_id(&self, method: MethodTypeId) {
        self.clone_member_name(method.name());
        self.clone_method_sig(method.ty());
    }

    pub fn dispose_field_id(&self, field: FieldTypeId) {
        self.dispose_member_name(field.name());
        self.dispose_class_id(field.ty());
    }

    pub fn dispose_method_id(&self, method: MethodTypeId) {
        self.dispose_member_name(method.name());
        self.dispose_method_sig(method.ty());
    }

    pub fn pin_field_id(&self, field: FieldTypeId) {
        self.pin_member_name(field.name());
        self.pin_class_id(field.ty());
    }

    pub fn pin_method_id(&self, method: MethodTypeId) {
        self.pin_member_name(method.name());
        self.pin_method_sig(method.ty());
    }

    // Member tokens

    /// Single word token for a member, for hashing or switching
    ///
    /// The token does not keep the member alive. If it is table-backed, it holds a reference to
    /// its name-and-type entry, to be released with `dispose_member_token`.
    pub fn new_member_token<T: MemberType>(
        &self,
        ee: ExecEnv,
        member: MemberTypeId<T>,
    ) -> Result<MemberToken<T>, Error> {
        let (name, ty) = (member.name().token(), member.ty().token());
        if let Some(bits) = pack_member(name, ty) {
            return Ok(MemberToken::from_bits(bits));
        }
        let key = NameAndType {
            name,
            ty,
            is_method: T::IS_METHOD,
        };
        let index = report(ee, self.members.lock().intern(key))?;
        Ok(MemberToken::from_table_index(index))
    }

    pub fn lookup_member_token<T: MemberType>(
        &self,
        member: MemberTypeId<T>,
    ) -> Option<MemberToken<T>> {
        let (name, ty) = (member.name().token(), member.ty().token());
        if let Some(bits) = pack_member(name, ty) {
            return Some(MemberToken::from_bits(bits));
        }
        let key = NameAndType {
            name,
            ty,
            is_method: T::IS_METHOD,
        };
        let index = self.members.lock().lookup(key)?;
        Some(MemberToken::from_table_index(index))
    }

    pub fn dispose_member_token<T: MemberType>(&self, token: MemberToken<T>) {
        if let Some(index) = token.table_index() {
            self.members.lock().dispose(index);
        }
    }

    pub fn pin_member_token<T: MemberType>(&self, token: MemberToken<T>) {
        if let Some(index) = token.table_index() {
            self.members.lock().pin(index);
        }
    }

    /// Member named by a token (borrowed, like the token itself)
    pub fn resolve_member_token<T: MemberType>(
        &self,
        token: MemberToken<T>,
    ) -> Option<MemberTypeId<T>> {
        let (name, ty) = match token.table_index() {
            None => unpack_member(token.token()),
            Some(index) => {
                let entry = self.members.lock().get(index)?;
                debug_assert_eq!(entry.is_method, T::IS_METHOD);
                (entry.name, entry.ty)
            }
        };
        Some(MemberTypeId::new(NameTypeId::from_token(name), T::from_raw(ty)))
    }

    // Signature queries

    /// Return type then parameter types of a method signature
    ///
    /// The ids are borrowed from the signature.
    pub fn method_signature(&self, sig: MethodSigId) -> Option<(ClassTypeId, Vec<ClassTypeId>)> {
        let sigs = self.sigs.lock();
        let words = sigs.words(sig)?;
        let mut details = sigs.details(sig)?.iter();
        let mut types = unpack_syllables(words).map(|syllable| match syllable {
            Syllable::Object => details
                .next()
                .map_or(ClassTypeId::ERROR, |&token| ClassTypeId::from_token(token)),
            primitive => ClassTypeId::from_token(primitive.code() as u32),
        });
        let ret = types.next()?;
        Some((ret, types.collect()))
    }

    /// Return type of a method (borrowed from the signature)
    pub fn method_return_type(&self, sig: MethodSigId) -> Option<ClassTypeId> {
        let sigs = self.sigs.lock();
        let ret = unpack_syllables(sigs.words(sig)?).next()?;
        if ret == Syllable::Object {
            sigs.details(sig)?
                .first()
                .map(|&token| ClassTypeId::from_token(token))
        } else {
            Some(ClassTypeId::from_token(ret.code() as u32))
        }
    }

    /// Whether a method returns a reference
    pub fn method_is_ref(&self, sig: MethodSigId) -> bool {
        let sigs = self.sigs.lock();
        sigs.words(sig)
            .and_then(|words| unpack_syllables(words).next())
            .map_or(false, Syllable::is_reference)
    }

    /// Number of local variable slots taken by the parameters (excluding any receiver)
    pub fn method_args_size(&self, sig: MethodSigId) -> u32 {
        let sigs = self.sigs.lock();
        sigs.words(sig).map_or(0, |words| {
            unpack_syllables(words).skip(1).map(Syllable::width).sum()
        })
    }

    pub fn method_args_count(&self, sig: MethodSigId) -> u32 {
        self.sigs.lock().parameter_count(sig).unwrap_or(0)
    }

    /// Shape of the return type, followed by the shape of each parameter
    pub fn terse_signature(&self, sig: MethodSigId) -> Vec<Syllable> {
        let sigs = self.sigs.lock();
        sigs.words(sig)
            .map(|words| unpack_syllables(words).collect())
            .unwrap_or_default()
    }

    // Predicates

    /// Whether two class types are in the same package
    ///
    /// Arrays are in the package of their element type, and primitive types are in the null
    /// package.
    pub fn is_same_class_package(&self, a: ClassTypeId, b: ClassTypeId) -> bool {
        let classes = self.classes.lock();
        let package = |id: ClassTypeId| match id.class_index() {
            None => Some(super::package::NULL_PACKAGE),
            Some(index) => classes.package_of(index),
        };
        match (package(a), package(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn field_is_ref(&self, field: FieldTypeId) -> bool {
        field.ty().is_reference()
    }

    pub fn field_is_doubleword(&self, field: FieldTypeId) -> bool {
        field.ty().is_double_word()
    }

    /// Whether the method is named `<init>`
    pub fn is_constructor(&self, method: MethodTypeId) -> bool {
        method.name() == self.init_name
    }

    /// Whether the method is `<clinit>()V`
    pub fn is_clinit(&self, method: MethodTypeId) -> bool {
        method == self.clinit
    }

    /// Whether the method is named `<clinit>`, whatever its signature
    pub fn has_clinit_name(&self, method: MethodTypeId) -> bool {
        method.is_same_member_name(&self.clinit)
    }

    /// Whether the method is `finalize()V`
    pub fn is_finalizer(&self, method: MethodTypeId) -> bool {
        method == self.finalize
    }

    pub fn init_name(&self) -> NameTypeId {
        self.init_name
    }

    pub fn clinit_method(&self) -> MethodTypeId {
        self.clinit
    }

    pub fn finalize_method(&self) -> MethodTypeId {
        self.finalize
    }

    // Names

    /// Name of a class: binary name for classes, descriptor for arrays, keyword for primitives
    pub fn class_name(&self, id: ClassTypeId) -> Option<Vec<u8>> {
        if id.is_error() {
            return None;
        }
        let mut out = vec![];
        if id.is_array() {
            self.write_field_type(id, &mut out)?;
        } else if let Some((keyword, _)) = primitive_names(id) {
            out.extend_from_slice(keyword.as_bytes());
        } else {
            let index = id.class_index()?;
            if !self.classes.lock().write_name(index, &mut out) {
                return None;
            }
        }
        Some(out)
    }

    pub fn class_name_to_string(&self, id: ClassTypeId) -> String {
        match self.class_name(id) {
            Some(name) => decode_modified_utf8(&name),
            None => "<error>".to_string(),
        }
    }

    /// Field descriptor of a type (eg. `I`, `Ljava/lang/String;`, `[[D`)
    pub fn field_type_to_string(&self, id: ClassTypeId) -> String {
        let mut out = vec![];
        match self.write_field_type(id, &mut out) {
            Some(()) => decode_modified_utf8(&out),
            None => "<error>".to_string(),
        }
    }

    fn write_field_type(&self, id: ClassTypeId, out: &mut Vec<u8>) -> Option<()> {
        if id.is_error() {
            return None;
        }
        out.extend(std::iter::repeat(b'[').take(id.array_depth() as usize));
        let base = id.base_type();
        if let Some((_, descriptor)) = primitive_names(base) {
            out.push(descriptor);
        } else {
            out.push(b'L');
            let index = base.class_index()?;
            if !self.classes.lock().write_name(index, out) {
                return None;
            }
            out.push(b';');
        }
        Some(())
    }

    pub fn member_name(&self, name: NameTypeId) -> Option<Vec<u8>> {
        self.names.lock().name(name).map(<[u8]>::to_vec)
    }

    pub fn member_name_to_string(&self, name: NameTypeId) -> String {
        match self.names.lock().name(name) {
            Some(name) => decode_modified_utf8(name),
            None => "<error>".to_string(),
        }
    }

    /// Method descriptor of a signature (eg. `(I[Ljava/lang/String;)V`)
    pub fn method_sig_to_string(&self, sig: MethodSigId) -> String {
        let (ret, params) = match self.method_signature(sig) {
            Some(types) => types,
            None => return "<error>".to_string(),
        };
        let mut out = vec![b'('];
        for param in params {
            self.write_field_type(param, &mut out);
        }
        out.push(b')');
        self.write_field_type(ret, &mut out);
        decode_modified_utf8(&out)
    }

    // Diagnostics

    pub fn stats(&self) -> TypeIdStats {
        let (classes, packages) = {
            let classes = self.classes.lock();
            (classes.live_count(), classes.package_count())
        };
        let (method_sigs, forms) = {
            let sigs = self.sigs.lock();
            (sigs.live_count(), sigs.form_count())
        };
        TypeIdStats {
            classes,
            packages,
            names: self.names.lock().live_count(),
            method_sigs,
            forms,
            members: self.members.lock().live_count(),
        }
    }

    /// Check that every hash chain terminates, only links live entries in the right bucket, and
    /// that every live entry is on exactly one chain
    pub fn check_tables(&self) -> Result<(), String> {
        self.names.lock().check()?;
        self.classes.lock().check()?;
        self.sigs.lock().check()?;
        self.members.lock().check()
    }

    /// Forget which entries were added or deleted (ROM entries stay marked as such)
    pub fn reset_states(&self) {
        self.names.lock().reset_states();
        self.classes.lock().reset_states();
        self.sigs.lock().reset_states();
        self.members.lock().reset_states();
    }

    /// Entries added and deleted since the last `reset_states`
    pub fn diffs(&self) -> Vec<String> {
        let mut lines = vec![];
        let (added, deleted) = self.names.lock().diffs();
        lines.extend(added.into_iter().map(|name| format!("+ name {}", name)));
        if deleted > 0 {
            lines.push(format!("- {} names", deleted));
        }
        let (added, deleted) = self.classes.lock().diffs();
        lines.extend(added.into_iter().map(|name| format!("+ class {}", name)));
        if deleted > 0 {
            lines.push(format!("- {} classes", deleted));
        }
        let (added, deleted) = {
            let sigs = self.sigs.lock();
            (sigs.added(), sigs.deleted_count())
        };
        for sig in added {
            lines.push(format!("+ signature {}", self.method_sig_to_string(sig)));
        }
        if deleted > 0 {
            lines.push(format!("- {} signatures", deleted));
        }
        let (added, deleted) = self.members.lock().diffs();
        for member in added {
            let name = self.member_name_to_string(NameTypeId::from_token(member.name));
            let ty = if member.is_method {
                self.method_sig_to_string(MethodSigId::from_token(member.ty))
            } else {
                self.field_type_to_string(ClassTypeId::from_token(member.ty))
            };
            lines.push(format!("+ member {} {}", name, ty));
        }
        if deleted > 0 {
            lines.push(format!("- {} members", deleted));
        }
        lines
    }

    /// Mark every existing entry as ROM resident
    pub(crate) fn freeze(&self) {
        self.names.lock().freeze();
        self.classes.lock().freeze();
        self.sigs.lock().freeze();
        self.members.lock().freeze();
    }
}
