use super::{Error, ExecEnv, TypeIdConfig, TypeIds};
use crate::util::encode_modified_utf8;

/// Contents of a preloaded set of tables
///
/// Everything in the image is interned when the tables are opened, pinned, and then frozen, so
/// that it is permanent and later entries go into fresh writable segments. Names are given as
/// Rust strings and stored in modified UTF-8.
#[derive(Clone, Debug, Default)]
pub struct RomImage {
    classes: Vec<Vec<u8>>,
    member_names: Vec<Vec<u8>>,
    method_sigs: Vec<Vec<u8>>,
    fields: Vec<(Vec<u8>, Vec<u8>)>,
    methods: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RomImage {
    pub fn new() -> RomImage {
        RomImage::default()
    }

    /// Class or array name (eg. `java/lang/Object`, `[I`)
    pub fn class(mut self, name: &str) -> RomImage {
        self.classes.push(encode_modified_utf8(name));
        self
    }

    pub fn member_name(mut self, name: &str) -> RomImage {
        self.member_names.push(encode_modified_utf8(name));
        self
    }

    /// Method descriptor (eg. `(Ljava/lang/String;)V`)
    pub fn method_sig(mut self, descriptor: &str) -> RomImage {
        self.method_sigs.push(encode_modified_utf8(descriptor));
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> RomImage {
        self.fields
            .push((encode_modified_utf8(name), encode_modified_utf8(descriptor)));
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str) -> RomImage {
        self.methods
            .push((encode_modified_utf8(name), encode_modified_utf8(descriptor)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.member_names.is_empty()
            && self.method_sigs.is_empty()
            && self.fields.is_empty()
            && self.methods.is_empty()
    }
}

impl TypeIds {
    /// Open tables preloaded with a ROM image
    ///
    /// Every entry in the image (and the well-known names) ends up pinned in a read-only segment.
    pub fn with_rom(config: TypeIdConfig, rom: &RomImage) -> Result<TypeIds, Error> {
        let ids = TypeIds::new(config)?;
        let ee = ExecEnv::default();

        for name in &rom.classes {
            let id = ids.new_class_id(ee, name)?;
            ids.pin_class_id(id);
        }
        for name in &rom.member_names {
            let id = ids.new_member_name(ee, name)?;
            ids.pin_member_name(id);
        }
        for descriptor in &rom.method_sigs {
            let id = ids.new_method_sig(ee, descriptor)?;
            ids.pin_method_sig(id);
        }
        for (name, descriptor) in &rom.fields {
            let field = ids.new_field_id(ee, name, descriptor)?;
            ids.pin_field_id(field);
            let token = ids.new_member_token(ee, field)?;
            ids.pin_member_token(token);
        }
        for (name, descriptor) in &rom.methods {
            let method = ids.new_method_id(ee, name, descriptor)?;
            ids.pin_method_id(method);
            let token = ids.new_member_token(ee, method)?;
            ids.pin_member_token(token);
        }

        ids.freeze();
        log::debug!("Opened ROM tables: {:?}", ids.stats());
        Ok(ids)
    }
}
