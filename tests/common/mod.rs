//! Hand assembly of classfiles for the loader tests

#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_ABSTRACT: u16 = 0x0400;

/// Attribute whose name is already in the constant pool
pub struct Attribute {
    name: u16,
    body: Vec<u8>,
}

impl Attribute {
    fn write(&self, out: &mut Vec<u8>) {
        out.write_u16::<BigEndian>(self.name).unwrap();
        out.write_u32::<BigEndian>(self.body.len() as u32).unwrap();
        out.extend_from_slice(&self.body);
    }
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[Attribute]) {
    out.write_u16::<BigEndian>(attributes.len() as u16).unwrap();
    for attribute in attributes {
        attribute.write(out);
    }
}

/// Field or method
struct Member {
    access: u16,
    name: u16,
    descriptor: u16,
    attributes: Vec<Attribute>,
}

pub struct ClassBuilder {
    major_version: u16,
    minor_version: u16,
    constants: Vec<u8>,
    next_index: u16,
    utf8s: HashMap<Vec<u8>, u16>,
    classes: HashMap<Vec<u8>, u16>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    attributes: Vec<Attribute>,
}

impl ClassBuilder {
    /// Public class extending `super_class` (if any), in version 52.0
    pub fn new(name: &str, super_class: Option<&str>) -> ClassBuilder {
        let mut builder = ClassBuilder {
            major_version: 52,
            minor_version: 0,
            constants: vec![],
            next_index: 1,
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            access: ACC_PUBLIC | ACC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        };
        builder.this_class = builder.class(name);
        if let Some(super_class) = super_class {
            builder.super_class = builder.class(super_class);
        }
        builder
    }

    pub fn version(mut self, major_version: u16, minor_version: u16) -> ClassBuilder {
        self.major_version = major_version;
        self.minor_version = minor_version;
        self
    }

    pub fn access(mut self, access: u16) -> ClassBuilder {
        self.access = access;
        self
    }

    fn next(&mut self, slots: u16) -> u16 {
        let index = self.next_index;
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, text: &str) -> u16 {
        self.utf8_bytes(text.as_bytes())
    }

    pub fn utf8_bytes(&mut self, text: &[u8]) -> u16 {
        if let Some(index) = self.utf8s.get(text) {
            return *index;
        }
        self.constants.write_u8(1).unwrap();
        self.constants.write_u16::<BigEndian>(text.len() as u16).unwrap();
        self.constants.extend_from_slice(text);
        let index = self.next(1);
        self.utf8s.insert(text.to_vec(), index);
        index
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name.as_bytes()) {
            return *index;
        }
        let name_index = self.utf8(name);
        self.constants.write_u8(7).unwrap();
        self.constants.write_u16::<BigEndian>(name_index).unwrap();
        let index = self.next(1);
        self.classes.insert(name.as_bytes().to_vec(), index);
        index
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.constants.write_u8(3).unwrap();
        self.constants.write_i32::<BigEndian>(value).unwrap();
        self.next(1)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.constants.write_u8(4).unwrap();
        self.constants.write_f32::<BigEndian>(value).unwrap();
        self.next(1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.constants.write_u8(5).unwrap();
        self.constants.write_i64::<BigEndian>(value).unwrap();
        self.next(2)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.constants.write_u8(12).unwrap();
        self.constants.write_u16::<BigEndian>(name).unwrap();
        self.constants.write_u16::<BigEndian>(descriptor).unwrap();
        let name_and_type = self.next(1);
        self.constants.write_u8(10).unwrap();
        self.constants.write_u16::<BigEndian>(class).unwrap();
        self.constants.write_u16::<BigEndian>(name_and_type).unwrap();
        self.next(1)
    }

    pub fn interface(mut self, name: &str) -> ClassBuilder {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn attribute(&mut self, name: &str, body: Vec<u8>) -> Attribute {
        Attribute {
            name: self.utf8(name),
            body,
        }
    }

    /// Attribute holding a single constant pool index
    pub fn index_attribute(&mut self, name: &str, index: u16) -> Attribute {
        self.attribute(name, index.to_be_bytes().to_vec())
    }

    /// `Code` attribute, with handlers given as `[start, end, handler, catch type]`
    pub fn code(
        &mut self,
        max_stack: u16,
        max_locals: u16,
        bytecode: &[u8],
        handlers: &[[u16; 4]],
        attributes: &[Attribute],
    ) -> Attribute {
        let mut body = vec![];
        body.write_u16::<BigEndian>(max_stack).unwrap();
        body.write_u16::<BigEndian>(max_locals).unwrap();
        body.write_u32::<BigEndian>(bytecode.len() as u32).unwrap();
        Self::finish_code(&mut body, bytecode, handlers, attributes);
        self.attribute("Code", body)
    }

    /// `Code` attribute in the layout of classfiles older than 45.3
    pub fn short_code(&mut self, max_stack: u8, max_locals: u8, bytecode: &[u8]) -> Attribute {
        let mut body = vec![];
        body.write_u8(max_stack).unwrap();
        body.write_u8(max_locals).unwrap();
        body.write_u16::<BigEndian>(bytecode.len() as u16).unwrap();
        Self::finish_code(&mut body, bytecode, &[], &[]);
        self.attribute("Code", body)
    }

    fn finish_code(
        body: &mut Vec<u8>,
        bytecode: &[u8],
        handlers: &[[u16; 4]],
        attributes: &[Attribute],
    ) {
        body.extend_from_slice(bytecode);
        body.write_u16::<BigEndian>(handlers.len() as u16).unwrap();
        for handler in handlers {
            for item in handler {
                body.write_u16::<BigEndian>(*item).unwrap();
            }
        }
        write_attributes(body, attributes);
    }

    /// Table of `u2` items preceded by their count, as in `Exceptions` and `LineNumberTable`
    pub fn table_attribute(&mut self, name: &str, items: &[u16]) -> Attribute {
        let mut body = vec![];
        body.write_u16::<BigEndian>(items.len() as u16).unwrap();
        for item in items {
            body.write_u16::<BigEndian>(*item).unwrap();
        }
        self.attribute(name, body)
    }

    pub fn field(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<Attribute>) {
        let member = Member {
            access,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes,
        };
        self.fields.push(member);
    }

    pub fn method(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<Attribute>) {
        let member = Member {
            access,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes,
        };
        self.methods.push(member);
    }

    pub fn class_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Add the usual constructor calling `super()`
    pub fn default_constructor(&mut self, super_class: &str) {
        let init = self.method_ref(super_class, "<init>", "()V");
        let [high, low] = init.to_be_bytes();
        let code = self.code(1, 1, &[0x2a, 0xb7, high, low, 0xb1], &[], &[]);
        self.method(ACC_PUBLIC, "<init>", "()V", vec![code]);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![];
        out.write_u32::<BigEndian>(0xCAFE_BABE).unwrap();
        out.write_u16::<BigEndian>(self.minor_version).unwrap();
        out.write_u16::<BigEndian>(self.major_version).unwrap();
        out.write_u16::<BigEndian>(self.next_index).unwrap();
        out.extend_from_slice(&self.constants);
        out.write_u16::<BigEndian>(self.access).unwrap();
        out.write_u16::<BigEndian>(self.this_class).unwrap();
        out.write_u16::<BigEndian>(self.super_class).unwrap();
        out.write_u16::<BigEndian>(self.interfaces.len() as u16).unwrap();
        for interface in &self.interfaces {
            out.write_u16::<BigEndian>(*interface).unwrap();
        }
        for members in [&self.fields, &self.methods] {
            out.write_u16::<BigEndian>(members.len() as u16).unwrap();
            for member in members {
                out.write_u16::<BigEndian>(member.access).unwrap();
                out.write_u16::<BigEndian>(member.name).unwrap();
                out.write_u16::<BigEndian>(member.descriptor).unwrap();
                write_attributes(&mut out, &member.attributes);
            }
        }
        write_attributes(&mut out, &self.attributes);
        out
    }
}

/// `public class <name> extends java/lang/Object` with just a default constructor
pub fn minimal_class(name: &str) -> Vec<u8> {
    let mut builder = ClassBuilder::new(name, Some("java/lang/Object"));
    builder.default_constructor("java/lang/Object");
    builder.build()
}

/// Offset of `constant_pool_count` in every classfile
pub const CONSTANT_POOL_COUNT_OFFSET: usize = 8;
