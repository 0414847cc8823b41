//! Assembles small class files for tests.

use fnv::FnvHashMap;

/// Big-endian bytes of a constant pool index.
pub fn u2(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

/// Builds a class file one constant, field and method at a time.
pub struct ClassBuilder {
    pool: Vec<u8>,
    /// Index the next constant gets.
    next_index: u16,
    utf8s: FnvHashMap<String, u16>,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        let mut b = Self {
            pool: vec![],
            next_index: 1,
            utf8s: FnvHashMap::default(),
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            fields: vec![],
            methods: vec![],
        };
        b.this_class = b.class(name);
        b.super_class = b.class("java/lang/Object");
        b
    }

    pub fn access(&mut self, flags: u16) -> &mut Self {
        self.access_flags = flags;
        self
    }

    fn entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.pool.extend_from_slice(bytes);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(index) = self.utf8s.get(s) {
            return *index;
        }
        let mut bytes = vec![1];
        bytes.extend(u2(s.len() as u16));
        bytes.extend(s.as_bytes());
        let index = self.entry(&bytes, 1);
        self.utf8s.insert(s.to_string(), index);
        index
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = u2(self.utf8(name));
        self.entry(&[7, name[0], name[1]], 1)
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let string = u2(self.utf8(s));
        self.entry(&[8, string[0], string[1]], 1)
    }

    pub fn integer(&mut self, v: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend(v.to_be_bytes());
        self.entry(&bytes, 1)
    }

    pub fn long(&mut self, v: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend(v.to_be_bytes());
        self.entry(&bytes, 2)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = u2(self.utf8(name));
        let descriptor = u2(self.utf8(descriptor));
        self.entry(&[12, name[0], name[1], descriptor[0], descriptor[1]], 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = u2(self.class(class));
        let name_and_type = u2(self.name_and_type(name, descriptor));
        self.entry(&[tag, class[0], class[1], name_and_type[0], name_and_type[1]], 1)
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(9, class, name, descriptor)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(10, class, name, descriptor)
    }

    /// Add a field, with a `ConstantValue` attribute when `constant` is set.
    pub fn field(&mut self, flags: u16, name: &str, descriptor: &str, constant: Option<u16>) -> &mut Self {
        let mut bytes = vec![];
        bytes.extend(u2(flags));
        bytes.extend(u2(self.utf8(name)));
        bytes.extend(u2(self.utf8(descriptor)));
        match constant {
            Some(index) => {
                bytes.extend(u2(1));
                bytes.extend(u2(self.utf8("ConstantValue")));
                bytes.extend(2u32.to_be_bytes());
                bytes.extend(u2(index));
            }
            None => bytes.extend(u2(0)),
        }
        self.fields.push(bytes);
        self
    }

    /// Add a method with a `Code` attribute holding `code`.
    pub fn method(&mut self, flags: u16, name: &str, descriptor: &str, code: &[u8]) -> &mut Self {
        let mut bytes = vec![];
        bytes.extend(u2(flags));
        bytes.extend(u2(self.utf8(name)));
        bytes.extend(u2(self.utf8(descriptor)));
        bytes.extend(u2(1));
        bytes.extend(u2(self.utf8("Code")));
        bytes.extend((12 + code.len() as u32).to_be_bytes());
        bytes.extend(u2(16));
        bytes.extend(u2(16));
        bytes.extend((code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(code);
        bytes.extend(u2(0));
        bytes.extend(u2(0));
        self.methods.push(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 52];
        out.extend(u2(self.next_index));
        out.extend_from_slice(&self.pool);
        out.extend(u2(self.access_flags));
        out.extend(u2(self.this_class));
        out.extend(u2(self.super_class));
        out.extend(u2(0));
        for members in [&self.fields, &self.methods] {
            out.extend(u2(members.len() as u16));
            for member in members {
                out.extend_from_slice(member);
            }
        }
        out.extend(u2(0));
        out
    }
}
