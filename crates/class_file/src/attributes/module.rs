#[derive(Debug, Clone, PartialEq)]
pub struct ModuleAttribute {
    pub module_name_index: u16,
    pub module_flags: u16,
    pub module_version_index: u16,
    pub requires: Vec<ModuleRequires>,
    pub exports: Vec<ModuleExports>,
    /// Same layout as `exports`.
    pub opens: Vec<ModuleExports>,
    pub uses: Vec<u16>,
    pub provides: Vec<ModuleProvides>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRequires {
    pub requires_index: u16,
    pub requires_flags: u16,
    pub requires_version_index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExports {
    pub index: u16,
    pub flags: u16,
    pub to_index: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleProvides {
    pub provides_index: u16,
    pub provides_with_index: Vec<u16>,
}

/// Entry of the JDK-internal `ModuleHashes` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleHash {
    pub module_name_index: u16,
    pub hash: Vec<u8>,
}
