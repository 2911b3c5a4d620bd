//! Descriptor flag sets.

use bitflags::bitflags;

bitflags! {
    /// Flags carried on an interface descriptor.
    ///
    /// Only [`InterfaceFlags::SCRIPTABLE`] is readable without resolving the
    /// interface; the others are reported through the resolved query surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InterfaceFlags: u8 {
        /// Exposed to script callers.
        const SCRIPTABLE = 0x80;
        /// A single-method interface callable as a plain function.
        const FUNCTION = 0x40;
        /// Only native implementations are allowed.
        const BUILTINCLASS = 0x20;
        /// Scriptable only from the main process.
        const MAIN_PROCESS_SCRIPTABLE_ONLY = 0x10;
    }
}

bitflags! {
    /// Flags carried on a method descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// Attribute getter.
        const GETTER = 0x80;
        /// Attribute setter.
        const SETTER = 0x40;
        /// Not callable through the reflection layer.
        const NOTXPCOM = 0x20;
        /// Hidden from script.
        const HIDDEN = 0x08;
        /// Receives the count of optional arguments supplied.
        const OPTARGC = 0x04;
        /// Receives the calling script context.
        const CONTEXT = 0x02;
    }
}

bitflags! {
    /// Flags carried on a parameter descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamFlags: u8 {
        const IN = 0x80;
        const OUT = 0x40;
        const RETVAL = 0x20;
        const SHARED = 0x10;
        const DIPPER = 0x08;
        const OPTIONAL = 0x04;
    }
}

bitflags! {
    /// Pointer/reference qualifiers on a type descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        const POINTER = 0x80;
        const REFERENCE = 0x20;
    }
}
