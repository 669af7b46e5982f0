//! The opcode enumeration of the normalized, register-based Dalvik-style IR
//! and the opcode taxonomy predicates used by the analysis.
//!
//! The set is normalized in the usual IR sense: size-specific encodings
//! (`const/4`, `add-int/2addr`, ...) are collapsed into one opcode per
//! operation, and a handful of pseudo-opcodes exist that never appear in
//! compiled output: the load-param family which materializes incoming
//! arguments at the top of the entry block, and the move-result-pseudo family
//! which carries the destination of instructions that may throw.

use core::fmt;

/// Internal helper macro to define the opcode enumeration together with its
/// assembly mnemonics.
macro_rules! opcodes {
    ($($(#[$attr:meta])* $name:ident = $mnemonic:literal,)*) => {
        /// An IR opcode.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        #[allow(missing_docs)]
        pub enum Opcode {
            $($(#[$attr])* $name,)*
        }

        impl Opcode {
            /// Returns the assembly mnemonic for this opcode.
            #[must_use]
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$name => $mnemonic,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = "nop",

    Move = "move",
    MoveWide = "move-wide",
    MoveObject = "move-object",

    MoveResult = "move-result",
    MoveResultWide = "move-result-wide",
    MoveResultObject = "move-result-object",
    MoveException = "move-exception",

    ReturnVoid = "return-void",
    Return = "return",
    ReturnWide = "return-wide",
    ReturnObject = "return-object",

    Const = "const",
    ConstWide = "const-wide",
    ConstString = "const-string",
    ConstClass = "const-class",

    MonitorEnter = "monitor-enter",
    MonitorExit = "monitor-exit",

    CheckCast = "check-cast",
    InstanceOf = "instance-of",
    ArrayLength = "array-length",

    NewInstance = "new-instance",
    NewArray = "new-array",
    FilledNewArray = "filled-new-array",
    FillArrayData = "fill-array-data",

    Throw = "throw",
    Goto = "goto",
    Switch = "switch",

    CmplFloat = "cmpl-float",
    CmpgFloat = "cmpg-float",
    CmplDouble = "cmpl-double",
    CmpgDouble = "cmpg-double",
    CmpLong = "cmp-long",

    IfEq = "if-eq",
    IfNe = "if-ne",
    IfLt = "if-lt",
    IfGe = "if-ge",
    IfGt = "if-gt",
    IfLe = "if-le",
    IfEqz = "if-eqz",
    IfNez = "if-nez",
    IfLtz = "if-ltz",
    IfGez = "if-gez",
    IfGtz = "if-gtz",
    IfLez = "if-lez",

    Aget = "aget",
    AgetWide = "aget-wide",
    AgetObject = "aget-object",
    AgetBoolean = "aget-boolean",
    AgetByte = "aget-byte",
    AgetChar = "aget-char",
    AgetShort = "aget-short",

    Aput = "aput",
    AputWide = "aput-wide",
    AputObject = "aput-object",
    AputBoolean = "aput-boolean",
    AputByte = "aput-byte",
    AputChar = "aput-char",
    AputShort = "aput-short",

    Iget = "iget",
    IgetWide = "iget-wide",
    IgetObject = "iget-object",
    IgetBoolean = "iget-boolean",
    IgetByte = "iget-byte",
    IgetChar = "iget-char",
    IgetShort = "iget-short",

    Iput = "iput",
    IputWide = "iput-wide",
    IputObject = "iput-object",
    IputBoolean = "iput-boolean",
    IputByte = "iput-byte",
    IputChar = "iput-char",
    IputShort = "iput-short",

    Sget = "sget",
    SgetWide = "sget-wide",
    SgetObject = "sget-object",
    SgetBoolean = "sget-boolean",
    SgetByte = "sget-byte",
    SgetChar = "sget-char",
    SgetShort = "sget-short",

    Sput = "sput",
    SputWide = "sput-wide",
    SputObject = "sput-object",
    SputBoolean = "sput-boolean",
    SputByte = "sput-byte",
    SputChar = "sput-char",
    SputShort = "sput-short",

    InvokeVirtual = "invoke-virtual",
    InvokeSuper = "invoke-super",
    InvokeDirect = "invoke-direct",
    InvokeStatic = "invoke-static",
    InvokeInterface = "invoke-interface",

    NegInt = "neg-int",
    NotInt = "not-int",
    NegLong = "neg-long",
    NotLong = "not-long",
    NegFloat = "neg-float",
    NegDouble = "neg-double",

    IntToLong = "int-to-long",
    IntToFloat = "int-to-float",
    IntToDouble = "int-to-double",
    LongToInt = "long-to-int",
    LongToFloat = "long-to-float",
    LongToDouble = "long-to-double",
    FloatToInt = "float-to-int",
    FloatToLong = "float-to-long",
    FloatToDouble = "float-to-double",
    DoubleToInt = "double-to-int",
    DoubleToLong = "double-to-long",
    DoubleToFloat = "double-to-float",
    IntToByte = "int-to-byte",
    IntToChar = "int-to-char",
    IntToShort = "int-to-short",

    AddInt = "add-int",
    SubInt = "sub-int",
    MulInt = "mul-int",
    DivInt = "div-int",
    RemInt = "rem-int",
    AndInt = "and-int",
    OrInt = "or-int",
    XorInt = "xor-int",
    ShlInt = "shl-int",
    ShrInt = "shr-int",
    UshrInt = "ushr-int",

    AddLong = "add-long",
    SubLong = "sub-long",
    MulLong = "mul-long",
    DivLong = "div-long",
    RemLong = "rem-long",
    AndLong = "and-long",
    OrLong = "or-long",
    XorLong = "xor-long",
    ShlLong = "shl-long",
    ShrLong = "shr-long",
    UshrLong = "ushr-long",

    AddFloat = "add-float",
    SubFloat = "sub-float",
    MulFloat = "mul-float",
    DivFloat = "div-float",
    RemFloat = "rem-float",

    AddDouble = "add-double",
    SubDouble = "sub-double",
    MulDouble = "mul-double",
    DivDouble = "div-double",
    RemDouble = "rem-double",

    AddIntLit = "add-int/lit",
    RsubIntLit = "rsub-int/lit",
    MulIntLit = "mul-int/lit",
    DivIntLit = "div-int/lit",
    RemIntLit = "rem-int/lit",
    AndIntLit = "and-int/lit",
    OrIntLit = "or-int/lit",
    XorIntLit = "xor-int/lit",
    ShlIntLit = "shl-int/lit",
    ShrIntLit = "shr-int/lit",
    UshrIntLit = "ushr-int/lit",

    /// Pseudo-opcode materializing an incoming method argument in the entry
    /// block.
    LoadParam = "load-param",
    /// Wide variant of [`Opcode::LoadParam`].
    LoadParamWide = "load-param-wide",
    /// Object variant of [`Opcode::LoadParam`].
    LoadParamObject = "load-param-object",

    /// Pseudo-opcode carrying the destination of a potentially-throwing
    /// instruction, placed immediately after it.
    MoveResultPseudo = "move-result-pseudo",
    /// Wide variant of [`Opcode::MoveResultPseudo`].
    MoveResultPseudoWide = "move-result-pseudo-wide",
    /// Object variant of [`Opcode::MoveResultPseudo`].
    MoveResultPseudoObject = "move-result-pseudo-object",

    /// Reserved sentinel used by the value-numbering model to describe the
    /// contents of a register before an instruction executes. Never valid in
    /// a method body.
    PreStateSrc = "pre-state-src",
}

impl Opcode {
    /// Whether this is a register-to-register move.
    #[must_use]
    pub fn is_move(self) -> bool {
        matches!(self, Self::Move | Self::MoveWide | Self::MoveObject)
    }

    /// Whether this is a move-result instruction consuming the result of a
    /// preceding invoke or filled-new-array.
    #[must_use]
    pub fn is_move_result(self) -> bool {
        matches!(
            self,
            Self::MoveResult | Self::MoveResultWide | Self::MoveResultObject
        )
    }

    /// Whether this is a move-result-pseudo instruction consuming the result
    /// of the immediately preceding potentially-throwing instruction.
    #[must_use]
    pub fn is_move_result_pseudo(self) -> bool {
        matches!(
            self,
            Self::MoveResultPseudo | Self::MoveResultPseudoWide | Self::MoveResultPseudoObject
        )
    }

    /// Whether this opcode consumes the implicit result slot, in either its
    /// real or pseudo form.
    #[must_use]
    pub fn is_move_result_any(self) -> bool {
        self.is_move_result() || self.is_move_result_pseudo()
    }

    /// Whether this is a constant-loading instruction.
    #[must_use]
    pub fn is_const(self) -> bool {
        matches!(
            self,
            Self::Const | Self::ConstWide | Self::ConstString | Self::ConstClass
        )
    }

    /// Whether this is one of the load-param pseudo-opcodes.
    #[must_use]
    pub fn is_load_param(self) -> bool {
        matches!(
            self,
            Self::LoadParam | Self::LoadParamWide | Self::LoadParamObject
        )
    }

    /// Whether this is a monitor-enter or monitor-exit.
    #[must_use]
    pub fn is_monitor(self) -> bool {
        matches!(self, Self::MonitorEnter | Self::MonitorExit)
    }

    /// Whether this is an invoke of any kind.
    #[must_use]
    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            Self::InvokeVirtual
                | Self::InvokeSuper
                | Self::InvokeDirect
                | Self::InvokeStatic
                | Self::InvokeInterface
        )
    }

    /// Whether this is an array load.
    #[must_use]
    pub fn is_aget(self) -> bool {
        matches!(
            self,
            Self::Aget
                | Self::AgetWide
                | Self::AgetObject
                | Self::AgetBoolean
                | Self::AgetByte
                | Self::AgetChar
                | Self::AgetShort
        )
    }

    /// Whether this is an array store.
    #[must_use]
    pub fn is_aput(self) -> bool {
        matches!(
            self,
            Self::Aput
                | Self::AputWide
                | Self::AputObject
                | Self::AputBoolean
                | Self::AputByte
                | Self::AputChar
                | Self::AputShort
        )
    }

    /// Whether this is an instance field load.
    #[must_use]
    pub fn is_iget(self) -> bool {
        matches!(
            self,
            Self::Iget
                | Self::IgetWide
                | Self::IgetObject
                | Self::IgetBoolean
                | Self::IgetByte
                | Self::IgetChar
                | Self::IgetShort
        )
    }

    /// Whether this is an instance field store.
    #[must_use]
    pub fn is_iput(self) -> bool {
        matches!(
            self,
            Self::Iput
                | Self::IputWide
                | Self::IputObject
                | Self::IputBoolean
                | Self::IputByte
                | Self::IputChar
                | Self::IputShort
        )
    }

    /// Whether this is a static field load.
    #[must_use]
    pub fn is_sget(self) -> bool {
        matches!(
            self,
            Self::Sget
                | Self::SgetWide
                | Self::SgetObject
                | Self::SgetBoolean
                | Self::SgetByte
                | Self::SgetChar
                | Self::SgetShort
        )
    }

    /// Whether this is a static field store.
    #[must_use]
    pub fn is_sput(self) -> bool {
        matches!(
            self,
            Self::Sput
                | Self::SputWide
                | Self::SputObject
                | Self::SputBoolean
                | Self::SputByte
                | Self::SputChar
                | Self::SputShort
        )
    }

    /// Whether this opcode operates on a static field.
    #[must_use]
    pub fn is_sfield_op(self) -> bool {
        self.is_sget() || self.is_sput()
    }

    /// Whether this opcode operates on an instance field.
    #[must_use]
    pub fn is_ifield_op(self) -> bool {
        self.is_iget() || self.is_iput()
    }

    /// Whether this opcode carries a field reference.
    #[must_use]
    pub fn has_field_ref(self) -> bool {
        self.is_sfield_op() || self.is_ifield_op()
    }

    /// Whether this opcode reads from the heap: instance, static and array
    /// loads. The values such instructions produce are barrier-sensitive.
    #[must_use]
    pub fn is_heap_read(self) -> bool {
        self.is_iget() || self.is_sget() || self.is_aget()
    }

    /// Whether swapping the two sources of this opcode leaves its result
    /// unchanged.
    ///
    /// Floating-point addition and multiplication are deliberately excluded;
    /// canonicalizing their operand order is not worth reasoning about the
    /// NaN cases.
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::AddInt
                | Self::MulInt
                | Self::AndInt
                | Self::OrInt
                | Self::XorInt
                | Self::AddLong
                | Self::MulLong
                | Self::AndLong
                | Self::OrLong
                | Self::XorLong
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
