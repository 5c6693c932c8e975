use crate::u4;

/// CHIP-8 instruction opcodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Jump { nnn: u16 },
    JumpWithOffset { nnn: u16 },

    Call { nnn: u16 },
    Return,

    SkipRegEqualImm { x: u4, nn: u8 },
    SkipRegNotEqualImm { x: u4, nn: u8 },
    SkipRegEqualReg { x: u4, y: u4 },
    SkipRegNotEqualReg { x: u4, y: u4 },

    SetRegImm { x: u4, nn: u8 },
    AddRegImm { x: u4, nn: u8 },
    SetIndexImm { nnn: u16 },
    AddIndexReg { x: u4 },

    ALU { x: u4, y: u4, op: OpcodeALU },
    Random { x: u4, nn: u8 },

    ClearDisplay,
    Draw { x: u4, y: u4, n: u4 },

    SkipIfPressed { x: u4 },
    SkipIfNotPressed { x: u4 },
    WaitForKey { x: u4 },

    ReadDelayTimer { x: u4 },
    SetDelayTimer { x: u4 },
    SetSoundTimer { x: u4 },

    FontChar { x: u4 },
    BCD { x: u4 },

    StoreRegs { x: u4 },
    LoadRegs { x: u4 },

    /// Anything else. Executes as a no-op.
    Unknown(u16),
}

/// The `8XYn` register-to-register operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeALU {
    Set,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubReverse,
    ShiftLeft,
}

impl Opcode {
    /// Decode a 16-bit raw opcode into an Opcode enum variant
    pub fn decode(opcode: u16) -> Self {
        let class = (opcode >> 12) as u8;
        let x = u4::low((opcode >> 8) as u8);
        let y = u4::low((opcode >> 4) as u8);
        let n = u4::low(opcode as u8);
        let nn = (opcode & 0x00FF) as u8;
        let nnn = opcode & 0x0FFF;

        match (class, nn) {
            (0x0, 0xE0) => Opcode::ClearDisplay,
            (0x0, 0xEE) => Opcode::Return,
            (0x1, _) => Opcode::Jump { nnn },
            (0x2, _) => Opcode::Call { nnn },
            (0x3, _) => Opcode::SkipRegEqualImm { x, nn },
            (0x4, _) => Opcode::SkipRegNotEqualImm { x, nn },
            (0x5, _) if u8::from(n) == 0 => Opcode::SkipRegEqualReg { x, y },
            (0x6, _) => Opcode::SetRegImm { x, nn },
            (0x7, _) => Opcode::AddRegImm { x, nn },
            (0x8, _) => Opcode::ALU {
                x,
                y,
                op: match u8::from(n) {
                    0x0 => OpcodeALU::Set,
                    0x1 => OpcodeALU::Or,
                    0x2 => OpcodeALU::And,
                    0x3 => OpcodeALU::Xor,
                    0x4 => OpcodeALU::Add,
                    0x5 => OpcodeALU::Sub,
                    0x6 => OpcodeALU::ShiftRight,
                    0x7 => OpcodeALU::SubReverse,
                    0xE => OpcodeALU::ShiftLeft,
                    _ => return Opcode::Unknown(opcode),
                },
            },
            (0x9, _) => Opcode::SkipRegNotEqualReg { x, y },
            (0xA, _) => Opcode::SetIndexImm { nnn },
            (0xB, _) => Opcode::JumpWithOffset { nnn },
            (0xC, _) => Opcode::Random { x, nn },
            (0xD, _) => Opcode::Draw { x, y, n },
            (0xE, 0x9E) => Opcode::SkipIfPressed { x },
            (0xE, 0xA1) => Opcode::SkipIfNotPressed { x },
            (0xF, 0x07) => Opcode::ReadDelayTimer { x },
            (0xF, 0x0A) => Opcode::WaitForKey { x },
            (0xF, 0x15) => Opcode::SetDelayTimer { x },
            (0xF, 0x18) => Opcode::SetSoundTimer { x },
            (0xF, 0x1E) => Opcode::AddIndexReg { x },
            (0xF, 0x29) => Opcode::FontChar { x },
            (0xF, 0x33) => Opcode::BCD { x },
            (0xF, 0x55) => Opcode::StoreRegs { x },
            (0xF, 0x65) => Opcode::LoadRegs { x },

            _ => Opcode::Unknown(opcode),
        }
    }
}
