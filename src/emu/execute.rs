use rand::Rng;

use super::{
    Chip8, Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, FONT_GLYPH_SIZE, FONT_START_ADDRESS,
    Opcode, OpcodeALU,
};
use crate::u4;

impl Chip8 {
    /// Runs one decoded instruction. The program counter has already been advanced
    /// past it. Every check that can fail happens before any state is touched.
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<Chip8Result, Chip8Error> {
        match opcode {
            Opcode::ClearDisplay => {
                self.display.fill(false);
                self.redraw = true;
                return Ok(Chip8Result::Redraw);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into());
            }
            Opcode::Call { nnn } => {
                self.stack.push(self.pc, nnn)?;
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self.stack.pop()?;
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                if self.v[x] == nn {
                    self.skip();
                }
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                if self.v[x] != nn {
                    self.skip();
                }
            }
            Opcode::SkipRegEqualReg { x, y } => {
                if self.v[x] == self.v[y] {
                    self.skip();
                }
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                if self.v[x] != self.v[y] {
                    self.skip();
                }
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                if self.keypad[u4::low(self.v[x])] {
                    self.skip();
                }
            }
            Opcode::SkipIfNotPressed { x } => {
                if !self.keypad[u4::low(self.v[x])] {
                    self.skip();
                }
            }
            Opcode::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x));
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = (FONT_START_ADDRESS + self.v[x] as usize * FONT_GLYPH_SIZE) as u16;
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                self.mem_range(self.i, 3)?
                    .copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
            }
            Opcode::StoreRegs { x } => {
                let count = usize::from(x) + 1;
                let regs = self.v;
                self.mem_range(self.i, count)?
                    .copy_from_slice(&regs[..count]);
                self.advance_index_after_load_store(count);
            }
            Opcode::LoadRegs { x } => {
                let count = usize::from(x) + 1;
                let start = self.i as usize;
                self.mem_range(self.i, count)?;
                self.v[..count].copy_from_slice(&self.memory[start..start + count]);
                self.advance_index_after_load_store(count);
            }
            Opcode::Unknown(opcode) => {
                log::debug!("Skipping unknown opcode {opcode:#06X}");
            }
        };

        Ok(Chip8Result::Continue)
    }

    fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn advance_index_after_load_store(&mut self, count: usize) {
        if self.mode.load_store_increments_index() {
            self.i = self.i.wrapping_add(count as u16);
        }
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        match op {
            OpcodeALU::Set => self.v[x] = self.v[y],
            OpcodeALU::Or => {
                self.v[x] |= self.v[y];
                self.reset_vf_after_logic();
            }
            OpcodeALU::And => {
                self.v[x] &= self.v[y];
                self.reset_vf_after_logic();
            }
            OpcodeALU::Xor => {
                self.v[x] ^= self.v[y];
                self.reset_vf_after_logic();
            }
            OpcodeALU::Add => {
                let (res, overflow) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = overflow as u8;
            }
            OpcodeALU::Sub => {
                let (res, borrow) = self.v[x].overflowing_sub(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = !borrow as u8; // Notice that borrow is inverted
            }
            OpcodeALU::SubReverse => {
                let (res, borrow) = self.v[y].overflowing_sub(self.v[x]);
                self.v[x] = res;
                self.v[0xF] = !borrow as u8;
            }
            OpcodeALU::ShiftRight => {
                let src = self.shift_source(x, y);
                self.v[x] = src >> 1;
                self.v[0xF] = src & 1;
            }
            OpcodeALU::ShiftLeft => {
                let src = self.shift_source(x, y);
                self.v[x] = src << 1;
                self.v[0xF] = (src >> 7) & 1;
            }
        }
    }

    fn reset_vf_after_logic(&mut self) {
        if self.mode.logic_resets_vf() {
            self.v[0xF] = 0;
        }
    }

    fn shift_source(&self, x: u4, y: u4) -> u8 {
        if self.mode.shift_reads_vy() {
            self.v[y]
        } else {
            self.v[x]
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<Chip8Result, Chip8Error> {
        let x_pos = self.v[x] as usize % DISPLAY_X;
        let y_pos = self.v[y] as usize % DISPLAY_Y;

        // Sprites are clipped at the right and bottom edges, not wrapped
        let row_count = std::cmp::min(usize::from(n), DISPLAY_Y - y_pos);
        let col_count = std::cmp::min(8, DISPLAY_X - x_pos);

        let sprite_start = self.i as usize;
        self.mem_range(self.i, row_count)?;

        let mut any_erased = false;
        for row in 0..row_count {
            let sprite_byte = self.memory[sprite_start + row];

            for col in 0..col_count {
                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let pixel = &mut self.display[(y_pos + row) * DISPLAY_X + x_pos + col];

                    any_erased |= *pixel;
                    *pixel ^= true;
                }
            }
        }

        self.v[0xF] = any_erased as u8;
        self.redraw = true;
        Ok(Chip8Result::Redraw)
    }

    fn execute_wait_for_key(&mut self, x: u4) -> Chip8Result {
        if let Some(key) = self.wait_release_key
            && !self.keypad[key]
        {
            // The key we were waiting for has been released
            self.v[x] = key.into();
            self.wait_release_key = None;
            return Chip8Result::Continue;
        }

        if self.wait_release_key.is_none() {
            // Not waiting for a key release yet, check all keys
            let pressed = u4::all().find(|&key| self.keypad[key]);
            if let Some(key) = pressed {
                log::debug!("FX0A captured key {:X}", u8::from(key));
            }
            self.wait_release_key = pressed;
        }

        // Repeat this instruction until a key is released
        self.pc = self.pc.wrapping_sub(2);
        Chip8Result::AwaitingKey
    }
}
