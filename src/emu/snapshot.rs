//! Fixed-layout binary snapshot of a [`Chip8`].
//!
//! | field              | bytes | encoding                                  |
//! |--------------------|-------|-------------------------------------------|
//! | memory             | 4096  | raw                                       |
//! | display            | 2048  | one byte per pixel, 0 or 1, row-major      |
//! | stack              | 24    | 12 big-endian `u16`, zero-padded           |
//! | V0-VF              | 16    | raw                                       |
//! | index              | 2     | big-endian                                |
//! | program counter    | 2     | big-endian                                |
//! | delay timer        | 1     |                                           |
//! | sound timer        | 1     |                                           |
//! | keypad             | 16    | 0 or 1                                    |
//! | waiting key        | 1     | key index, or 0xFF when not waiting       |
//! | redraw pending     | 1     | 0 or 1                                    |
//! | mode               | 1     | 0 = original, 1 = extended                |
//!
//! The stack depth is not stored: it is the number of leading non-zero slots.

use super::{CallStack, Chip8, Chip8Error, DISPLAY_SIZE, MEMORY_SIZE, Mode, STACK_DEPTH};
use crate::u4;

pub const SNAPSHOT_SIZE: usize =
    MEMORY_SIZE + DISPLAY_SIZE + STACK_DEPTH * 2 + 16 + 2 + 2 + 1 + 1 + 16 + 1 + 1 + 1;

const NOT_WAITING: u8 = 0xFF;

impl Chip8 {
    /// Serializes the whole machine into a [`SNAPSHOT_SIZE`]-byte blob.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SNAPSHOT_SIZE);

        out.extend_from_slice(&self.memory);
        out.extend(self.display.iter().map(|&pixel| pixel as u8));
        out.extend(self.stack.slots().iter().flat_map(|addr| addr.to_be_bytes()));
        out.extend_from_slice(&self.v);
        out.extend_from_slice(&self.i.to_be_bytes());
        out.extend_from_slice(&self.pc.to_be_bytes());
        out.push(self.delay_timer);
        out.push(self.sound_timer);
        out.extend(self.keypad.iter().map(|&key| key as u8));
        out.push(self.wait_release_key.map_or(NOT_WAITING, u8::from));
        out.push(self.redraw as u8);
        out.push(self.mode.to_byte());

        debug_assert_eq!(out.len(), SNAPSHOT_SIZE);
        out
    }

    /// Rebuilds a machine from a blob produced by [`Chip8::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Chip8Error> {
        if bytes.len() != SNAPSHOT_SIZE {
            return Err(Chip8Error::CorruptState {
                size: bytes.len(),
                expected: SNAPSHOT_SIZE,
            });
        }

        let mut reader = Reader(bytes);

        let memory: [u8; MEMORY_SIZE] = reader.take()?;
        let display = reader.take::<DISPLAY_SIZE>()?;
        let stack_bytes = reader.take::<{ STACK_DEPTH * 2 }>()?;
        let v: [u8; 16] = reader.take()?;
        let i = u16::from_be_bytes(reader.take()?);
        let pc = u16::from_be_bytes(reader.take()?);
        let [delay_timer] = reader.take::<1>()?;
        let [sound_timer] = reader.take::<1>()?;
        let keypad = reader.take::<16>()?;
        let [waiting_key] = reader.take::<1>()?;
        let [redraw] = reader.take::<1>()?;
        let [mode] = reader.take::<1>()?;

        let mode = Mode::from_byte(mode).ok_or(Chip8Error::InvalidStateField { field: "mode" })?;

        let mut slots = [0u16; STACK_DEPTH];
        for (slot, pair) in slots.iter_mut().zip(stack_bytes.chunks_exact(2)) {
            *slot = u16::from_be_bytes([pair[0], pair[1]]);
        }
        let stack =
            CallStack::from_slots(slots).ok_or(Chip8Error::InvalidStateField { field: "stack" })?;

        let wait_release_key = match waiting_key {
            NOT_WAITING => None,
            key => Some(
                u4::try_from(key)
                    .map_err(|_| Chip8Error::InvalidStateField { field: "waiting key" })?,
            ),
        };

        let mut chip8 = Chip8::blank(mode);
        chip8.memory = memory;
        chip8.display = decode_flags(display, "display")?;
        chip8.stack = stack;
        chip8.v = v;
        chip8.i = i;
        chip8.pc = pc;
        chip8.delay_timer = delay_timer;
        chip8.sound_timer = sound_timer;
        chip8.keypad = decode_flags(keypad, "keypad")?;
        chip8.wait_release_key = wait_release_key;
        chip8.redraw = decode_flag(redraw, "redraw flag")?;

        Ok(chip8)
    }
}

struct Reader<'a>(&'a [u8]);

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], Chip8Error> {
        let (head, rest) = self
            .0
            .split_first_chunk::<N>()
            .ok_or(Chip8Error::CorruptState {
                size: self.0.len(),
                expected: N,
            })?;
        self.0 = rest;
        Ok(*head)
    }
}

fn decode_flag(byte: u8, field: &'static str) -> Result<bool, Chip8Error> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Chip8Error::InvalidStateField { field }),
    }
}

fn decode_flags<const N: usize>(
    bytes: [u8; N],
    field: &'static str,
) -> Result<[bool; N], Chip8Error> {
    let mut flags = [false; N];
    for (flag, byte) in flags.iter_mut().zip(bytes) {
        *flag = decode_flag(byte, field)?;
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // Offsets of the trailing single-byte fields
    const WAITING_KEY: usize = SNAPSHOT_SIZE - 3;
    const MODE: usize = SNAPSHOT_SIZE - 1;
    const STACK: usize = MEMORY_SIZE + DISPLAY_SIZE;

    fn busy_chip8() -> Chip8 {
        let mut chip8 = Chip8::new(&[0x22, 0x04, 0x00, 0x00, 0xF5, 0x0A], Mode::Original).unwrap();
        chip8.display[5] = true;
        chip8.display[DISPLAY_SIZE - 1] = true;
        chip8.v = [0x11; 16];
        chip8.i = 0x345;
        chip8.delay_timer = 9;
        chip8.sound_timer = 4;
        chip8.redraw = true;

        // Call into the FX0A and leave it waiting on key 6
        chip8.execute_one().unwrap();
        chip8.set_key(u4::new(6), true);
        chip8.execute_one().unwrap();
        chip8
    }

    #[test]
    fn snapshot_has_fixed_size() {
        assert_eq!(SNAPSHOT_SIZE, 6209);
        assert_eq!(busy_chip8().serialize().len(), SNAPSHOT_SIZE);
    }

    #[test]
    fn round_trip_preserves_everything() {
        let chip8 = busy_chip8();
        assert_eq!(chip8.waiting_key(), Some(u4::new(6)));

        let restored = Chip8::deserialize(&chip8.serialize()).unwrap();
        assert_eq!(restored, chip8);
        assert_eq!(restored.stack().as_slice(), &[0x202]);
    }

    #[test]
    fn layout_puts_stack_after_display() {
        let bytes = busy_chip8().serialize();
        assert_eq!(&bytes[STACK..STACK + 4], &[0x02, 0x02, 0x00, 0x00]);
        assert_eq!(bytes[WAITING_KEY], 6);
        assert_eq!(bytes[MODE], 0);
    }

    #[test]
    fn wrong_size_is_rejected() {
        let bytes = busy_chip8().serialize();
        assert_eq!(
            Chip8::deserialize(&bytes[1..]),
            Err(Chip8Error::CorruptState {
                size: SNAPSHOT_SIZE - 1,
                expected: SNAPSHOT_SIZE,
            })
        );
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let good = busy_chip8().serialize();

        let mut bytes = good.clone();
        bytes[MEMORY_SIZE] = 2;
        assert_eq!(
            Chip8::deserialize(&bytes),
            Err(Chip8Error::InvalidStateField { field: "display" })
        );

        let mut bytes = good.clone();
        bytes[STACK + 6] = 0x02;
        assert_eq!(
            Chip8::deserialize(&bytes),
            Err(Chip8Error::InvalidStateField { field: "stack" })
        );

        let mut bytes = good.clone();
        bytes[WAITING_KEY] = 0x10;
        assert_eq!(
            Chip8::deserialize(&bytes),
            Err(Chip8Error::InvalidStateField { field: "waiting key" })
        );

        let mut bytes = good;
        bytes[MODE] = 7;
        assert_eq!(
            Chip8::deserialize(&bytes),
            Err(Chip8Error::InvalidStateField { field: "mode" })
        );
    }

    #[test]
    fn restored_machine_finishes_the_pending_key_wait() {
        let mut restored = Chip8::deserialize(&busy_chip8().serialize()).unwrap();
        restored.set_key(u4::new(6), false);
        restored.execute_one().unwrap();

        assert_eq!(restored.v()[5], 6);
        assert_eq!(restored.pc(), 0x206);
    }
}
