use chip8_vm::emu::{Chip8, Mode};
use chip8_vm::u4;
use proptest::prelude::*;

fn rom(program: &[u16]) -> Vec<u8> {
    program.iter().flat_map(|op| op.to_be_bytes()).collect()
}

fn any_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Original), Just(Mode::Extended)]
}

/// Runs `program` after loading the given registers with `6XNN` instructions.
fn run_with_registers(regs: &[(u8, u8)], program: &[u16], mode: Mode) -> Chip8 {
    let mut ops: Vec<u16> = regs
        .iter()
        .map(|&(x, value)| 0x6000 | (x as u16) << 8 | value as u16)
        .collect();
    ops.extend_from_slice(program);

    let mut chip8 = Chip8::new(&rom(&ops), mode).unwrap();
    for _ in 0..ops.len() {
        chip8.execute_one().unwrap();
    }
    chip8
}

proptest! {
    #[test]
    fn set_register_stores_value_and_advances_pc(x in 0u8..16, value in any::<u8>(), mode in any_mode()) {
        let opcode = 0x6000 | (x as u16) << 8 | value as u16;
        let mut chip8 = Chip8::new(&rom(&[opcode]), mode).unwrap();
        chip8.execute_one().unwrap();

        prop_assert_eq!(chip8.v()[x as usize], value);
        prop_assert_eq!(chip8.pc(), 0x202);
    }

    #[test]
    fn add_registers_wraps_and_flags_carry(a in any::<u8>(), b in any::<u8>(), mode in any_mode()) {
        let chip8 = run_with_registers(&[(0x1, a), (0x2, b)], &[0x8124], mode);

        prop_assert_eq!(chip8.v()[1], a.wrapping_add(b));
        prop_assert_eq!(chip8.v()[0xF], (a as u16 + b as u16 > 255) as u8);
    }

    #[test]
    fn sub_registers_flags_no_borrow(a in any::<u8>(), b in any::<u8>(), mode in any_mode()) {
        let sub = run_with_registers(&[(0x1, a), (0x2, b)], &[0x8125], mode);
        prop_assert_eq!(sub.v()[1], a.wrapping_sub(b));
        prop_assert_eq!(sub.v()[0xF], (b <= a) as u8);

        let subn = run_with_registers(&[(0x1, a), (0x2, b)], &[0x8127], mode);
        prop_assert_eq!(subn.v()[1], b.wrapping_sub(a));
        prop_assert_eq!(subn.v()[0xF], (a <= b) as u8);
    }

    #[test]
    fn shift_right_source_depends_on_mode(a in any::<u8>(), b in any::<u8>()) {
        let original = run_with_registers(&[(0x1, a), (0x2, b)], &[0x8126], Mode::Original);
        prop_assert_eq!(original.v()[0xF], b & 1);
        prop_assert_eq!(original.v()[1], b >> 1);

        let extended = run_with_registers(&[(0x1, a), (0x2, b)], &[0x8126], Mode::Extended);
        prop_assert_eq!(extended.v()[0xF], a & 1);
        prop_assert_eq!(extended.v()[1], a >> 1);
    }

    #[test]
    fn shift_left_source_depends_on_mode(a in any::<u8>(), b in any::<u8>()) {
        let original = run_with_registers(&[(0x1, a), (0x2, b)], &[0x812E], Mode::Original);
        prop_assert_eq!(original.v()[0xF], b >> 7);
        prop_assert_eq!(original.v()[1], b << 1);

        let extended = run_with_registers(&[(0x1, a), (0x2, b)], &[0x812E], Mode::Extended);
        prop_assert_eq!(extended.v()[0xF], a >> 7);
        prop_assert_eq!(extended.v()[1], a << 1);
    }

    #[test]
    fn bcd_digits_recompose_value(value in any::<u8>(), mode in any_mode()) {
        let chip8 = run_with_registers(&[(0x7, value)], &[0xA400, 0xF733], mode);
        let digits = &chip8.memory()[0x400..0x403];

        prop_assert!(digits.iter().all(|&digit| digit < 10));
        prop_assert_eq!(
            digits[0] as u16 * 100 + digits[1] as u16 * 10 + digits[2] as u16,
            value as u16
        );
    }

    #[test]
    fn drawing_twice_restores_screen(
        glyph in 0u8..16,
        x in any::<u8>(),
        y in any::<u8>(),
        mode in any_mode(),
    ) {
        // V0 = glyph, V1 = x, V2 = y; I = glyph address; draw; draw again
        let ops = [
            0x6000 | glyph as u16,
            0x6100 | x as u16,
            0x6200 | y as u16,
            0xF029,
            0xD125,
            0xD125,
        ];
        let mut chip8 = Chip8::new(&rom(&ops), mode).unwrap();
        for _ in 0..5 {
            chip8.execute_one().unwrap();
        }
        let first_lit = chip8.display().iter().any(|&pixel| pixel);
        prop_assert_eq!(chip8.v()[0xF], 0);

        chip8.execute_one().unwrap();
        prop_assert!(chip8.display().iter().all(|&pixel| !pixel));
        prop_assert_eq!(chip8.v()[0xF], first_lit as u8);
        prop_assert!(chip8.redraw_pending());
    }

    #[test]
    fn snapshot_round_trips_any_register_state(
        regs in prop::array::uniform16(any::<u8>()),
        index in 0u16..0x1000,
        keys in prop::array::uniform16(any::<bool>()),
        mode in any_mode(),
    ) {
        let mut ops: Vec<u16> = (0..16u16)
            .map(|x| 0x6000 | x << 8 | regs[x as usize] as u16)
            .collect();
        ops.extend([0xA000 | (index & 0x0FFF), 0xF015, 0xF118, 0xF00A]);

        let mut chip8 = Chip8::new(&rom(&ops), mode).unwrap();
        for (key, &pressed) in keys.iter().enumerate() {
            chip8.set_key(u4::new(key as u8), pressed);
        }
        for _ in 0..ops.len() {
            chip8.execute_one().unwrap();
        }

        let restored = Chip8::deserialize(&chip8.serialize()).unwrap();
        prop_assert_eq!(&restored, &chip8);
        prop_assert_eq!(restored.waiting_key(), keys.iter().position(|&k| k).map(|k| u4::new(k as u8)));
    }
}
