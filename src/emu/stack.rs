use super::Chip8Error;

/// Maximum nesting depth of subroutine calls.
pub const STACK_DEPTH: usize = 12;

/// Bounded stack of subroutine return addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallStack {
    entries: [u16; STACK_DEPTH],
    len: usize,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a return address. `target` is only used to describe the failing call.
    pub fn push(&mut self, address: u16, target: u16) -> Result<(), Chip8Error> {
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(Chip8Error::StackOverflow { address: target })?;
        *slot = address;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.len == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.len -= 1;
        Ok(std::mem::take(&mut self.entries[self.len]))
    }

    pub fn is_full(&self) -> bool {
        self.len == STACK_DEPTH
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live return addresses, oldest first.
    pub fn as_slice(&self) -> &[u16] {
        &self.entries[..self.len]
    }

    /// All slots including the zeroed ones above the top of the stack.
    pub(crate) fn slots(&self) -> &[u16; STACK_DEPTH] {
        &self.entries
    }

    /// Rebuilds a stack from padded slots.
    ///
    /// A pushed return address is never zero (it always points past a CALL), so the
    /// depth is the number of leading non-zero slots. Returns `None` if a non-zero
    /// slot follows a zero one.
    pub(crate) fn from_slots(entries: [u16; STACK_DEPTH]) -> Option<Self> {
        let len = entries
            .iter()
            .position(|&addr| addr == 0)
            .unwrap_or(STACK_DEPTH);

        if entries[len..].iter().any(|&addr| addr != 0) {
            return None;
        }

        Some(Self { entries, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_addresses_in_reverse_order() {
        let mut stack = CallStack::new();
        stack.push(0x202, 0x300).unwrap();
        stack.push(0x302, 0x400).unwrap();

        assert_eq!(stack.pop(), Ok(0x302));
        assert_eq!(stack.pop(), Ok(0x202));
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        assert_eq!(CallStack::new().pop(), Err(Chip8Error::StackUnderflow));
    }

    #[test]
    fn thirteenth_push_overflows_and_leaves_stack_intact() {
        let mut stack = CallStack::new();
        for depth in 0..STACK_DEPTH {
            stack.push(0x202 + 2 * depth as u16, 0x300).unwrap();
        }
        let before = stack.clone();

        assert!(stack.is_full());
        assert_eq!(
            stack.push(0x500, 0x600),
            Err(Chip8Error::StackOverflow { address: 0x600 })
        );
        assert_eq!(stack, before);
    }

    #[test]
    fn popped_slot_is_zeroed() {
        let mut stack = CallStack::new();
        stack.push(0x202, 0x300).unwrap();
        stack.pop().unwrap();

        assert_eq!(stack.slots(), &[0; STACK_DEPTH]);
    }

    #[test]
    fn from_slots_counts_leading_entries() {
        let mut slots = [0; STACK_DEPTH];
        slots[0] = 0x202;
        slots[1] = 0x2A4;

        let stack = CallStack::from_slots(slots).unwrap();
        assert_eq!(stack.as_slice(), &[0x202, 0x2A4]);
    }

    #[test]
    fn from_slots_rejects_gaps() {
        let mut slots = [0; STACK_DEPTH];
        slots[1] = 0x202;

        assert_eq!(CallStack::from_slots(slots), None);
    }
}
