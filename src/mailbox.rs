//! Single-slot hand-off between the receive path and the application.
//!
//! The producer posts one value at a time. While the slot is occupied,
//! `post` hands the value back instead of overwriting it, and the producer
//! keeps it until a later attempt succeeds.

/// A one-element mailbox with backpressure.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Option<T>,
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Store `value`, or return it when the slot is still occupied.
    pub fn post(&mut self, value: T) -> Result<(), T> {
        if self.slot.is_some() {
            return Err(value);
        }
        self.slot = Some(value);
        Ok(())
    }

    /// Remove the pending value, if any.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    pub fn is_full(&self) -> bool {
        self.slot.is_some()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_then_take() {
        let mut mb = Mailbox::new();
        assert!(!mb.is_full());
        assert_eq!(mb.post(1u8), Ok(()));
        assert!(mb.is_full());
        assert_eq!(mb.peek(), Some(&1));
        assert_eq!(mb.take(), Some(1));
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn occupied_slot_returns_value() {
        let mut mb = Mailbox::new();
        mb.post(1u8).unwrap();
        assert_eq!(mb.post(2), Err(2));
        assert_eq!(mb.take(), Some(1));
        assert_eq!(mb.post(2), Ok(()));
    }
}
