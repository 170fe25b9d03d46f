//! Arcfour (RC4) stream cipher.
//!
//! Used by the legacy Standard security handler revisions (R2-R4).

/// RC4 stream cipher.
pub struct Arcfour {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Arcfour {
    /// Create a cipher keyed with `key`.
    ///
    /// Keys longer than 256 bytes are truncated; an empty key behaves like a
    /// single zero byte.
    pub fn new(key: &[u8]) -> Self {
        let key: &[u8] = match key.len() {
            0 => &[0],
            n if n > 256 => &key[..256],
            _ => key,
        };

        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Self { state, i: 0, j: 0 }
    }

    /// Encrypt/decrypt data (RC4 is symmetric).
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|byte| byte ^ self.next_byte()).collect()
    }

    /// One-shot helper.
    pub fn apply(key: &[u8], data: &[u8]) -> Vec<u8> {
        Self::new(key).process(data)
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);

        let idx = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[idx as usize]
    }
}
