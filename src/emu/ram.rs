use crate::plat::MEM_SIZE;

use super::{EmuError, EmuResult};

/// The machine's flat byte memory.
pub struct Ram {
    pub memory: Box<[u8; MEM_SIZE]>,
}

impl Ram {
    /// Creates a new [`Ram`] instance, initializing its memory to [0u8; 256].
    pub fn new() -> Self {
        Self {
            memory: Box::new([0u8; MEM_SIZE]),
        }
    }

    /// Copies a program image into memory, starting at address 0.
    ///
    /// # Errors
    ///
    /// This function will return an error if the image is larger than memory.
    pub fn load(&mut self, image: &[u8]) -> EmuResult<()> {
        if image.len() > MEM_SIZE {
            return Err(EmuError::ImageTooLarge(image.len()));
        }
        self.memory[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn read(&self, addr: u8) -> u8 {
        self.memory[addr as usize]
    }

    pub fn write(&mut self, addr: u8, value: u8) {
        self.memory[addr as usize] = value;
    }

    /// Reads an address that may lie past the top of memory.
    pub fn peek(&self, addr: usize) -> Option<u8> {
        self.memory.get(addr).copied()
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}
