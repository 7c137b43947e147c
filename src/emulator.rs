// Execution-unit boundary

/// The emulation engine as this subsystem sees it: an opaque producer and
/// consumer of byte buffers. Stepping, rendering and input handling live
/// on the other side of this trait.
pub trait EmulatorCore: Send {
    /// Feed the firmware image.
    fn load_bios(&mut self, bytes: &[u8]);

    /// Feed a cartridge image.
    fn load_rom(&mut self, bytes: &[u8]);

    /// Restore the cartridge's persistent memory.
    fn load_backup(&mut self, bytes: &[u8]);

    /// Restore a full point-in-time snapshot, exactly as produced by
    /// [`EmulatorCore::snapshot`].
    fn load_snapshot(&mut self, bytes: &[u8]);

    /// A full snapshot of execution state, restorable exactly.
    fn snapshot(&self) -> Vec<u8>;

    /// The current battery-backup bytes.
    fn backup(&self) -> Vec<u8>;

    /// Whether the running title wrote to its persistent memory since
    /// the last call. Reading resets the flag.
    fn take_saved(&mut self) -> bool;

    /// The current frame as RGBA bytes plus dimensions, used for
    /// save-state thumbnails.
    fn frame_rgba(&self) -> (Vec<u8>, u32, u32);
}
