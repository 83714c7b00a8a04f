/// Interrupt sources, in IF/IE bit order.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Interrupt {
    VBlank,
    Stat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    /// Bit mask of this source in the IF and IE registers.
    pub fn mask(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::Stat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }
}

/// Master interrupt-enable state (the CPU's IME flag).
///
/// EI and DI take effect one instruction late on hardware. Both are modelled
/// as two-step countdowns that the machine decrements once per instruction,
/// so a toggle scheduled during instruction N becomes visible during
/// instruction N+2.
pub struct InterruptMaster {
    enabled: bool,
    enable_in: u8,
    disable_in: u8,
}

impl InterruptMaster {
    pub fn new() -> InterruptMaster {
        InterruptMaster {
            enabled: false,
            enable_in: 0,
            disable_in: 0,
        }
    }

    /// Whether maskable interrupts may currently be flagged and dispatched.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Set the master flag immediately, cancelling any pending toggle.
    ///
    /// Used for RETI and for the automatic disable on interrupt entry.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.enable_in = 0;
        self.disable_in = 0;
    }

    /// Arm the delayed enable (EI).
    pub fn schedule_enable(&mut self) {
        self.enable_in = 2;
    }

    /// Arm the delayed disable (DI).
    pub fn schedule_disable(&mut self) {
        self.disable_in = 2;
    }

    /// Advance the delayed toggles by one CPU instruction.
    pub fn step(&mut self) {
        if self.enable_in > 0 {
            self.enable_in -= 1;
            if self.enable_in == 0 {
                self.enabled = true;
            }
        }
        if self.disable_in > 0 {
            self.disable_in -= 1;
            if self.disable_in == 0 {
                self.enabled = false;
            }
        }
    }
}

impl Default for InterruptMaster {
    fn default() -> Self {
        Self::new()
    }
}
