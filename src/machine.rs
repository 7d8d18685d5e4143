//! A complete machine: one CPU and the memory it runs against.
//!
//! This is the execution context drivers work with. It owns both halves,
//! counts executed instructions and tracks whether the program halted.

use crate::cpu::{Cpu, CpuError, Instruction, Memory, MemoryError, Registers, OUTPUT_START};
use serde::{Serialize, Deserialize};

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Ready to execute the next instruction.
    Running,
    /// Reached the halt opcode.
    Halted,
    /// The fault latch is set; only a reset continues.
    Faulted,
}

/// The machine.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Machine {
    pub cpu: Cpu,
    pub mem: Memory,
    /// Instructions executed since the last reset.
    pub cycles: u64,
    halted: bool,
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine with zeroed memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a machine with `program` loaded at address 0.
    pub fn with_program(program: &[u8]) -> Result<Self, MemoryError> {
        let mut machine = Self::new();
        machine.load_program(program)?;
        Ok(machine)
    }

    /// Reset everything, then load `program` at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.reset();
        self.mem.load_program(0, program)
    }

    /// Reset the CPU and clear memory.
    pub fn reset(&mut self) {
        self.reset_cpu();
        self.mem.reset();
    }

    /// Reset the CPU only; the loaded program stays in memory.
    pub fn reset_cpu(&mut self) {
        self.cpu.reset();
        self.cycles = 0;
        self.halted = false;
        self.last_instr = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns `false` once the halt opcode is reached.
    pub fn step(&mut self) -> Result<bool, CpuError> {
        let instr = self.cpu.step_instruction(&mut self.mem)?;

        self.last_instr = Some(instr);
        self.halted = instr == Instruction::Halt;
        if !self.halted {
            self.cycles += 1;
        }

        Ok(!self.halted)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.step()? {}

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.cycles < limit && self.step()? {}

        Ok(self.cycles - start_cycles)
    }

    pub fn state(&self) -> CpuState {
        if self.cpu.is_faulted() {
            CpuState::Faulted
        } else if self.halted {
            CpuState::Halted
        } else {
            CpuState::Running
        }
    }

    /// Check if the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state() == CpuState::Halted
    }

    /// Check if the machine is running.
    pub fn is_running(&self) -> bool {
        self.state() == CpuState::Running
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Text in the output region.
    pub fn output(&self) -> String {
        self.mem.output(OUTPUT_START)
    }

    /// Capture the externally visible state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state(),
            cycles: self.cycles,
            registers: *self.cpu.registers(),
            last_access: self.mem.last_access(),
            output: self.output().trim_end().to_string(),
        }
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state())
            .field("cycles", &self.cycles)
            .field("regs", self.cpu.registers())
            .field("mem", &self.mem)
            .finish()
    }
}

/// Externally visible machine state, for drivers and visualizers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CpuState,
    pub cycles: u64,
    pub registers: Registers,
    pub last_access: Option<u8>,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::samples::HELLO_WORLD;
    use crate::cpu::{Gpr, STACK_TOP};

    #[test]
    fn test_machine_halt() {
        let mut machine = Machine::with_program(&[0]).unwrap();

        let executed = machine.run().unwrap();

        assert_eq!(executed, 0);
        assert!(machine.is_halted());
        assert_eq!(machine.last_instruction(), Some(Instruction::Halt));
    }

    #[test]
    fn test_machine_counts_cycles() {
        // MOV A, 1; INC A; INC A; HLT
        let mut machine = Machine::with_program(&[6, 0, 1, 18, 0, 18, 0, 0]).unwrap();

        assert_eq!(machine.run().unwrap(), 3);
        assert_eq!(machine.cpu.gpr(Gpr::A), 3);
        assert_eq!(machine.cycles, 3);
    }

    #[test]
    fn test_run_limited_stops_infinite_loop() {
        // JMP 0
        let mut machine = Machine::with_program(&[31, 0]).unwrap();

        assert_eq!(machine.run_limited(100).unwrap(), 100);
        assert!(machine.is_running());
    }

    #[test]
    fn test_fault_reports_state() {
        let mut machine = Machine::with_program(&[9]).unwrap();

        assert_eq!(machine.run(), Err(CpuError::InvalidOpcode(9)));
        assert_eq!(machine.state(), CpuState::Faulted);
        assert_eq!(machine.step(), Err(CpuError::AlreadyFaulted));

        machine.reset_cpu();
        assert!(machine.is_running());
        assert_eq!(machine.mem.cells()[0], 9);
    }

    #[test]
    fn test_hello_world() {
        let mut machine = Machine::with_program(HELLO_WORLD).unwrap();

        machine.run_limited(1000).unwrap();

        assert!(machine.is_halted());
        assert!(machine.output().starts_with("Hello World!"));
        assert_eq!(machine.cpu.sp(), STACK_TOP);
    }

    #[test]
    fn test_reset_clears_memory() {
        let mut machine = Machine::with_program(HELLO_WORLD).unwrap();
        machine.run().unwrap();

        machine.reset();

        assert!(machine.mem.is_blank());
        assert_eq!(machine.cycles, 0);
        assert_eq!(machine.snapshot().registers, Registers::new());
    }

    #[test]
    fn test_blank_memory_means_no_program() {
        assert!(Machine::new().mem.is_blank());
        assert!(Machine::with_program(&[0, 0, 0]).unwrap().mem.is_blank());

        let machine = Machine::with_program(HELLO_WORLD).unwrap();
        assert!(!machine.mem.is_blank());
        assert_eq!(machine.mem.dump(0, 2), vec![(0, 31), (1, 15)]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut machine = Machine::with_program(HELLO_WORLD).unwrap();
        machine.run().unwrap();

        let json = serde_json::to_string(&machine.snapshot()).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back.output, "Hello World!");
        assert_eq!(back.state, CpuState::Halted);
    }
}
