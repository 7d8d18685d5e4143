//! WebAssembly bindings for the simulator.
//!
//! This module provides JavaScript-friendly wrappers around the core machine.

use wasm_bindgen::prelude::*;
use crate::asm::{disassemble_at, format_instruction, parse_hex};
use crate::cpu::Gpr;
use crate::{CpuState, Machine};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with blank memory.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { machine: Machine::new() }
    }

    /// Load a raw program image. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_bytes(&mut self, program: &[u8]) -> Result<usize, JsError> {
        self.machine.load_program(program)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(program.len())
    }

    /// Load a program from hex text. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_hex(&mut self, text: &str) -> Result<usize, JsError> {
        let program = parse_hex(text).map_err(|e| JsError::new(&e.to_string()))?;
        self.load_bytes(&program)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        self.check_loaded()?;
        if self.machine.is_halted() {
            return Err(JsError::new("CPU is halted"));
        }

        self.machine.step().map_err(|e| JsError::new(&e.to_string()))?;

        Ok(self.machine
            .last_instruction()
            .map(|instr| format_instruction(&instr))
            .unwrap_or_default())
    }

    /// Run until halt, fault or max cycles. Returns the cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.check_loaded()?;
        self.machine.run_limited(max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.machine.cycles)
    }

    /// Reset the CPU and clear memory.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Reset the CPU, keeping the loaded program.
    #[wasm_bindgen]
    pub fn reset_cpu(&mut self) {
        self.machine.reset_cpu();
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    #[wasm_bindgen]
    pub fn is_faulted(&self) -> bool {
        self.machine.state() == CpuState::Faulted
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.machine.state())
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles
    }

    /// Get a general purpose register by index (0-3 for A-D).
    #[wasm_bindgen]
    pub fn gpr(&self, index: u8) -> Result<u8, JsError> {
        let gpr = Gpr::from_index(index)
            .ok_or_else(|| JsError::new(&format!("invalid register {}", index)))?;
        Ok(self.machine.cpu.gpr(gpr))
    }

    #[wasm_bindgen]
    pub fn sp(&self) -> u8 {
        self.machine.cpu.sp()
    }

    #[wasm_bindgen]
    pub fn ip(&self) -> usize {
        self.machine.cpu.ip()
    }

    #[wasm_bindgen]
    pub fn zero(&self) -> bool {
        self.machine.cpu.flags().zero
    }

    #[wasm_bindgen]
    pub fn carry(&self) -> bool {
        self.machine.cpu.flags().carry
    }

    /// Copy of the full memory.
    #[wasm_bindgen]
    pub fn memory(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.machine.mem.cells())
    }

    /// Address of the last memory load, or -1 when there was none.
    #[wasm_bindgen]
    pub fn last_access(&self) -> i32 {
        self.machine.mem.last_access().map_or(-1, i32::from)
    }

    /// Text in the output region.
    #[wasm_bindgen]
    pub fn output(&self) -> String {
        self.machine.output()
    }

    /// Get the machine snapshot as JSON string.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.machine.snapshot())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Disassemble the instruction at `address` without touching the
    /// last-access marker.
    #[wasm_bindgen]
    pub fn disassemble_at(&self, address: usize) -> String {
        disassemble_at(self.machine.mem.cells(), address).0
    }
}

impl WasmMachine {
    fn check_loaded(&self) -> Result<(), JsError> {
        if self.machine.mem.is_blank() {
            return Err(JsError::new("no program loaded"));
        }
        Ok(())
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}
