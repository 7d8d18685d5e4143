//! Assembler Simulator - CLI Entry Point
//!
//! Commands:
//! - `asm-sim run <image>` - Run a program image
//! - `asm-sim disasm <image>` - Disassemble a program image
//! - `asm-sim hex <image>` - Convert an image to hex text
//! - `asm-sim demo` - Run the bundled Hello World program

use asmsim::asm::{disassemble, disassemble_at, format_address, format_hex, format_value, load_image, save_hex};
use asmsim::asm::samples::HELLO_WORLD;
use asmsim::cpu::{Gpr, Memory, MEMORY_SIZE, OUTPUT_START};
use asmsim::{CpuState, Machine};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "asm-sim")]
#[command(version = "0.1.0")]
#[command(about = "A simulator for a small 8-bit educational CPU")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program image (raw binary, or hex text with a .hex extension)
        image: String,
        /// Maximum number of cycles to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Display values in hexadecimal
        #[arg(short = 'x', long)]
        hex: bool,
        /// Dump memory after the run
        #[arg(long)]
        memory: bool,
        /// Print the final machine snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Disassemble a program image to readable text
    Disasm {
        /// Path to the program image
        image: String,
    },
    /// Convert a program image to hex text
    Hex {
        /// Path to the program image
        image: String,
        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run the bundled Hello World program
    Demo {
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
    },
}

/// Display options for a run.
#[derive(Clone, Copy, Default)]
struct RunOptions {
    max_cycles: u64,
    trace: bool,
    hex: bool,
    memory: bool,
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { image, max_cycles, trace, hex, memory, json }) => {
            let program = read_image(&image);
            if !json {
                println!("🔧 Running: {}", image);
                println!("📂 Loaded {} bytes", program.len());
            }
            run_program(&program, RunOptions { max_cycles, trace, hex, memory, json });
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Hex { image, output }) => {
            convert_to_hex(&image, output);
        }
        Some(Commands::Demo { trace }) => {
            run_demo(trace);
        }
        None => {
            println!("Assembler Simulator v0.1.0");
            println!("An 8-bit CPU with 256 bytes of memory");
            println!();
            println!("Use --help for available commands");
            println!();
            run_demo(false);
        }
    }
}

fn read_image(path: &str) -> Vec<u8> {
    let program = match load_image(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    if program.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    program
}

fn run_demo(trace: bool) {
    println!("━━━ Hello World Demo ━━━");
    println!();
    println!("{}", disassemble(HELLO_WORLD));

    run_program(HELLO_WORLD, RunOptions { max_cycles: 10_000, trace, ..Default::default() });
}

fn run_program(program: &[u8], opts: RunOptions) {
    let mut machine = match Machine::with_program(program) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    };

    if machine.mem.is_blank() {
        eprintln!("❌ No program loaded: the image is all zeros");
        std::process::exit(1);
    }

    if !opts.json {
        println!();
        println!("━━━ Execution ━━━");
    }

    while machine.is_running() && machine.cycles < opts.max_cycles {
        let ip = machine.cpu.ip();
        let (text, _) = disassemble_at(machine.mem.cells(), ip);

        match machine.step() {
            Ok(_) => {
                if opts.trace && !opts.json {
                    println!(
                        "{}: {:<16} {}",
                        format_address(ip, opts.hex),
                        text,
                        format_registers(&machine, opts.hex),
                    );
                }
            }
            Err(e) => {
                eprintln!("❌ CPU error at IP={}: {}", ip, e);
                break;
            }
        }
    }

    if opts.json {
        match serde_json::to_string_pretty(&machine.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("❌ Failed to serialize snapshot: {}", e),
        }
    } else {
        print_result(&machine, opts);
    }

    if machine.state() == CpuState::Faulted {
        std::process::exit(1);
    }
}

fn print_result(machine: &Machine, opts: RunOptions) {
    let regs = machine.cpu.registers();

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", machine.cycles);
    println!("State: {:?}", machine.state());
    for gpr in Gpr::ALL {
        println!("{}:  {}", gpr.name(), format_value(regs.get(gpr), opts.hex));
    }
    println!("SP: {}", format_value(regs.sp, opts.hex));
    println!("IP: {}", format_address(regs.ip, opts.hex));
    println!("Z: {}  C: {}", regs.flags.zero as u8, regs.flags.carry as u8);
    println!("Output: {}", machine.output().trim_end());

    if opts.memory {
        println!();
        println!("━━━ Memory ━━━");
        print_memory(&machine.mem, opts.hex);
    }

    if machine.is_running() && machine.cycles >= opts.max_cycles {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", opts.max_cycles);
    }
}

fn format_registers(machine: &Machine, hex: bool) -> String {
    let regs = machine.cpu.registers();
    let values: Vec<String> = Gpr::ALL
        .iter()
        .map(|&gpr| format!("{}={}", gpr.name(), format_value(regs.get(gpr), hex)))
        .collect();

    format!(
        "{} SP={} Z={} C={}",
        values.join(" "),
        format_value(regs.sp, hex),
        regs.flags.zero as u8,
        regs.flags.carry as u8,
    )
}

fn print_memory(mem: &Memory, hex: bool) {
    for start in (0..MEMORY_SIZE).step_by(16) {
        let values: Vec<String> = mem
            .dump(start, 16)
            .into_iter()
            .map(|(_, b)| format!("{:>3}", format_value(b, hex)))
            .collect();
        let marker = if start + 16 > OUTPUT_START { " ; output" } else { "" };
        println!("{}: {}{}", format_address(start, hex), values.join(" "), marker);
    }
}

fn disassemble_file(path: &str) {
    println!("📖 Disassembling: {}", path);
    println!();

    let program = read_image(path);
    println!("{}", disassemble(&program));
}

fn convert_to_hex(path: &str, output: Option<String>) {
    let program = read_image(path);

    match output {
        Some(out_path) => {
            if let Err(e) = save_hex(&out_path, &program) {
                eprintln!("❌ Failed to save image: {}", e);
                std::process::exit(1);
            }
            println!("✓ Saved {} bytes to {}", program.len(), out_path);
        }
        None => print!("{}", format_hex(&program)),
    }
}
