//! Accumulator machine - CLI Entry Point
//!
//! Commands:
//! - `acc-machine run <program> [--input <file>]` - Run an image or ASM file
//! - `acc-machine asm <source>` - Translate to a JSON image
//! - `acc-machine disasm <image>` - List an image

use accmachine::asm::disasm::dump_data;
use accmachine::{
    disassemble, load_image, save_image, simulate, translate, ProgramImage, SimulationConfig,
    StopReason,
};
use clap::{Parser, Subcommand};
use std::process;

#[derive(Parser)]
#[command(name = "acc-machine")]
#[command(version)]
#[command(about = "A micro-operation level simulator of a small accumulator processor")]
struct Cli {
    /// Log every tick of the control unit
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or runs out of input
    Run {
        /// Path to the JSON image or ASM file to execute
        program: String,
        /// File whose characters form the input stream
        #[arg(short, long)]
        input: Option<String>,
        /// Data memory size in cells
        #[arg(short, long, default_value_t = SimulationConfig::default().memory_size)]
        memory_size: usize,
        /// Instructions allowed before execution is declared runaway
        #[arg(short, long, default_value_t = SimulationConfig::default().instruction_limit)]
        limit: u64,
    },
    /// Translate assembly source to a JSON image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a JSON image to readable text
    Disasm {
        /// Path to the image
        image: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.trace { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run {
            program,
            input,
            memory_size,
            limit,
        } => {
            let config = SimulationConfig {
                memory_size,
                instruction_limit: limit,
            };
            run_program(&program, input.as_deref(), &config);
        }
        Commands::Asm { source, output } => {
            assemble_file(&source, output);
        }
        Commands::Disasm { image } => {
            disassemble_file(&image);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    process::exit(1);
}

fn read_source(path: &str) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path, e)))
}

/// Load an image, translating first when given assembly source.
fn load_program(path: &str) -> ProgramImage {
    if path.ends_with(".asm") {
        translate(&read_source(path)).unwrap_or_else(|e| fail(format!("Translation error: {}", e)))
    } else {
        load_image(path).unwrap_or_else(|e| fail(format!("Failed to load image: {}", e)))
    }
}

fn run_program(path: &str, input: Option<&str>, config: &SimulationConfig) {
    let image = load_program(path);
    if image.code.is_empty() {
        fail("No instructions to execute");
    }
    let input = input.map(read_source).unwrap_or_default();

    let report = simulate(image.code, input.chars(), &image.data, config)
        .unwrap_or_else(|e| fail(e));

    println!("{}", report.output);
    println!(
        "instr_counter: {} ticks: {}",
        report.instructions, report.ticks
    );
    if report.stop == StopReason::InputExhausted {
        eprintln!("⚠️  Stopped at pc={}: input exhausted", report.program_counter);
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| {
        source_path
            .strip_suffix(".asm")
            .map(|stem| format!("{}.json", stem))
            .unwrap_or_else(|| format!("{}.json", source_path))
    });

    let source = read_source(source_path);
    let image = translate(&source).unwrap_or_else(|e| fail(format!("Translation error: {}", e)));

    println!(
        "source LoC: {} code instr: {}",
        source.split_whitespace().count(),
        image.code.len()
    );

    if let Err(e) = save_image(&out_path, &image) {
        fail(format!("Failed to save image: {}", e));
    }
    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    let image = load_image(path).unwrap_or_else(|e| fail(format!("Failed to load image: {}", e)));

    println!("{}", disassemble(&image.code));
    if !image.data.is_empty() {
        println!("; data");
        print!("{}", dump_data(&image.data));
    }
}
