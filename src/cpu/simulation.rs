//! Simulation driver.
//!
//! Builds a datapath and control unit for one run, steps until the program
//! halts or runs out of input, and guards against runaway execution with an
//! instruction limit.

use crate::cpu::control::{ControlUnit, MachineError, Signal};
use crate::cpu::datapath::DataPath;
use crate::cpu::memory::ConfigError;
use crate::cpu::microcode::MicrocodeRom;
use crate::isa::Program;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of data memory cells.
pub const DEFAULT_MEMORY_SIZE: usize = 100;

/// Default instruction limit.
pub const DEFAULT_INSTRUCTION_LIMIT: u64 = 1_000_000_000;

/// Machine parameters for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Data memory size in cells.
    pub memory_size: usize,
    /// Instructions allowed before the run is declared runaway.
    pub instruction_limit: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            instruction_limit: DEFAULT_INSTRUCTION_LIMIT,
        }
    }
}

/// Why a run ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Halted,
    /// An input read found the queue empty.
    InputExhausted,
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Output tokens joined together.
    pub output: String,
    /// Instructions fully executed, including the final `hlt`.
    pub instructions: u64,
    /// Micro-operations executed.
    pub ticks: u64,
    pub stop: StopReason,
    /// Program counter when the run stopped.
    pub program_counter: usize,
    /// Final contents of data memory.
    pub memory: Vec<i64>,
}

/// Run `program` to completion.
pub fn simulate<I>(
    program: Program,
    input: I,
    data: &[i64],
    config: &SimulationConfig,
) -> Result<SimulationReport, SimulationError>
where
    I: IntoIterator<Item = char>,
{
    let rom = MicrocodeRom::new();
    let datapath = DataPath::new(config.memory_size, input, data)?;
    let mut control_unit = ControlUnit::new(datapath, program, &rom);
    let mut instructions: u64 = 0;

    debug!("{}", control_unit);

    let stop = loop {
        if instructions >= config.instruction_limit {
            return Err(SimulationError::Runaway {
                limit: config.instruction_limit,
                pc: control_unit.program_counter(),
                tick: control_unit.current_tick(),
            });
        }

        match control_unit.step() {
            Ok(Signal::Continue) => instructions += 1,
            Ok(Signal::Halt) => {
                instructions += 1;
                break StopReason::Halted;
            }
            Err(err) if err.is_input_exhausted() => {
                warn!("Input buffer is empty!");
                break StopReason::InputExhausted;
            }
            Err(source) => {
                return Err(SimulationError::Fault {
                    pc: control_unit.program_counter(),
                    tick: control_unit.current_tick(),
                    source,
                });
            }
        }
    };

    let program_counter = control_unit.program_counter();
    let ticks = control_unit.current_tick();
    let datapath = control_unit.into_datapath();
    let output = datapath.output_text();
    info!("output_buffer: {:?}", output);

    Ok(SimulationReport {
        output,
        instructions,
        ticks,
        stop,
        program_counter,
        memory: datapath.memory().cells().to_vec(),
    })
}

/// Run `program` with explicit machine parameters.
///
/// Shorthand for [`simulate`] with a [`SimulationConfig`] built from
/// `memory_size` and `limit`.
pub fn run(
    program: Program,
    input: &str,
    memory_size: usize,
    limit: u64,
    data: &[i64],
) -> Result<SimulationReport, SimulationError> {
    let config = SimulationConfig {
        memory_size,
        instruction_limit: limit,
    };
    simulate(program, input.chars(), data, &config)
}

/// Errors that abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("too long execution: {limit} instructions without halting (pc={pc}, tick={tick}), increase limit")]
    Runaway { limit: u64, pc: usize, tick: u64 },

    #[error("machine fault at pc={pc}, tick={tick}: {source}")]
    Fault {
        pc: usize,
        tick: u64,
        #[source]
        source: MachineError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::datapath::DataPathError;
    use crate::isa::Opcode;
    use proptest::prelude::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn program(ops: Vec<(Opcode, Vec<i64>)>) -> Program {
        Program::from_ops(ops)
    }

    #[test]
    fn test_mov() {
        init();
        let prog = program(vec![(Opcode::Mov, vec![0, 1]), (Opcode::Hlt, vec![])]);
        let report = run(prog, "", 10, 100, &[5, 0]).unwrap();

        assert_eq!(report.memory[1], 5);
        assert_eq!(report.instructions, 2);
        assert_eq!(report.ticks, 4);
        assert_eq!(report.stop, StopReason::Halted);
    }

    #[test]
    fn test_add_accumulates() {
        init();
        let prog = program(vec![(Opcode::Add, vec![0, 1]), (Opcode::Hlt, vec![])]);
        let report = run(prog, "", 10, 100, &[3, 4]).unwrap();

        assert_eq!(report.memory[1], 7);
        assert_eq!(report.memory[0], 3);
    }

    #[test]
    fn test_three_movs_take_nine_ticks() {
        init();
        let prog = program(vec![
            (Opcode::Mov, vec![0, 1]),
            (Opcode::Mov, vec![1, 2]),
            (Opcode::Mov, vec![2, 3]),
            (Opcode::Hlt, vec![]),
        ]);
        let report = run(prog, "", 10, 100, &[1]).unwrap();

        assert_eq!(report.ticks, 9 + 1);
        assert_eq!(report.instructions, 4);
        assert_eq!(&report.memory[..4], &[1, 1, 1, 1]);
    }

    #[test]
    fn test_cmp_branch_idiom() {
        init();
        let ops = |target| {
            program(vec![
                (Opcode::Cmp, vec![0, 1]),
                (Opcode::BranchEq, vec![target]),
                (Opcode::Hlt, vec![]),
                (Opcode::OutChar, vec![2]),
                (Opcode::Hlt, vec![]),
            ])
        };

        let equal = run(ops(3), "", 10, 100, &[5, 5, 89]).unwrap();
        assert_eq!(equal.output, "Y");
        assert_eq!(equal.program_counter, 4);

        let differ = run(ops(3), "", 10, 100, &[5, 6, 89]).unwrap();
        assert_eq!(differ.output, "");
        assert_eq!(differ.program_counter, 2);
    }

    #[test]
    fn test_input_exhaustion_is_clean_stop() {
        init();
        let prog = program(vec![
            (Opcode::OutChar, vec![0]),
            (Opcode::In, vec![1]),
            (Opcode::Hlt, vec![]),
        ]);
        let report = run(prog, "", 10, 100, &[33]).unwrap();

        assert_eq!(report.stop, StopReason::InputExhausted);
        assert_eq!(report.program_counter, 1);
        assert_eq!(report.output, "!");
        assert_eq!(report.instructions, 1);
        assert_eq!(report.ticks, 3);
    }

    #[test]
    fn test_runaway_guard() {
        init();
        let prog = program(vec![(Opcode::Jmp, vec![0])]);
        let err = run(prog, "", 10, 1000, &[]).unwrap_err();

        assert_eq!(
            err,
            SimulationError::Runaway {
                limit: 1000,
                pc: 0,
                tick: 1000
            }
        );
    }

    #[test]
    fn test_limit_counts_halt() {
        init();
        let prog = program(vec![(Opcode::Mov, vec![0, 1]), (Opcode::Hlt, vec![])]);

        assert!(run(prog.clone(), "", 10, 2, &[]).is_ok());
        assert!(matches!(
            run(prog, "", 10, 1, &[]),
            Err(SimulationError::Runaway { limit: 1, pc: 1, .. })
        ));
    }

    #[test]
    fn test_char_and_number_output() {
        init();
        let prog = program(vec![
            (Opcode::OutChar, vec![0]),
            (Opcode::Out, vec![0]),
            (Opcode::Hlt, vec![]),
        ]);
        let report = run(prog, "", 10, 100, &[72]).unwrap();

        assert_eq!(report.output, "H72");
    }

    #[test]
    fn test_echo_input() {
        init();
        let prog = program(vec![
            (Opcode::In, vec![0]),
            (Opcode::OutChar, vec![0]),
            (Opcode::Jmp, vec![0]),
        ]);
        let report = run(prog, "hi", 4, 100, &[]).unwrap();

        assert_eq!(report.output, "hi");
        assert_eq!(report.instructions, 6);
        assert_eq!(report.ticks, 12);
    }

    #[test]
    fn test_fault_carries_context() {
        init();
        let prog = program(vec![
            (Opcode::Mov, vec![0, 1]),
            (Opcode::Remainder, vec![0, 1]),
            (Opcode::Hlt, vec![]),
        ]);
        let err = run(prog, "", 4, 100, &[0]).unwrap_err();

        assert_eq!(
            err,
            SimulationError::Fault {
                pc: 1,
                tick: 4,
                source: MachineError::DataPath(DataPathError::DivisionByZero),
            }
        );
    }

    #[test]
    fn test_remainder_of_min_by_minus_one() {
        init();
        let prog = program(vec![(Opcode::Remainder, vec![0, 1]), (Opcode::Hlt, vec![])]);
        let report = run(prog, "", 4, 100, &[i64::MIN, -1]).unwrap();

        assert_eq!(report.stop, StopReason::Halted);
        assert_eq!(report.ticks, 4);
    }

    #[test]
    fn test_running_past_end_is_fatal() {
        init();
        let prog = program(vec![(Opcode::Mov, vec![0, 1])]);
        let err = run(prog, "", 4, 100, &[]).unwrap_err();

        assert!(matches!(
            err,
            SimulationError::Fault {
                pc: 1,
                source: MachineError::ProgramCounterOutOfRange { pc: 1, len: 1 },
                ..
            }
        ));
    }

    #[test]
    fn test_address_one_past_end() {
        init();
        let prog = program(vec![(Opcode::Out, vec![4]), (Opcode::Hlt, vec![])]);
        let err = run(prog, "", 4, 100, &[]).unwrap_err();

        assert!(matches!(
            err,
            SimulationError::Fault {
                source: MachineError::DataPath(DataPathError::Memory(_)),
                ..
            }
        ));

        let prog = program(vec![(Opcode::Out, vec![5]), (Opcode::Hlt, vec![])]);
        let err = run(prog, "", 4, 100, &[]).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Fault {
                source: MachineError::DataPath(DataPathError::AddressOutOfRange { addr: 5, size: 4 }),
                ..
            }
        ));
    }

    #[test]
    fn test_zero_memory_is_configuration_error() {
        let prog = program(vec![(Opcode::Hlt, vec![])]);
        assert_eq!(
            run(prog, "", 0, 100, &[]),
            Err(SimulationError::Configuration(ConfigError::ZeroMemorySize))
        );
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: SimulationConfig = serde_json::from_str(r#"{ "memory_size": 16 }"#).unwrap();
        assert_eq!(config.memory_size, 16);
        assert_eq!(config.instruction_limit, DEFAULT_INSTRUCTION_LIMIT);
        assert_eq!(SimulationConfig::default().memory_size, DEFAULT_MEMORY_SIZE);
    }

    const MEM: i64 = 8;

    /// Straight-line instructions that cannot fault on small non-negative data.
    fn straight_line_op() -> impl Strategy<Value = (Opcode, Vec<i64>)> {
        let addr = 0..MEM;
        prop_oneof![
            (addr.clone(), addr.clone()).prop_map(|(a, b)| (Opcode::Mov, vec![a, b])),
            (addr.clone(), addr.clone()).prop_map(|(a, b)| (Opcode::Add, vec![a, b])),
            (addr.clone(), addr.clone()).prop_map(|(a, b)| (Opcode::Cmp, vec![a, b])),
            addr.clone().prop_map(|a| (Opcode::Out, vec![a])),
            addr.prop_map(|a| (Opcode::Store, vec![a])),
        ]
    }

    proptest! {
        #[test]
        fn prop_tick_count_is_routine_sum(
            ops in prop::collection::vec(straight_line_op(), 0..40),
            data in prop::collection::vec(0i64..100, 0..MEM as usize),
        ) {
            let rom = MicrocodeRom::new();
            let expected: u64 = ops.iter().map(|(op, _)| rom.ticks(*op)).sum::<u64>() + rom.ticks(Opcode::Hlt);
            let count = ops.len() as u64 + 1;
            let mut ops = ops;
            ops.push((Opcode::Hlt, vec![]));

            let report = run(Program::from_ops(ops), "", MEM as usize, 1000, &data).unwrap();
            prop_assert_eq!(report.ticks, expected);
            prop_assert_eq!(report.instructions, count);
        }

        #[test]
        fn prop_runs_are_deterministic(
            ops in prop::collection::vec(straight_line_op(), 0..40),
            data in prop::collection::vec(0i64..100, 0..MEM as usize),
            input in "[a-z]{0,8}",
        ) {
            let mut ops = ops;
            ops.push((Opcode::In, vec![0]));
            ops.push((Opcode::Jmp, vec![0]));
            let prog = Program::from_ops(ops);

            let first = run(prog.clone(), &input, MEM as usize, 500, &data);
            let second = run(prog, &input, MEM as usize, 500, &data);
            prop_assert_eq!(first, second);
        }
    }
}
